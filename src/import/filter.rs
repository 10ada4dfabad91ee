//! Per-job validation and email deduplication.

use std::collections::HashSet;

use crate::types::ContactRecord;

/// Classification of one normalized record, in the order the outcomes are
/// checked: email shape first, then duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    SkippedNoEmail,
    Duplicate,
}

/// Tracks every email accepted during one job run. The set lives for the
/// whole job, not per page, so a duplicate on page 40 of an address first
/// seen on page 1 is still caught.
#[derive(Debug, Default)]
pub struct RecordFilter {
    seen_emails: HashSet<String>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, record: &ContactRecord) -> Outcome {
        if !is_plausible_email(&record.email) {
            return Outcome::SkippedNoEmail;
        }

        let key = record.email.to_lowercase();
        if self.seen_emails.insert(key) {
            Outcome::Valid
        } else {
            Outcome::Duplicate
        }
    }
}

/// Minimal shape check: something, an `@`, a domain with an interior dot,
/// no whitespace anywhere.
pub fn is_plausible_email(email: &str) -> bool {
    if email.is_empty() || email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot < domain.len() - 1,
        None => false,
    }
}
