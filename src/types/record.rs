use serde::{Deserialize, Serialize};

/// Canonical contact shape forwarded to the campaign bulk-import API.
///
/// Fields are best-effort populated by the normalizer; an unresolved field is
/// an empty string, never a null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ContactRecord {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
        }
    }
}
