//! Normalization of heterogeneous upstream contact records.
//!
//! Pool records arrive in whatever shape the source integration produced:
//! snake_case, camelCase or all-lowercase field names, contact details nested
//! under `contact`/`person`, emails in an `emails` array, or just a free-text
//! `name`. Resolution is a first-match-wins walk over ordered accessor
//! lists, so adding a new spelling is a one-line change.

use serde_json::Value;

use crate::types::ContactRecord;

const FIRST_NAME_KEYS: &[&str] = &["first_name", "firstName", "firstname"];
const LAST_NAME_KEYS: &[&str] = &["last_name", "lastName", "lastname"];

/// Email lookup paths, in priority order. One level of nesting only.
const EMAIL_PATHS: &[&[&str]] = &[
    &["email"],
    &["emailAddress"],
    &["contact", "email"],
    &["person", "email"],
];

/// Map one raw upstream record into the canonical contact shape.
///
/// Pure and deterministic; unresolved fields come back as empty strings.
pub fn normalize(raw: &Value) -> ContactRecord {
    let mut first_name = first_string(raw, FIRST_NAME_KEYS);
    let mut last_name = first_string(raw, LAST_NAME_KEYS);

    // Fall back to splitting a free-text name: first token becomes the first
    // name, the rest joins into the last name.
    if first_name.is_empty() && last_name.is_empty() {
        if let Some(name) = raw.get("name").and_then(Value::as_str) {
            let mut parts = name.split_whitespace();
            first_name = parts.next().unwrap_or_default().to_string();
            last_name = parts.collect::<Vec<_>>().join(" ");
        }
    }

    let email = resolve_email(raw);

    ContactRecord {
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        email: email.trim().to_string(),
    }
}

fn first_string(raw: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| raw.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn resolve_email(raw: &Value) -> String {
    for path in EMAIL_PATHS {
        if let Some(found) = string_at(raw, path) {
            return found.to_string();
        }
    }
    first_array_email(raw).unwrap_or_default().to_string()
}

fn string_at<'a>(raw: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = raw;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str().filter(|s| !s.trim().is_empty())
}

/// First entry of an `emails` array, either a bare string or an object
/// with its own `email` field.
fn first_array_email(raw: &Value) -> Option<&str> {
    let first = raw.get("emails")?.as_array()?.first()?;
    match first {
        Value::String(s) => Some(s.as_str()),
        Value::Object(_) => first.get("email").and_then(Value::as_str),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_case_fields() {
        let record = normalize(&json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@x.com"
        }));
        assert_eq!(record, ContactRecord::new("Ada", "Lovelace", "ada@x.com"));
    }

    #[test]
    fn test_camel_case_fields() {
        let record = normalize(&json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "emailAddress": "ada@x.com"
        }));
        assert_eq!(record, ContactRecord::new("Ada", "Lovelace", "ada@x.com"));
    }

    #[test]
    fn test_lowercase_fields() {
        let record = normalize(&json!({
            "firstname": "Ada",
            "lastname": "Lovelace"
        }));
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.last_name, "Lovelace");
    }

    #[test]
    fn test_snake_case_wins_over_camel_case() {
        let record = normalize(&json!({
            "first_name": "Ada",
            "firstName": "Augusta"
        }));
        assert_eq!(record.first_name, "Ada");
    }

    #[test]
    fn test_free_text_name_split() {
        let record = normalize(&json!({"name": "Ada Augusta King Lovelace"}));
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.last_name, "Augusta King Lovelace");
    }

    #[test]
    fn test_single_token_name() {
        let record = normalize(&json!({"name": "Ada"}));
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.last_name, "");
    }

    #[test]
    fn test_name_not_split_when_first_name_resolves() {
        let record = normalize(&json!({
            "first_name": "Ada",
            "name": "Completely Different"
        }));
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.last_name, "");
    }

    #[test]
    fn test_nested_contact_email() {
        let record = normalize(&json!({"contact": {"email": "ada@x.com"}}));
        assert_eq!(record.email, "ada@x.com");
    }

    #[test]
    fn test_nested_person_email() {
        let record = normalize(&json!({"person": {"email": "ada@x.com"}}));
        assert_eq!(record.email, "ada@x.com");
    }

    #[test]
    fn test_emails_array_of_strings() {
        let record = normalize(&json!({"emails": ["ada@x.com", "other@x.com"]}));
        assert_eq!(record.email, "ada@x.com");
    }

    #[test]
    fn test_emails_array_of_objects() {
        let record = normalize(&json!({"emails": [{"email": "ada@x.com"}]}));
        assert_eq!(record.email, "ada@x.com");
    }

    #[test]
    fn test_direct_email_wins_over_nested() {
        let record = normalize(&json!({
            "email": "direct@x.com",
            "contact": {"email": "nested@x.com"}
        }));
        assert_eq!(record.email, "direct@x.com");
    }

    #[test]
    fn test_values_are_trimmed() {
        let record = normalize(&json!({
            "first_name": "  Ada ",
            "last_name": " Lovelace ",
            "email": " ada@x.com  "
        }));
        assert_eq!(record, ContactRecord::new("Ada", "Lovelace", "ada@x.com"));
    }

    #[test]
    fn test_unresolved_fields_are_empty_strings() {
        let record = normalize(&json!({"id": 17}));
        assert_eq!(record, ContactRecord::new("", "", ""));
    }

    #[test]
    fn test_normalize_is_stable_on_canonical_shape() {
        let canonical = normalize(&json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@x.com"
        }));
        let again = normalize(&serde_json::to_value(&canonical).unwrap());
        assert_eq!(again, canonical);
    }
}
