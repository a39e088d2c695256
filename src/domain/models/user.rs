use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// IANA zone name paired with the GMT offset label shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimezonePreference {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub timezone: Option<TimezonePreference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Shape check only: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(is_valid_email("owner@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.uk"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for value in [
            "",
            "plain",
            "@example.com",
            "owner@",
            "owner@localhost",
            "owner@@example.com",
            "owner@example..com",
            "own er@example.com",
        ] {
            assert!(!is_valid_email(value), "{value} should be rejected");
        }
    }
}
