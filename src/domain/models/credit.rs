use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditEntryType {
    Addition,
    Deduction,
}

impl CreditEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditEntryType::Addition => "ADDITION",
            CreditEntryType::Deduction => "DEDUCTION",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "ADDITION" => Some(CreditEntryType::Addition),
            "DEDUCTION" => Some(CreditEntryType::Deduction),
            _ => None,
        }
    }
}

/// What a history entry was spent on or granted for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditEntryStatus {
    VerifiedEmail,
    VerifiedList,
    Allocated,
}

impl CreditEntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditEntryStatus::VerifiedEmail => "VERIFIED_EMAIL",
            CreditEntryStatus::VerifiedList => "VERIFIED_LIST",
            CreditEntryStatus::Allocated => "ALLOCATED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "VERIFIED_EMAIL" => Some(CreditEntryStatus::VerifiedEmail),
            "VERIFIED_LIST" => Some(CreditEntryStatus::VerifiedList),
            "ALLOCATED" => Some(CreditEntryStatus::Allocated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditHistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub entry_type: CreditEntryType,
    pub description: String,
    pub status: CreditEntryStatus,
    pub created_at: DateTime<Utc>,
}

impl CreditHistoryEntry {
    pub fn new(
        user_id: Uuid,
        amount: i64,
        entry_type: CreditEntryType,
        description: impl Into<String>,
        status: CreditEntryStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            entry_type,
            description: description.into(),
            status,
            created_at: Utc::now(),
        }
    }
}

/// Balance record. `remaining_credits == total_credits - used_credits` holds
/// after every mutation made through `debit`/`credit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreditAccount {
    pub user_id: Uuid,
    pub total_credits: i64,
    pub used_credits: i64,
    pub remaining_credits: i64,
    pub valid_till: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    pub fn empty(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            total_credits: 0,
            used_credits: 0,
            remaining_credits: 0,
            valid_till: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_till.is_some_and(|valid_till| now > valid_till)
    }

    pub fn can_spend(&self, amount: i64, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && self.remaining_credits >= amount
    }

    pub fn debit(&mut self, amount: i64) -> Result<(), DomainError> {
        ensure_positive(amount)?;
        if self.remaining_credits < amount {
            return Err(DomainError::InsufficientCredits {
                required: amount,
                remaining: self.remaining_credits,
            });
        }
        self.used_credits += amount;
        self.remaining_credits -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn credit(
        &mut self,
        amount: i64,
        valid_till: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        ensure_positive(amount)?;
        self.total_credits += amount;
        self.remaining_credits += amount;
        if valid_till.is_some() {
            self.valid_till = valid_till;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

pub fn ensure_positive(amount: i64) -> Result<(), DomainError> {
    if amount <= 0 {
        return Err(DomainError::Validation(
            "credit amount must be positive".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CreditHistoryFilter {
    #[default]
    All,
    Addition,
    Deduction,
    Email,
    List,
}

impl CreditHistoryFilter {
    /// Unknown values fall back to `All`.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "ADDITION" => CreditHistoryFilter::Addition,
            "DEDUCTION" => CreditHistoryFilter::Deduction,
            "EMAIL" => CreditHistoryFilter::Email,
            "LIST" => CreditHistoryFilter::List,
            _ => CreditHistoryFilter::All,
        }
    }

    pub fn matches(&self, entry: &CreditHistoryEntry) -> bool {
        match self {
            CreditHistoryFilter::All => true,
            CreditHistoryFilter::Addition => entry.entry_type == CreditEntryType::Addition,
            CreditHistoryFilter::Deduction => entry.entry_type == CreditEntryType::Deduction,
            CreditHistoryFilter::Email => entry.status == CreditEntryStatus::VerifiedEmail,
            CreditHistoryFilter::List => entry.status == CreditEntryStatus::VerifiedList,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreditHistoryQuery {
    pub filter: CreditHistoryFilter,
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: u32,
    pub limit: u32,
}

impl Default for CreditHistoryQuery {
    fn default() -> Self {
        Self {
            filter: CreditHistoryFilter::All,
            search: None,
            from: None,
            to: None,
            page: 1,
            limit: 10,
        }
    }
}

impl CreditHistoryQuery {
    pub fn skip(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn matches(&self, entry: &CreditHistoryEntry) -> bool {
        if !self.filter.matches(entry) {
            return false;
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            if !entry
                .description
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        if self.from.is_some_and(|from| entry.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| entry.created_at > to) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct CreditHistoryPage {
    pub entries: Vec<CreditHistoryEntry>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn account(total: i64, used: i64) -> CreditAccount {
        CreditAccount {
            total_credits: total,
            used_credits: used,
            remaining_credits: total - used,
            ..CreditAccount::empty(Uuid::new_v4())
        }
    }

    #[test]
    fn debit_keeps_balance_consistent() {
        let mut acc = account(100, 20);
        acc.debit(30).unwrap();
        assert_eq!(
            (acc.total_credits, acc.used_credits, acc.remaining_credits),
            (100, 50, 50)
        );
        assert_eq!(acc.remaining_credits, acc.total_credits - acc.used_credits);
    }

    #[test]
    fn over_debit_leaves_account_untouched() {
        let mut acc = account(10, 5);
        let before = acc.clone();
        let err = acc.debit(6).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientCredits {
                required: 6,
                remaining: 5
            }
        ));
        assert_eq!(acc, before);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut acc = account(10, 0);
        assert!(matches!(acc.debit(0), Err(DomainError::Validation(_))));
        assert!(matches!(acc.credit(-5, None), Err(DomainError::Validation(_))));
    }

    #[test]
    fn expired_account_cannot_spend() {
        let mut acc = account(100, 0);
        let now = Utc::now();
        acc.valid_till = Some(now - Duration::days(1));
        assert!(!acc.can_spend(1, now));

        acc.valid_till = Some(now + Duration::days(1));
        assert!(acc.can_spend(100, now));
        assert!(!acc.can_spend(101, now));
    }

    #[test]
    fn filter_parses_case_insensitively() {
        assert_eq!(CreditHistoryFilter::parse("deduction"), CreditHistoryFilter::Deduction);
        assert_eq!(CreditHistoryFilter::parse("Email"), CreditHistoryFilter::Email);
        assert_eq!(CreditHistoryFilter::parse("all"), CreditHistoryFilter::All);
        assert_eq!(CreditHistoryFilter::parse("bogus"), CreditHistoryFilter::All);
    }

    #[test]
    fn query_matches_search_and_dates() {
        let user = Uuid::new_v4();
        let entry = CreditHistoryEntry::new(
            user,
            5,
            CreditEntryType::Deduction,
            "Bulk verification of Leads.csv",
            CreditEntryStatus::VerifiedList,
        );

        let query = CreditHistoryQuery {
            search: Some("leads".to_string()),
            filter: CreditHistoryFilter::List,
            ..Default::default()
        };
        assert!(query.matches(&entry));

        let query = CreditHistoryQuery {
            filter: CreditHistoryFilter::Email,
            ..Default::default()
        };
        assert!(!query.matches(&entry));

        let query = CreditHistoryQuery {
            from: Some(entry.created_at + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!query.matches(&entry));
    }

    #[test]
    fn skip_is_offset_of_one_based_page() {
        let query = CreditHistoryQuery {
            page: 3,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(query.skip(), 40);
        let query = CreditHistoryQuery {
            page: 0,
            ..Default::default()
        };
        assert_eq!(query.skip(), 0);
    }
}
