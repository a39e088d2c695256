use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::models::{
    CreditAccount, CreditEntryStatus, CreditHistoryPage, CreditHistoryQuery, EmailList,
    ListCounts, ListStatus, User, VerificationStats,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn get(&self, id: &Uuid) -> anyhow::Result<Option<User>>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn upsert(&self, user: &User) -> anyhow::Result<()>;
    /// Removes the user together with their credits and lists.
    async fn delete(&self, id: &Uuid) -> anyhow::Result<Option<User>>;
}

/// Result of a conditional debit. The account is only written on `Applied`.
#[derive(Debug, Clone)]
pub enum DeductOutcome {
    Applied(CreditAccount),
    Missing,
    Insufficient { remaining: i64 },
}

/// A single balance change plus the history row describing it.
#[derive(Debug, Clone)]
pub struct CreditChange {
    pub user_id: Uuid,
    pub amount: i64,
    pub description: String,
    pub status: CreditEntryStatus,
    pub valid_till: Option<DateTime<Utc>>,
}

/// Every mutating method applies the balance update and its history entry
/// as one atomic unit per user.
#[async_trait]
pub trait CreditRepository: Send + Sync {
    async fn find(&self, user_id: &Uuid) -> anyhow::Result<Option<CreditAccount>>;
    /// Inserts a zero balance unless a record already exists; returns the stored record.
    async fn create_if_absent(&self, user_id: &Uuid) -> anyhow::Result<CreditAccount>;
    async fn deduct(&self, change: CreditChange) -> anyhow::Result<DeductOutcome>;
    /// Creates the record first when the user has none.
    async fn add(&self, change: CreditChange) -> anyhow::Result<CreditAccount>;
    async fn history(
        &self,
        user_id: &Uuid,
        query: &CreditHistoryQuery,
    ) -> anyhow::Result<CreditHistoryPage>;
}

#[async_trait]
pub trait ListRepository: Send + Sync {
    async fn insert(&self, list: &EmailList) -> anyhow::Result<()>;
    async fn get(&self, list_id: &Uuid) -> anyhow::Result<Option<EmailList>>;
    async fn find_by_job(&self, user_id: &Uuid, job_id: &str)
    -> anyhow::Result<Option<EmailList>>;
    async fn attach_job(&self, list_id: &Uuid, job_id: &str) -> anyhow::Result<()>;
    /// Refreshes counts of a non-terminal list. Returns false when no such
    /// list is left to update.
    async fn update_counts(&self, list_id: &Uuid, counts: ListCounts) -> anyhow::Result<bool>;

    /// Moves the list from `from` to `to` only if it is still in `from`.
    /// Returns the updated list, or `None` when another writer got there first.
    async fn transition(
        &self,
        list_id: &Uuid,
        from: ListStatus,
        to: ListStatus,
        counts: ListCounts,
    ) -> anyhow::Result<Option<EmailList>>;

    /// Puts a PROCESSING list back to PENDING with the given counts after the
    /// provider refused to start it. Returns false when the list moved on.
    async fn release_start(&self, list_id: &Uuid, counts: ListCounts) -> anyhow::Result<bool>;

    async fn list_by_user(
        &self,
        user_id: &Uuid,
        status: Option<ListStatus>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> anyhow::Result<(Vec<EmailList>, bool)>;

    async fn list_by_status(&self, status: ListStatus) -> anyhow::Result<Vec<EmailList>>;
    async fn delete(&self, list_id: &Uuid) -> anyhow::Result<bool>;
    async fn calculate_stats(&self, user_id: &Uuid) -> anyhow::Result<VerificationStats>;
}
