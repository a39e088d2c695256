use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    models::{
        CreditAccount, CreditEntryType, CreditHistoryEntry, CreditHistoryPage,
        CreditHistoryQuery, EmailList, ListCounts, ListStatus, User, VerificationStats,
    },
    repositories::{CreditChange, CreditRepository, DeductOutcome, ListRepository, UserRepository},
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    credits: Option<Arc<InMemoryCreditRepository>>,
    lists: Option<Arc<InMemoryListRepository>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deleting a user also drops their credits and lists, mirroring the
    /// foreign-key cascade of the Postgres schema.
    pub fn with_cascade(
        credits: Arc<InMemoryCreditRepository>,
        lists: Arc<InMemoryListRepository>,
    ) -> Self {
        Self {
            users: Arc::default(),
            credits: Some(credits),
            lists: Some(lists),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get(&self, id: &Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn upsert(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email))
        {
            anyhow::bail!("duplicate email {}", user.email);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> anyhow::Result<Option<User>> {
        let removed = self.users.write().await.remove(id);
        if removed.is_some() {
            if let Some(credits) = &self.credits {
                credits.remove_user(id).await;
            }
            if let Some(lists) = &self.lists {
                lists.remove_user(id).await;
            }
        }
        Ok(removed)
    }
}

#[derive(Default)]
struct CreditState {
    accounts: HashMap<Uuid, CreditAccount>,
    history: Vec<CreditHistoryEntry>,
}

/// Balance and history share one lock so a change and its entry land together.
#[derive(Default)]
pub struct InMemoryCreditRepository {
    state: RwLock<CreditState>,
}

impl InMemoryCreditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an account as-is; test setups use it to seed arbitrary balances.
    pub async fn put(&self, account: CreditAccount) {
        let mut state = self.state.write().await;
        state.accounts.insert(account.user_id, account);
    }

    async fn remove_user(&self, user_id: &Uuid) {
        let mut state = self.state.write().await;
        state.accounts.remove(user_id);
        state.history.retain(|entry| &entry.user_id != user_id);
    }
}

#[async_trait]
impl CreditRepository for InMemoryCreditRepository {
    async fn find(&self, user_id: &Uuid) -> anyhow::Result<Option<CreditAccount>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(user_id).cloned())
    }

    async fn create_if_absent(&self, user_id: &Uuid) -> anyhow::Result<CreditAccount> {
        let mut state = self.state.write().await;
        Ok(state
            .accounts
            .entry(*user_id)
            .or_insert_with(|| CreditAccount::empty(*user_id))
            .clone())
    }

    async fn deduct(&self, change: CreditChange) -> anyhow::Result<DeductOutcome> {
        let mut state = self.state.write().await;
        let Some(account) = state.accounts.get(&change.user_id) else {
            return Ok(DeductOutcome::Missing);
        };

        let mut updated = account.clone();
        if updated.debit(change.amount).is_err() {
            return Ok(DeductOutcome::Insufficient {
                remaining: account.remaining_credits,
            });
        }

        state.accounts.insert(change.user_id, updated.clone());
        state.history.push(CreditHistoryEntry::new(
            change.user_id,
            change.amount,
            CreditEntryType::Deduction,
            change.description,
            change.status,
        ));
        Ok(DeductOutcome::Applied(updated))
    }

    async fn add(&self, change: CreditChange) -> anyhow::Result<CreditAccount> {
        let mut state = self.state.write().await;
        let mut updated = state
            .accounts
            .get(&change.user_id)
            .cloned()
            .unwrap_or_else(|| CreditAccount::empty(change.user_id));
        updated.credit(change.amount, change.valid_till)?;

        state.accounts.insert(change.user_id, updated.clone());
        state.history.push(CreditHistoryEntry::new(
            change.user_id,
            change.amount,
            CreditEntryType::Addition,
            change.description,
            change.status,
        ));
        Ok(updated)
    }

    async fn history(
        &self,
        user_id: &Uuid,
        query: &CreditHistoryQuery,
    ) -> anyhow::Result<CreditHistoryPage> {
        let state = self.state.read().await;
        let mut matching: Vec<&CreditHistoryEntry> = state
            .history
            .iter()
            .filter(|entry| &entry.user_id == user_id && query.matches(entry))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let entries = matching
            .into_iter()
            .skip(query.skip() as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(CreditHistoryPage {
            entries,
            total,
            page: query.page,
            per_page: query.limit,
        })
    }
}

#[derive(Default)]
pub struct InMemoryListRepository {
    lists: RwLock<HashMap<Uuid, EmailList>>,
}

impl InMemoryListRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn remove_user(&self, user_id: &Uuid) {
        self.lists
            .write()
            .await
            .retain(|_, list| &list.uploaded_by != user_id);
    }
}

#[async_trait]
impl ListRepository for InMemoryListRepository {
    async fn insert(&self, list: &EmailList) -> anyhow::Result<()> {
        self.lists.write().await.insert(list.id, list.clone());
        Ok(())
    }

    async fn get(&self, list_id: &Uuid) -> anyhow::Result<Option<EmailList>> {
        Ok(self.lists.read().await.get(list_id).cloned())
    }

    async fn find_by_job(
        &self,
        user_id: &Uuid,
        job_id: &str,
    ) -> anyhow::Result<Option<EmailList>> {
        let lists = self.lists.read().await;
        Ok(lists
            .values()
            .find(|l| &l.uploaded_by == user_id && l.job_id.as_deref() == Some(job_id))
            .cloned())
    }

    async fn attach_job(&self, list_id: &Uuid, job_id: &str) -> anyhow::Result<()> {
        let mut lists = self.lists.write().await;
        if let Some(list) = lists.get_mut(list_id) {
            list.job_id = Some(job_id.to_string());
            list.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_counts(&self, list_id: &Uuid, counts: ListCounts) -> anyhow::Result<bool> {
        let mut lists = self.lists.write().await;
        match lists.get_mut(list_id) {
            Some(list) if !list.status.is_terminal() => {
                list.counts = counts;
                list.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition(
        &self,
        list_id: &Uuid,
        from: ListStatus,
        to: ListStatus,
        counts: ListCounts,
    ) -> anyhow::Result<Option<EmailList>> {
        from.ensure_transition(to)?;
        let mut lists = self.lists.write().await;
        match lists.get_mut(list_id) {
            Some(list) if list.status == from => {
                list.status = to;
                list.counts = counts;
                list.updated_at = Utc::now();
                Ok(Some(list.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn release_start(&self, list_id: &Uuid, counts: ListCounts) -> anyhow::Result<bool> {
        let mut lists = self.lists.write().await;
        match lists.get_mut(list_id) {
            Some(list) if list.status == ListStatus::Processing => {
                list.status = ListStatus::Pending;
                list.counts = counts;
                list.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_user(
        &self,
        user_id: &Uuid,
        status: Option<ListStatus>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> anyhow::Result<(Vec<EmailList>, bool)> {
        let limit = limit.unwrap_or(50).min(200) as usize;
        let offset = offset.unwrap_or(0) as usize;

        let lists = self.lists.read().await;
        let mut owned: Vec<EmailList> = lists
            .values()
            .filter(|l| &l.uploaded_by == user_id && status.is_none_or(|s| l.status == s))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let has_more = owned.len() > offset + limit;
        Ok((owned.into_iter().skip(offset).take(limit).collect(), has_more))
    }

    async fn list_by_status(&self, status: ListStatus) -> anyhow::Result<Vec<EmailList>> {
        let lists = self.lists.read().await;
        Ok(lists.values().filter(|l| l.status == status).cloned().collect())
    }

    async fn delete(&self, list_id: &Uuid) -> anyhow::Result<bool> {
        Ok(self.lists.write().await.remove(list_id).is_some())
    }

    async fn calculate_stats(&self, user_id: &Uuid) -> anyhow::Result<VerificationStats> {
        let lists = self.lists.read().await;
        Ok(VerificationStats::from_lists(
            lists.values().filter(|l| &l.uploaded_by == user_id),
        ))
    }
}
