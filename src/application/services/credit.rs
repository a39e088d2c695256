use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    errors::{DomainError, DomainResult},
    models::{
        CreditAccount, CreditEntryStatus, CreditHistoryPage, CreditHistoryQuery,
        credit::ensure_positive,
    },
    repositories::{CreditChange, CreditRepository, DeductOutcome},
};

pub const MAX_HISTORY_PAGE: u32 = 100;

/// Balance plus one page of history.
#[derive(Debug, Clone)]
pub struct CreditDetails {
    pub account: CreditAccount,
    pub history: CreditHistoryPage,
}

/// Credit ledger. Every mutation goes through the repository's atomic
/// balance-plus-history operations.
pub struct CreditService {
    repo: Arc<dyn CreditRepository>,
}

impl CreditService {
    pub fn new(repo: Arc<dyn CreditRepository>) -> Self {
        Self { repo }
    }

    pub async fn initialize_credits(&self, user_id: Uuid) -> DomainResult<CreditAccount> {
        Ok(self.repo.create_if_absent(&user_id).await?)
    }

    pub async fn has_enough_credits(&self, user_id: Uuid, amount: i64) -> DomainResult<bool> {
        let Some(account) = self.repo.find(&user_id).await? else {
            return Ok(false);
        };
        Ok(account.can_spend(amount, Utc::now()))
    }

    /// Errors with `InsufficientCredits` when the balance is short or expired,
    /// so callers can report the exact shortfall.
    pub async fn ensure_enough_credits(&self, user_id: Uuid, amount: i64) -> DomainResult<()> {
        let account = self
            .repo
            .find(&user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("credit record".to_string()))?;
        if account.is_expired(Utc::now()) {
            return Err(DomainError::InsufficientCredits {
                required: amount,
                remaining: 0,
            });
        }
        if account.remaining_credits < amount {
            return Err(DomainError::InsufficientCredits {
                required: amount,
                remaining: account.remaining_credits,
            });
        }
        Ok(())
    }

    pub async fn deduct_credits(
        &self,
        user_id: Uuid,
        amount: i64,
        description: impl Into<String>,
        status: CreditEntryStatus,
    ) -> DomainResult<CreditAccount> {
        ensure_positive(amount)?;
        let outcome = self
            .repo
            .deduct(CreditChange {
                user_id,
                amount,
                description: description.into(),
                status,
                valid_till: None,
            })
            .await?;

        match outcome {
            DeductOutcome::Applied(account) => {
                info!(%user_id, amount, remaining = account.remaining_credits, "credits deducted");
                Ok(account)
            }
            DeductOutcome::Missing => Err(DomainError::NotFound("credit record".to_string())),
            DeductOutcome::Insufficient { remaining } => Err(DomainError::InsufficientCredits {
                required: amount,
                remaining,
            }),
        }
    }

    pub async fn add_credits(
        &self,
        user_id: Uuid,
        amount: i64,
        description: impl Into<String>,
        status: CreditEntryStatus,
        valid_till: Option<DateTime<Utc>>,
    ) -> DomainResult<CreditAccount> {
        ensure_positive(amount)?;
        let account = self
            .repo
            .add(CreditChange {
                user_id,
                amount,
                description: description.into(),
                status,
                valid_till,
            })
            .await?;
        info!(%user_id, amount, remaining = account.remaining_credits, "credits added");
        Ok(account)
    }

    pub async fn get_credit_details(
        &self,
        user_id: Uuid,
        mut query: CreditHistoryQuery,
    ) -> DomainResult<CreditDetails> {
        query.page = query.page.max(1);
        query.limit = query.limit.clamp(1, MAX_HISTORY_PAGE);

        let account = self.repo.create_if_absent(&user_id).await?;
        let history = self.repo.history(&user_id, &query).await?;
        Ok(CreditDetails { account, history })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::models::{CreditEntryType, CreditHistoryFilter};
    use crate::infrastructure::repositories::in_memory::InMemoryCreditRepository;

    async fn seeded(total: i64, used: i64) -> (CreditService, Arc<InMemoryCreditRepository>, Uuid) {
        let repo = Arc::new(InMemoryCreditRepository::new());
        let user_id = Uuid::new_v4();
        repo.put(CreditAccount {
            total_credits: total,
            used_credits: used,
            remaining_credits: total - used,
            ..CreditAccount::empty(user_id)
        })
        .await;
        (CreditService::new(repo.clone()), repo, user_id)
    }

    #[tokio::test]
    async fn deduction_updates_counters_and_appends_history() {
        let (service, repo, user_id) = seeded(100, 20).await;

        let account = service
            .deduct_credits(user_id, 30, "Single email verification", CreditEntryStatus::VerifiedEmail)
            .await
            .unwrap();

        assert_eq!(
            (account.total_credits, account.used_credits, account.remaining_credits),
            (100, 50, 50)
        );
        let page = repo
            .history(&user_id, &CreditHistoryQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].amount, 30);
        assert_eq!(page.entries[0].entry_type, CreditEntryType::Deduction);
    }

    #[tokio::test]
    async fn over_deduction_is_reported_and_changes_nothing() {
        let (service, repo, user_id) = seeded(10, 0).await;

        let err = service
            .deduct_credits(user_id, 11, "too much", CreditEntryStatus::VerifiedList)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientCredits {
                required: 11,
                remaining: 10
            }
        ));
        let account = repo.find(&user_id).await.unwrap().unwrap();
        assert_eq!(account.remaining_credits, 10);
        assert_eq!(account.used_credits, 0);
        let page = repo
            .history(&user_id, &CreditHistoryQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn deducting_without_record_is_not_found() {
        let service = CreditService::new(Arc::new(InMemoryCreditRepository::new()));
        let err = service
            .deduct_credits(Uuid::new_v4(), 1, "x", CreditEntryStatus::VerifiedEmail)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let (service, _, user_id) = seeded(40, 10).await;
        let account = service.initialize_credits(user_id).await.unwrap();
        assert_eq!(account.remaining_credits, 30);

        let fresh = Uuid::new_v4();
        let first = service.initialize_credits(fresh).await.unwrap();
        let second = service.initialize_credits(fresh).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total_credits, 0);
    }

    #[tokio::test]
    async fn has_enough_credits_respects_record_balance_and_expiry() {
        let service = CreditService::new(Arc::new(InMemoryCreditRepository::new()));
        assert!(!service.has_enough_credits(Uuid::new_v4(), 1).await.unwrap());

        let (service, repo, user_id) = seeded(50, 0).await;
        assert!(service.has_enough_credits(user_id, 50).await.unwrap());
        assert!(!service.has_enough_credits(user_id, 51).await.unwrap());

        let mut account = repo.find(&user_id).await.unwrap().unwrap();
        account.valid_till = Some(Utc::now() - Duration::minutes(1));
        repo.put(account).await;
        assert!(!service.has_enough_credits(user_id, 1).await.unwrap());
    }

    #[tokio::test]
    async fn adding_credits_initializes_missing_record() {
        let service = CreditService::new(Arc::new(InMemoryCreditRepository::new()));
        let user_id = Uuid::new_v4();
        let account = service
            .add_credits(user_id, 25, "Welcome bonus", CreditEntryStatus::Allocated, None)
            .await
            .unwrap();
        assert_eq!(
            (account.total_credits, account.used_credits, account.remaining_credits),
            (25, 0, 25)
        );
    }

    #[tokio::test]
    async fn zero_amounts_are_validation_errors() {
        let (service, _, user_id) = seeded(10, 0).await;
        assert!(matches!(
            service
                .add_credits(user_id, 0, "nothing", CreditEntryStatus::Allocated, None)
                .await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            service
                .deduct_credits(user_id, -1, "negative", CreditEntryStatus::VerifiedEmail)
                .await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn details_filter_and_page_history() {
        let (service, _, user_id) = seeded(0, 0).await;
        service
            .add_credits(user_id, 100, "Purchase", CreditEntryStatus::Allocated, None)
            .await
            .unwrap();
        for n in 0..3 {
            service
                .deduct_credits(user_id, 1, format!("Single email {n}"), CreditEntryStatus::VerifiedEmail)
                .await
                .unwrap();
        }
        service
            .deduct_credits(user_id, 10, "Bulk verification of leads.csv", CreditEntryStatus::VerifiedList)
            .await
            .unwrap();

        let details = service
            .get_credit_details(
                user_id,
                CreditHistoryQuery {
                    filter: CreditHistoryFilter::Email,
                    page: 1,
                    limit: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(details.account.remaining_credits, 87);
        assert_eq!(details.history.total, 3);
        assert_eq!(details.history.entries.len(), 2);

        let details = service
            .get_credit_details(
                user_id,
                CreditHistoryQuery {
                    search: Some("LEADS".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(details.history.total, 1);
        assert_eq!(details.history.entries[0].amount, 10);

        let details = service
            .get_credit_details(
                user_id,
                CreditHistoryQuery {
                    filter: CreditHistoryFilter::Addition,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(details.history.total, 1);
    }

    #[tokio::test]
    async fn concurrent_deductions_never_overdraw() {
        let (service, repo, user_id) = seeded(10, 0).await;
        let service = Arc::new(service);

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .deduct_credits(user_id, 1, "race", CreditEntryStatus::VerifiedEmail)
                        .await
                        .is_ok()
                })
            })
            .collect();

        let mut applied = 0;
        for task in tasks {
            if task.await.unwrap() {
                applied += 1;
            }
        }

        assert_eq!(applied, 10);
        let account = repo.find(&user_id).await.unwrap().unwrap();
        assert_eq!(account.remaining_credits, 0);
        assert_eq!(account.used_credits, 10);
    }
}
