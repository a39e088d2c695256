use std::sync::Arc;

use uuid::Uuid;

use crate::{
    application::services::{
        credit::CreditService,
        verification::{SingleVerification, VerificationProvider},
    },
    domain::{
        errors::{DomainError, DomainResult},
        models::{CreditEntryStatus, is_valid_email},
    },
};

const SINGLE_VERIFICATION_COST: i64 = 1;

pub struct VerifySingleEmailUseCase {
    provider: Arc<dyn VerificationProvider>,
    credits: Arc<CreditService>,
}

impl VerifySingleEmailUseCase {
    pub fn new(provider: Arc<dyn VerificationProvider>, credits: Arc<CreditService>) -> Self {
        Self { provider, credits }
    }

    /// One credit per address, charged only after the provider answered.
    pub async fn execute(&self, user_id: Uuid, email: &str) -> DomainResult<SingleVerification> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(DomainError::Validation("invalid email address".to_string()));
        }

        self.credits
            .ensure_enough_credits(user_id, SINGLE_VERIFICATION_COST)
            .await?;

        let result = self.provider.verify_single_email(email).await?;

        self.credits
            .deduct_credits(
                user_id,
                SINGLE_VERIFICATION_COST,
                format!("Verified {email}"),
                CreditEntryStatus::VerifiedEmail,
            )
            .await?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::services::verification::{EmailVerdict, testing::FakeProvider},
        domain::{
            models::{CreditAccount, CreditHistoryQuery},
            repositories::CreditRepository,
        },
        infrastructure::repositories::in_memory::InMemoryCreditRepository,
    };

    async fn setup(balance: i64) -> (VerifySingleEmailUseCase, Arc<InMemoryCreditRepository>, Uuid) {
        let repo = Arc::new(InMemoryCreditRepository::new());
        let user_id = Uuid::new_v4();
        repo.put(CreditAccount {
            total_credits: balance,
            remaining_credits: balance,
            ..CreditAccount::empty(user_id)
        })
        .await;
        let credits = Arc::new(CreditService::new(repo.clone()));
        let usecase = VerifySingleEmailUseCase::new(Arc::new(FakeProvider::new()), credits);
        (usecase, repo, user_id)
    }

    #[tokio::test]
    async fn verification_costs_one_credit() {
        let (usecase, repo, user_id) = setup(3).await;

        let result = usecase.execute(user_id, "owner@example.com").await.unwrap();
        assert_eq!(result.verdict, EmailVerdict::Deliverable);

        let account = repo.find(&user_id).await.unwrap().unwrap();
        assert_eq!(account.remaining_credits, 2);
        assert_eq!(account.used_credits, 1);

        let history = repo
            .history(&user_id, &CreditHistoryQuery::default())
            .await
            .unwrap();
        assert_eq!(history.entries[0].status, CreditEntryStatus::VerifiedEmail);
        assert_eq!(history.entries[0].description, "Verified owner@example.com");
    }

    #[tokio::test]
    async fn empty_balance_is_rejected_before_calling_provider() {
        let (usecase, _, user_id) = setup(0).await;
        assert!(matches!(
            usecase.execute(user_id, "owner@example.com").await,
            Err(DomainError::InsufficientCredits { required: 1, remaining: 0 })
        ));
    }

    #[tokio::test]
    async fn provider_failure_is_not_charged() {
        let (usecase, repo, user_id) = setup(3).await;

        let err = usecase.execute(user_id, "owner@down.test").await.unwrap_err();
        assert!(matches!(err, DomainError::Provider(ref e) if e.status == Some(503)));

        let account = repo.find(&user_id).await.unwrap().unwrap();
        assert_eq!(account.remaining_credits, 3);
    }

    #[tokio::test]
    async fn malformed_address_is_rejected() {
        let (usecase, _, user_id) = setup(3).await;
        assert!(matches!(
            usecase.execute(user_id, "not-an-email").await,
            Err(DomainError::Validation(_))
        ));
    }
}
