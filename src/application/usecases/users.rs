use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::services::{credit::CreditService, password::hash_password, timezones},
    domain::{
        errors::{DomainError, DomainResult},
        models::{MIN_PASSWORD_LENGTH, User, is_valid_email},
        repositories::UserRepository,
    },
};

pub struct CreateUserRequest {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
}

#[derive(Default)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// User directory: signup, profile CRUD and timezone preference.
pub struct UsersUseCase {
    user_repo: Arc<dyn UserRepository>,
    credits: Arc<CreditService>,
}

impl UsersUseCase {
    pub fn new(user_repo: Arc<dyn UserRepository>, credits: Arc<CreditService>) -> Self {
        Self { user_repo, credits }
    }

    pub async fn create(&self, request: CreateUserRequest) -> DomainResult<User> {
        let email = normalize_email(&request.email)?;
        validate_password(&request.password)?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(DomainError::AlreadyExists(
                "user with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            username: normalize_username(request.username),
            password_hash: hash_password(&request.password)?,
            timezone: None,
            created_at: now,
            updated_at: now,
        };
        self.user_repo.upsert(&user).await?;
        self.credits.initialize_credits(user.id).await?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub async fn get(&self, user_id: Uuid) -> DomainResult<User> {
        self.user_repo
            .get(&user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("user".to_string()))
    }

    pub async fn list(&self) -> DomainResult<Vec<User>> {
        Ok(self.user_repo.list().await?)
    }

    pub async fn update(&self, user_id: Uuid, request: UpdateUserRequest) -> DomainResult<User> {
        let username = normalize_username(request.username);
        if request.email.is_none() && username.is_none() && request.password.is_none() {
            return Err(DomainError::Validation(
                "at least one of username, email or password is required".to_string(),
            ));
        }

        let mut user = self.get(user_id).await?;

        if let Some(email) = request.email {
            let email = normalize_email(&email)?;
            if let Some(existing) = self.user_repo.find_by_email(&email).await? {
                if existing.id != user_id {
                    return Err(DomainError::AlreadyExists(
                        "user with this email already exists".to_string(),
                    ));
                }
            }
            user.email = email;
        }
        if let Some(username) = username {
            user.username = Some(username);
        }
        if let Some(password) = request.password {
            validate_password(&password)?;
            user.password_hash = hash_password(&password)?;
        }

        user.updated_at = Utc::now();
        self.user_repo.upsert(&user).await?;
        Ok(user)
    }

    pub async fn delete(&self, user_id: Uuid) -> DomainResult<User> {
        let user = self
            .user_repo
            .delete(&user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("user".to_string()))?;
        info!(%user_id, "user deleted");
        Ok(user)
    }

    /// Accepts `%2F` in place of `/` so zone names survive a single path segment.
    pub async fn save_timezone(&self, user_id: Uuid, timezone: &str) -> DomainResult<User> {
        let timezone = timezone.trim().replace("%2F", "/").replace("%2f", "/");
        if timezone.is_empty() {
            return Err(DomainError::Validation("timezone is required".to_string()));
        }
        let preference = timezones::resolve(&timezone)
            .ok_or_else(|| DomainError::Validation(format!("invalid timezone: {timezone}")))?;

        let mut user = self.get(user_id).await?;
        user.timezone = Some(preference);
        user.updated_at = Utc::now();
        self.user_repo.upsert(&user).await?;
        Ok(user)
    }
}

fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(DomainError::Validation("invalid email address".to_string()));
    }
    Ok(email.to_ascii_lowercase())
}

fn normalize_username(username: Option<String>) -> Option<String> {
    username
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(DomainError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::services::password::verify_password,
        domain::repositories::CreditRepository,
        infrastructure::repositories::in_memory::{
            InMemoryCreditRepository, InMemoryListRepository, InMemoryUserRepository,
        },
    };

    struct Harness {
        users: UsersUseCase,
        credits: Arc<InMemoryCreditRepository>,
    }

    fn harness() -> Harness {
        let credits = Arc::new(InMemoryCreditRepository::new());
        let lists = Arc::new(InMemoryListRepository::new());
        let repo = Arc::new(InMemoryUserRepository::with_cascade(credits.clone(), lists));
        Harness {
            users: UsersUseCase::new(repo, Arc::new(CreditService::new(credits.clone()))),
            credits,
        }
    }

    fn signup(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            username: Some("owner".to_string()),
            password: "secret-password".to_string(),
        }
    }

    #[tokio::test]
    async fn signup_hashes_password_and_opens_credit_account() {
        let h = harness();
        let user = h.users.create(signup("Owner@Example.com")).await.unwrap();

        assert_eq!(user.email, "owner@example.com");
        assert_ne!(user.password_hash, "secret-password");
        assert!(verify_password("secret-password", &user.password_hash));
        let account = h.credits.find(&user.id).await.unwrap().unwrap();
        assert_eq!(account.remaining_credits, 0);
    }

    #[tokio::test]
    async fn signup_validates_fields() {
        let h = harness();
        assert!(matches!(
            h.users.create(signup("not-an-email")).await,
            Err(DomainError::Validation(_))
        ));
        let mut short = signup("owner@example.com");
        short.password = "12345".to_string();
        assert!(matches!(
            h.users.create(short).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let h = harness();
        h.users.create(signup("owner@example.com")).await.unwrap();
        assert!(matches!(
            h.users.create(signup("OWNER@example.com")).await,
            Err(DomainError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn update_requires_a_field_and_unique_email() {
        let h = harness();
        let first = h.users.create(signup("first@example.com")).await.unwrap();
        h.users.create(signup("second@example.com")).await.unwrap();

        assert!(matches!(
            h.users.update(first.id, UpdateUserRequest::default()).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            h.users
                .update(
                    first.id,
                    UpdateUserRequest {
                        email: Some("second@example.com".to_string()),
                        ..Default::default()
                    }
                )
                .await,
            Err(DomainError::AlreadyExists(_))
        ));

        let updated = h
            .users
            .update(
                first.id,
                UpdateUserRequest {
                    email: Some("first@example.com".to_string()),
                    username: Some("renamed".to_string()),
                    password: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username.as_deref(), Some("renamed"));
    }

    #[tokio::test]
    async fn delete_cascades_to_credits() {
        let h = harness();
        let user = h.users.create(signup("owner@example.com")).await.unwrap();
        h.users.delete(user.id).await.unwrap();

        assert!(h.credits.find(&user.id).await.unwrap().is_none());
        assert!(matches!(
            h.users.get(user.id).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            h.users.delete(user.id).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn timezone_is_resolved_and_stored() {
        let h = harness();
        let user = h.users.create(signup("owner@example.com")).await.unwrap();

        let updated = h
            .users
            .save_timezone(user.id, "Asia%2FKolkata")
            .await
            .unwrap();
        let tz = updated.timezone.unwrap();
        assert_eq!(tz.key, "Asia/Kolkata");
        assert_eq!(tz.value, "(GMT+05:30)");

        assert!(matches!(
            h.users.save_timezone(user.id, "Nowhere/Special").await,
            Err(DomainError::Validation(_))
        ));
    }
}
