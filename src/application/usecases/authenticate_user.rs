use std::sync::Arc;

use tracing::info;

use crate::{
    application::services::{
        jwt::{JwtService, JwtServiceConfig},
        password::verify_password,
    },
    domain::{
        errors::{DomainError, DomainResult},
        repositories::UserRepository,
    },
};

pub struct AuthenticateUserUseCase {
    user_repo: Arc<dyn UserRepository>,
    jwt: JwtService,
}

pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

pub struct AuthResponse {
    pub access_token: String,
}

impl AuthenticateUserUseCase {
    pub fn new(user_repo: Arc<dyn UserRepository>, jwt_config: JwtServiceConfig) -> Self {
        let jwt = JwtService::new(jwt_config);
        Self { user_repo, jwt }
    }

    pub async fn execute(&self, request: AuthRequest) -> DomainResult<AuthResponse> {
        let user = self
            .user_repo
            .find_by_email(request.email.trim())
            .await?
            .filter(|user| verify_password(&request.password, &user.password_hash))
            .ok_or_else(|| DomainError::Unauthorized("invalid email or password".to_string()))?;

        info!(user_id = %user.id, "user signed in");
        Ok(AuthResponse {
            access_token: self.jwt.issue(&user)?,
        })
    }
}
