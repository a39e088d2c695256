use poem_openapi::SecurityScheme;
use poem_openapi::auth::Bearer;
use uuid::Uuid;

use crate::{
    application::services::jwt::JwtService,
    domain::errors::DomainError,
    presentation::http::{
        endpoints::root::ApiState,
        errors::{ApiError, ApiResult},
    },
};

#[derive(SecurityScheme)]
#[oai(ty = "bearer", bearer_format = "JWT")]
pub struct JwtAuth(pub Bearer);

pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

impl JwtAuth {
    /// Tokens of deleted users stop working even before they expire.
    pub async fn into_user(self, state: &ApiState) -> ApiResult<AuthenticatedUser> {
        let service = JwtService::new(state.jwt_config.clone());
        let claims = service
            .verify(&self.0.token)
            .map_err(|_| ApiError::unauthorized("invalid or expired token"))?;

        match state.users_usecase.get(claims.sub).await {
            Ok(user) => Ok(AuthenticatedUser {
                user_id: user.id,
                email: user.email,
            }),
            Err(DomainError::NotFound(_)) => Err(ApiError::unauthorized("account no longer exists")),
            Err(err) => Err(err.into()),
        }
    }
}
