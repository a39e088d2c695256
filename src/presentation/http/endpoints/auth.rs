use std::sync::Arc;

use poem_openapi::{OpenApi, payload::Json};

use crate::{
    application::usecases::authenticate_user::AuthRequest,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        errors::ApiResult,
        requests::LoginRequestDto,
        responses::{Envelope, TokenDto},
    },
};

#[derive(Clone)]
pub struct AuthEndpoints {
    state: Arc<ApiState>,
}

impl AuthEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl AuthEndpoints {
    #[oai(path = "/auth/login", method = "post", tag = EndpointsTags::Auth)]
    pub async fn login(
        &self,
        request: Json<LoginRequestDto>,
    ) -> ApiResult<Json<Envelope<TokenDto>>> {
        let request = request.0;
        let response = self
            .state
            .auth_usecase
            .execute(AuthRequest {
                email: request.email,
                password: request.password,
            })
            .await?;

        Ok(Envelope::success(
            "Logged in successfully",
            TokenDto {
                access_token: response.access_token,
                token_type: "Bearer".to_string(),
            },
        ))
    }
}
