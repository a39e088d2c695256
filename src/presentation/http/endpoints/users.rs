use std::sync::Arc;

use poem_openapi::{OpenApi, param::Path, payload::Json};
use uuid::Uuid;

use crate::{
    application::usecases::users::CreateUserRequest,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        errors::{ApiError, ApiResult},
        mappers::map_user,
        requests::{CreateUserRequestDto, UpdateUserRequestDto},
        responses::{Envelope, UserDto},
        security::{AuthenticatedUser, JwtAuth},
    },
};

#[derive(Clone)]
pub struct UsersEndpoints {
    state: Arc<ApiState>,
}

impl UsersEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

fn ensure_self(user: &AuthenticatedUser, user_id: Uuid) -> ApiResult<()> {
    if user.user_id == user_id {
        Ok(())
    } else {
        Err(ApiError::forbidden("you can only manage your own account"))
    }
}

#[OpenApi]
impl UsersEndpoints {
    /// Signup. Also opens an empty credit account.
    #[oai(path = "/users", method = "post", tag = EndpointsTags::Users)]
    pub async fn create_user(
        &self,
        request: Json<CreateUserRequestDto>,
    ) -> ApiResult<Json<Envelope<UserDto>>> {
        let request = request.0;
        let user = self
            .state
            .users_usecase
            .create(CreateUserRequest {
                email: request.email,
                username: request.username,
                password: request.password,
            })
            .await?;
        Ok(Envelope::success("User created successfully", map_user(&user)))
    }

    #[oai(path = "/users", method = "get", tag = EndpointsTags::Users)]
    pub async fn list_users(&self, auth: JwtAuth) -> ApiResult<Json<Envelope<Vec<UserDto>>>> {
        auth.into_user(&self.state).await?;
        let users = self.state.users_usecase.list().await?;
        Ok(Envelope::success(
            "Users fetched successfully",
            users.iter().map(map_user).collect(),
        ))
    }

    #[oai(path = "/users/:user_id", method = "get", tag = EndpointsTags::Users)]
    pub async fn get_user(
        &self,
        auth: JwtAuth,
        user_id: Path<Uuid>,
    ) -> ApiResult<Json<Envelope<UserDto>>> {
        let caller = auth.into_user(&self.state).await?;
        ensure_self(&caller, user_id.0)?;
        let user = self.state.users_usecase.get(user_id.0).await?;
        Ok(Envelope::success("User fetched successfully", map_user(&user)))
    }

    #[oai(path = "/users/:user_id", method = "put", tag = EndpointsTags::Users)]
    pub async fn update_user(
        &self,
        auth: JwtAuth,
        user_id: Path<Uuid>,
        request: Json<UpdateUserRequestDto>,
    ) -> ApiResult<Json<Envelope<UserDto>>> {
        let caller = auth.into_user(&self.state).await?;
        ensure_self(&caller, user_id.0)?;
        let user = self
            .state
            .users_usecase
            .update(user_id.0, request.0.into())
            .await?;
        Ok(Envelope::success("User updated successfully", map_user(&user)))
    }

    #[oai(path = "/users/:user_id", method = "delete", tag = EndpointsTags::Users)]
    pub async fn delete_user(
        &self,
        auth: JwtAuth,
        user_id: Path<Uuid>,
    ) -> ApiResult<Json<Envelope<UserDto>>> {
        let caller = auth.into_user(&self.state).await?;
        ensure_self(&caller, user_id.0)?;
        // Pollers of the user's lists stop by themselves once the lists are gone.
        let user = self.state.users_usecase.delete(user_id.0).await?;
        Ok(Envelope::success("User deleted successfully", map_user(&user)))
    }
}
