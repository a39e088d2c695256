use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::{
    handlers::job_poller::JobPoller,
    services::{credit::CreditService, jwt::JwtServiceConfig},
    usecases::{
        authenticate_user::AuthenticateUserUseCase, lists::ListsUseCase, users::UsersUseCase,
        verify_single::VerifySingleEmailUseCase,
    },
};
use crate::presentation::http::endpoints::{
    auth::AuthEndpoints, credits::CreditsEndpoints, health::HealthEndpoints,
    lists::ListsEndpoints, timezones::TimezonesEndpoints, users::UsersEndpoints,
};

#[derive(Clone)]
pub struct ApiState {
    pub auth_usecase: Arc<AuthenticateUserUseCase>,
    pub users_usecase: Arc<UsersUseCase>,
    pub credit_service: Arc<CreditService>,
    pub lists_usecase: Arc<ListsUseCase>,
    pub verify_single_usecase: Arc<VerifySingleEmailUseCase>,
    pub job_poller: Arc<JobPoller>,
    pub jwt_config: JwtServiceConfig,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Auth,
    Users,
    Credits,
    Timezones,
    Lists,
}

pub type Endpoints = (
    HealthEndpoints,
    AuthEndpoints,
    UsersEndpoints,
    CreditsEndpoints,
    TimezonesEndpoints,
    ListsEndpoints,
);

pub fn endpoints(state: Arc<ApiState>) -> Endpoints {
    (
        HealthEndpoints,
        AuthEndpoints::new(state.clone()),
        UsersEndpoints::new(state.clone()),
        CreditsEndpoints::new(state.clone()),
        TimezonesEndpoints::new(state.clone()),
        ListsEndpoints::new(state),
    )
}
