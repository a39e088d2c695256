use std::sync::Arc;

use poem::{Endpoint, EndpointExt, Route, middleware::Tracing};
use poem_openapi::OpenApiService;

use crate::presentation::http::{
    cors::{AllowedOrigins, OriginGuard},
    endpoints::root::{ApiState, endpoints},
};

pub mod cors;
pub mod endpoints;
pub mod errors;
pub mod mappers;
pub mod requests;
pub mod responses;
pub mod security;

#[cfg(test)]
mod tests;

/// API under `/api` behind the origin policy, Swagger UI at `/`.
pub fn app(
    state: Arc<ApiState>,
    allowed: AllowedOrigins,
    server_url: &str,
) -> impl Endpoint + use<> {
    let api_service = OpenApiService::new(endpoints(state), "Email Verification API", "0.1.0")
        .server(format!("{server_url}/api"));
    let ui = api_service.swagger_ui();
    let api = api_service
        .with(allowed.cors())
        .with(OriginGuard::new(allowed));
    Route::new().nest("/api", api).nest("/", ui).with(Tracing)
}
