use std::io::Error;
use std::sync::Arc;

use poem::{Server, listener::TcpListener};
use sqlx::postgres::PgPoolOptions;
use tokio::main;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    application::{
        handlers::job_poller::{JobPoller, JobPollerConfig},
        services::{credit::CreditService, jwt::JwtServiceConfig},
        usecases::{
            authenticate_user::AuthenticateUserUseCase, lists::ListsUseCase,
            users::UsersUseCase, verify_single::VerifySingleEmailUseCase,
        },
    },
    config::Config,
    infrastructure::{
        repositories::postgres::{
            PostgresCreditRepository, PostgresListRepository, PostgresUserRepository,
        },
        verification::bouncify::{BouncifyClient, BouncifyConfig},
    },
    presentation::http::{app, cors::AllowedOrigins, endpoints::root::ApiState},
};

mod application;
mod config;
mod domain;
mod infrastructure;
mod presentation;

#[main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::try_parse().map_err(Error::other)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(Error::other)?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(Error::other)?;

    let user_repo = PostgresUserRepository::new(pool.clone());
    let credit_repo = PostgresCreditRepository::new(pool.clone());
    let list_repo = PostgresListRepository::new(pool);

    let provider = Arc::new(
        BouncifyClient::new(&BouncifyConfig {
            base_url: config.bouncify_api_url.clone(),
            api_key: config.bouncify_api_key.clone(),
            timeout: config.bouncify_timeout,
        })
        .map_err(Error::other)?,
    );

    let jwt_config = JwtServiceConfig {
        secret: config.jwt_secret.clone(),
        expiration: config.jwt_expiration,
    };

    let credit_service = Arc::new(CreditService::new(credit_repo));
    let lists_usecase = Arc::new(ListsUseCase::new(
        list_repo,
        provider.clone(),
        credit_service.clone(),
    ));
    let job_poller = Arc::new(JobPoller::new(
        lists_usecase.clone(),
        JobPollerConfig {
            interval: config.poll_interval,
            max_attempts: config.poll_max_attempts,
        },
    ));
    job_poller.resume().await.map_err(Error::other)?;

    let state = Arc::new(ApiState {
        auth_usecase: Arc::new(AuthenticateUserUseCase::new(
            user_repo.clone(),
            jwt_config.clone(),
        )),
        users_usecase: Arc::new(UsersUseCase::new(user_repo, credit_service.clone())),
        credit_service: credit_service.clone(),
        lists_usecase,
        verify_single_usecase: Arc::new(VerifySingleEmailUseCase::new(provider, credit_service)),
        job_poller,
        jwt_config,
    });

    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);
    info!(%server_url, "starting server");

    let allowed = AllowedOrigins::new(&config.cors_allowed_domains);
    let endpoint = app(state, allowed, &server_url);

    Server::new(TcpListener::bind(format!("0.0.0.0:{}", config.port)))
        .run(endpoint)
        .await
}
