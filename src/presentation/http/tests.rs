use std::sync::Arc;
use std::time::Duration;

use poem::{
    EndpointExt,
    endpoint::BoxEndpoint,
    http::StatusCode,
    test::{TestClient, TestForm, TestFormField},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    application::{
        handlers::job_poller::{JobPoller, JobPollerConfig},
        services::{
            credit::CreditService, jwt::JwtServiceConfig, verification::testing::FakeProvider,
        },
        usecases::{
            authenticate_user::AuthenticateUserUseCase, lists::ListsUseCase, users::UsersUseCase,
            verify_single::VerifySingleEmailUseCase,
        },
    },
    domain::models::ListCounts,
    infrastructure::repositories::in_memory::{
        InMemoryCreditRepository, InMemoryListRepository, InMemoryUserRepository,
    },
    presentation::http::{app, cors::AllowedOrigins, endpoints::root::ApiState},
};

const ORIGIN: &str = "http://localhost:1337";

struct TestApp {
    client: TestClient<BoxEndpoint<'static>>,
    provider: Arc<FakeProvider>,
    job_poller: Arc<JobPoller>,
}

fn test_app() -> TestApp {
    test_app_with(FakeProvider::new())
}

fn test_app_with(provider: FakeProvider) -> TestApp {
    let credit_repo = Arc::new(InMemoryCreditRepository::new());
    let list_repo = Arc::new(InMemoryListRepository::new());
    let user_repo = Arc::new(InMemoryUserRepository::with_cascade(
        credit_repo.clone(),
        list_repo.clone(),
    ));
    let provider = Arc::new(provider);
    let jwt_config = JwtServiceConfig {
        secret: "test-secret".to_string(),
        expiration: Duration::from_secs(3600),
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
            interval: Duration::from_secs(3600),
            max_attempts: 1,
        },
    ));

    let state = Arc::new(ApiState {
        auth_usecase: Arc::new(AuthenticateUserUseCase::new(
            user_repo.clone(),
            jwt_config.clone(),
        )),
        users_usecase: Arc::new(UsersUseCase::new(user_repo, credit_service.clone())),
        credit_service: credit_service.clone(),
        lists_usecase,
        verify_single_usecase: Arc::new(VerifySingleEmailUseCase::new(
            provider.clone(),
            credit_service,
        )),
        job_poller: job_poller.clone(),
        jwt_config,
    });

    let allowed = AllowedOrigins::new(["localhost:1337", "pabbly.com"]);
    // The endpoint must outlive the borrowed server url.
    let server_url = String::from("http://localhost:3000");
    let endpoint = app(state, allowed, &server_url).map_to_response().boxed();
    drop(server_url);
    TestApp {
        client: TestClient::new(endpoint),
        provider,
        job_poller,
    }
}

impl TestApp {
    /// Signs up and logs in, returning the user id and bearer header value.
    async fn signup(&self, email: &str) -> (String, String) {
        let resp = self
            .client
            .post("/api/users")
            .header("origin", ORIGIN)
            .body_json(&json!({ "email": email, "password": "secret123" }))
            .send()
            .await;
        resp.assert_status_is_ok();
        let body = resp.json().await;
        let user_id = body.value().object().get("data").object().get("id").string().to_string();

        let resp = self
            .client
            .post("/api/auth/login")
            .header("origin", ORIGIN)
            .body_json(&json!({ "email": email, "password": "secret123" }))
            .send()
            .await;
        resp.assert_status_is_ok();
        let body = resp.json().await;
        let token = body
            .value()
            .object()
            .get("data")
            .object()
            .get("access_token")
            .string()
            .to_string();
        (user_id, format!("Bearer {token}"))
    }

    async fn add_credits(&self, bearer: &str, amount: i64) {
        self.client
            .post("/api/users/credit")
            .header("origin", ORIGIN)
            .header("authorization", bearer)
            .body_json(&json!({ "amount": amount }))
            .send()
            .await
            .assert_status_is_ok();
    }
}

#[tokio::test]
async fn requests_without_allowed_origin_are_forbidden() {
    let app = test_app();

    app.client
        .get("/api/health")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.client
        .get("/api/health")
        .header("origin", "https://evil.example")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let resp = app
        .client
        .get("/api/health")
        .header("origin", "https://app.pabbly.com")
        .send()
        .await;
    resp.assert_status_is_ok();
    resp.assert_text("OK").await;
}

#[tokio::test]
async fn signup_login_and_profile_access() {
    let app = test_app();
    let (user_id, bearer) = app.signup("owner@example.com").await;

    let resp = app
        .client
        .get(format!("/api/users/{user_id}"))
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    let root = body.value().object();
    root.get("status").assert_string("success");
    root.get("data").object().get("email").assert_string("owner@example.com");

    let (other_id, _) = app.signup("other@example.com").await;
    app.client
        .get(format!("/api/users/{other_id}"))
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.client
        .get(format!("/api/users/{user_id}"))
        .header("origin", ORIGIN)
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_signup_is_rejected_with_error_envelope() {
    let app = test_app();
    app.signup("owner@example.com").await;

    let resp = app
        .client
        .post("/api/users")
        .header("origin", ORIGIN)
        .body_json(&json!({ "email": "OWNER@example.com", "password": "secret123" }))
        .send()
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body = resp.json().await;
    body.value().object().get("status").assert_string("error");
}

#[tokio::test]
async fn deleted_user_token_stops_working() {
    let app = test_app();
    let (user_id, bearer) = app.signup("owner@example.com").await;

    app.client
        .delete(format!("/api/users/{user_id}"))
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await
        .assert_status_is_ok();

    app.client
        .get("/api/users/credit")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn credits_can_be_added_and_listed() {
    let app = test_app();
    let (_, bearer) = app.signup("owner@example.com").await;
    app.add_credits(&bearer, 25).await;

    let resp = app
        .client
        .get("/api/users/credit")
        .query("filter", &"addition")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    let data = body.value().object().get("data").object();
    data.get("credits").object().get("remaining_credits").assert_i64(25);
    let history = data.get("history").array();
    history.assert_len(1);
    history.get(0).object().get("type").assert_string("ADDITION");
    history.get(0).object().get("status").assert_string("ALLOCATED");
    data.get("pagination").object().get("total").assert_i64(1);
}

#[tokio::test]
async fn single_verification_charges_one_credit() {
    let app = test_app();
    let (_, bearer) = app.signup("owner@example.com").await;

    app.client
        .post("/api/lists/validate-single")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .body_json(&json!({ "email": "lead@example.com" }))
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.add_credits(&bearer, 2).await;
    let resp = app
        .client
        .post("/api/lists/validate-single")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .body_json(&json!({ "email": "lead@example.com" }))
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    body.value()
        .object()
        .get("data")
        .object()
        .get("result")
        .assert_string("deliverable");
}

#[tokio::test]
async fn list_upload_start_and_status() {
    let app = test_app();
    let (_, bearer) = app.signup("owner@example.com").await;
    app.add_credits(&bearer, 10).await;

    let form = TestForm::new().field(
        TestFormField::bytes(b"email\na@example.com\nb@example.com\n".to_vec())
            .name("file")
            .filename("leads.csv")
            .content_type("text/csv"),
    );
    let resp = app
        .client
        .post("/api/lists")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .multipart(form)
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    let data = body.value().object().get("data").object();
    data.get("status").assert_string("PENDING");
    data.get("job_id").assert_string("job-1");
    data.get("counts").object().get("total").assert_i64(0);

    let counts = |verified| ListCounts {
        total: 2,
        verified,
        deliverable: verified,
        ..ListCounts::default()
    };
    app.provider
        .script("job-1", &[("ready", counts(0)), ("completed", counts(2))]);

    let resp = app
        .client
        .post("/api/lists/validate-bulk")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .body_json(&json!({ "job_id": "job-1" }))
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    body.value()
        .object()
        .get("data")
        .object()
        .get("status")
        .assert_string("PROCESSING");

    let resp = app
        .client
        .get("/api/lists/get-status")
        .query("job_id", &"job-1")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    body.value()
        .object()
        .get("data")
        .object()
        .get("status")
        .assert_string("COMPLETED");

    let resp = app
        .client
        .get("/api/lists/stats")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    let stats = body.value().object().get("data").object();
    stats.get("total_emails").assert_i64(2);
    stats.get("deliverable").assert_i64(2);

    let resp = app
        .client
        .get("/api/users/credit")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await;
    let body = resp.json().await;
    body.value()
        .object()
        .get("data")
        .object()
        .get("credits")
        .object()
        .get("remaining_credits")
        .assert_i64(8);

    app.client
        .get("/api/lists/download/job-1")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await
        .assert_status_is_ok();
}

#[tokio::test]
async fn non_csv_upload_is_rejected() {
    let app = test_app();
    let (_, bearer) = app.signup("owner@example.com").await;

    let form = TestForm::new().field(
        TestFormField::bytes(b"a@example.com".to_vec())
            .name("file")
            .filename("leads.txt")
            .content_type("text/plain"),
    );
    app.client
        .post("/api/lists")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .multipart(form)
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_list_is_not_found() {
    let app = test_app();
    let (_, bearer) = app.signup("owner@example.com").await;

    app.client
        .get("/api/lists/get-status")
        .query("job_id", &"missing")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_delete_keeps_watching_the_list() {
    let app = test_app_with(FakeProvider::failing_removals());
    let (_, bearer) = app.signup("owner@example.com").await;
    app.add_credits(&bearer, 10).await;

    let form = TestForm::new().field(
        TestFormField::bytes(b"email\na@example.com\n".to_vec())
            .name("file")
            .filename("leads.csv")
            .content_type("text/csv"),
    );
    let resp = app
        .client
        .post("/api/lists")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .multipart(form)
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    let list_id = Uuid::parse_str(body.value().object().get("data").object().get("id").string())
        .unwrap();

    let total = ListCounts {
        total: 1,
        ..ListCounts::default()
    };
    app.provider
        .script("job-1", &[("ready", total), ("verifying", total)]);
    app.client
        .post("/api/lists/validate-bulk")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .body_json(&json!({ "job_id": "job-1" }))
        .send()
        .await
        .assert_status_is_ok();
    assert!(app.job_poller.is_watching(&list_id).await);

    app.client
        .delete("/api/lists")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .body_json(&json!({ "job_id": "job-1" }))
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.job_poller.is_watching(&list_id).await);

    let resp = app
        .client
        .get("/api/lists/get-status")
        .query("job_id", &"job-1")
        .header("origin", ORIGIN)
        .header("authorization", &bearer)
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    body.value()
        .object()
        .get("data")
        .object()
        .get("status")
        .assert_string("PROCESSING");
}
