use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, multipart};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::{
    application::services::verification::{
        BulkJobStatus, EmailVerdict, SingleVerification, UploadedJob, VerificationProvider,
    },
    domain::{errors::ProviderError, models::ListCounts},
};

#[derive(Debug, Clone)]
pub struct BouncifyConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

pub struct BouncifyClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl BouncifyClient {
    pub fn new(config: &BouncifyConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent("verification-service/bouncify")
            .timeout(config.timeout)
            .build()?;
        // A trailing slash keeps the version segment when joining paths.
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|err| ProviderError::transport(format!("Invalid provider url: {err}")))
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response, ProviderError> {
        let response = request
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|err| {
                warn!(operation, error = %err, "bouncify request failed");
                ProviderError::transport(format!("Unexpected error during {operation}"))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(ProviderError::http(status.as_u16(), provider_message(&body)))
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: Response,
        operation: &str,
    ) -> Result<T, ProviderError> {
        response.json::<T>().await.map_err(|err| {
            warn!(operation, error = %err, "unreadable bouncify response");
            ProviderError::transport(format!("Unexpected response during {operation}"))
        })
    }
}

#[async_trait]
impl VerificationProvider for BouncifyClient {
    async fn verify_single_email(&self, email: &str) -> Result<SingleVerification, ProviderError> {
        const OPERATION: &str = "email validation";
        let request = self
            .http
            .get(self.endpoint("verify")?)
            .query(&[("email", email)]);
        let response = self.send(request, OPERATION).await?;
        let details: serde_json::Value = Self::read_json(response, OPERATION).await?;

        let verdict = details
            .get("result")
            .and_then(serde_json::Value::as_str)
            .map(EmailVerdict::from_provider)
            .unwrap_or(EmailVerdict::Unknown);
        Ok(SingleVerification {
            email: email.to_string(),
            verdict,
            details,
        })
    }

    async fn upload_file(&self, file_name: &str, content: Vec<u8>) -> Result<UploadedJob, ProviderError> {
        const OPERATION: &str = "list upload";
        let part = multipart::Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|err| ProviderError::transport(format!("Invalid upload: {err}")))?;
        let form = multipart::Form::new().part("local_file", part);

        let request = self.http.post(self.endpoint("bulk")?).multipart(form);
        let response = self.send(request, OPERATION).await?;
        let body: UploadResponse = Self::read_json(response, OPERATION).await?;

        body.job_id
            .filter(|id| !id.is_empty())
            .map(|job_id| UploadedJob { job_id })
            .ok_or_else(|| {
                ProviderError::transport(format!("Unexpected response during {OPERATION}"))
            })
    }

    async fn start_bulk_verification(&self, job_id: &str) -> Result<(), ProviderError> {
        let request = self
            .http
            .patch(self.endpoint(&format!("bulk/{job_id}"))?)
            .json(&serde_json::json!({ "action": "start" }));
        self.send(request, "bulk email validation").await?;
        Ok(())
    }

    async fn get_bulk_status(&self, job_id: &str) -> Result<BulkJobStatus, ProviderError> {
        const OPERATION: &str = "bulk status retrieval";
        let request = self.http.get(self.endpoint(&format!("bulk/{job_id}"))?);
        let response = self.send(request, OPERATION).await?;
        let body: BulkStatusResponse = Self::read_json(response, OPERATION).await?;
        Ok(body.into_status(job_id))
    }

    async fn remove_bulk_email_list(&self, job_id: &str) -> Result<(), ProviderError> {
        let request = self.http.delete(self.endpoint(&format!("bulk/{job_id}"))?);
        self.send(request, "bulk list deletion").await?;
        Ok(())
    }

    async fn download_bulk_email_list(&self, job_id: &str) -> Result<Vec<u8>, ProviderError> {
        const OPERATION: &str = "bulk list download";
        let request = self
            .http
            .post(self.endpoint("download")?)
            .query(&[("jobId", job_id)]);
        let response = self.send(request, OPERATION).await?;
        let bytes = response.bytes().await.map_err(|err| {
            warn!(operation = OPERATION, error = %err, "failed reading download");
            ProviderError::transport(format!("Unexpected error during {OPERATION}"))
        })?;
        Ok(bytes.to_vec())
    }
}

/// Bouncify puts the human-readable reason in `message` or, for bulk
/// endpoints, in `result`.
fn provider_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message.or(body.result))
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| "Unknown Error".to_string())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BulkStatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    total: i64,
    #[serde(default)]
    verified: i64,
    #[serde(default)]
    results: BulkResults,
}

#[derive(Debug, Default, Deserialize)]
struct BulkResults {
    #[serde(default)]
    deliverable: i64,
    #[serde(default)]
    undeliverable: i64,
    #[serde(default)]
    accept_all: i64,
    #[serde(default)]
    unknown: i64,
}

impl BulkStatusResponse {
    fn into_status(self, job_id: &str) -> BulkJobStatus {
        BulkJobStatus {
            job_id: job_id.to_string(),
            provider_status: self.status,
            counts: ListCounts {
                total: self.total,
                verified: self.verified,
                deliverable: self.results.deliverable,
                undeliverable: self.results.undeliverable,
                accept_all: self.results.accept_all,
                unknown: self.results.unknown,
            },
        }
    }
}
