use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    errors::ProviderError,
    models::{ListCounts, ListStatus},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmailVerdict {
    Deliverable,
    Undeliverable,
    AcceptAll,
    Unknown,
}

impl EmailVerdict {
    pub fn from_provider(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "deliverable" => EmailVerdict::Deliverable,
            "undeliverable" => EmailVerdict::Undeliverable,
            "accept_all" | "accept-all" | "accept all" => EmailVerdict::AcceptAll,
            _ => EmailVerdict::Unknown,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SingleVerification {
    pub email: String,
    pub verdict: EmailVerdict,
    /// Untouched provider payload, forwarded to clients as-is.
    pub details: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct UploadedJob {
    pub job_id: String,
}

#[derive(Debug, Clone)]
pub struct BulkJobStatus {
    pub job_id: String,
    pub provider_status: String,
    pub counts: ListCounts,
}

impl BulkJobStatus {
    /// Provider states that are neither finished nor failed count as still processing.
    pub fn list_status(&self) -> ListStatus {
        match self.provider_status.to_ascii_lowercase().as_str() {
            "completed" => ListStatus::Completed,
            "failed" | "cancelled" | "canceled" | "unverified" | "error" => ListStatus::Failed,
            _ => ListStatus::Processing,
        }
    }
}

/// Outbound gateway to the bulk verification provider. One call per method,
/// no retries.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    async fn verify_single_email(&self, email: &str) -> Result<SingleVerification, ProviderError>;
    async fn upload_file(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<UploadedJob, ProviderError>;
    async fn start_bulk_verification(&self, job_id: &str) -> Result<(), ProviderError>;
    async fn get_bulk_status(&self, job_id: &str) -> Result<BulkJobStatus, ProviderError>;
    async fn remove_bulk_email_list(&self, job_id: &str) -> Result<(), ProviderError>;
    async fn download_bulk_email_list(&self, job_id: &str) -> Result<Vec<u8>, ProviderError>;
}
