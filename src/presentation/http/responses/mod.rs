use poem_openapi::{
    Object,
    payload::Json,
    types::{ParseFromJSON, ToJSON},
};
use uuid::Uuid;

use crate::presentation::models::{
    CreditEntryKind, CreditEntryStatusKind, ListStatusKind, VerdictKind,
};

/// Success body shared by every endpoint.
#[derive(Object)]
pub struct Envelope<T: ParseFromJSON + ToJSON + Send + Sync> {
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T: ParseFromJSON + ToJSON + Send + Sync> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        })
    }
}

#[derive(Object, Debug)]
pub struct ErrorEnvelope {
    pub status: String,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Object)]
pub struct HealthDto {
    pub status: String,
}

#[derive(Object)]
pub struct TokenDto {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Object)]
pub struct TimezoneDto {
    pub key: String,
    pub value: String,
}

#[derive(Object)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub timezone: Option<TimezoneDto>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Object)]
pub struct CreditAccountDto {
    pub total_credits: i64,
    pub used_credits: i64,
    pub remaining_credits: i64,
    pub valid_till: Option<String>,
}

#[derive(Object)]
pub struct CreditHistoryEntryDto {
    pub id: Uuid,
    pub amount: i64,
    #[oai(rename = "type")]
    pub entry_type: CreditEntryKind,
    pub description: String,
    pub status: CreditEntryStatusKind,
    pub created_at: String,
}

#[derive(Object)]
pub struct PaginationDto {
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
}

#[derive(Object)]
pub struct CreditDetailsDto {
    pub credits: CreditAccountDto,
    pub history: Vec<CreditHistoryEntryDto>,
    pub pagination: PaginationDto,
}

#[derive(Object)]
pub struct ListCountsDto {
    pub total: i64,
    pub verified: i64,
    pub deliverable: i64,
    pub undeliverable: i64,
    pub accept_all: i64,
    pub unknown: i64,
}

#[derive(Object)]
pub struct EmailListDto {
    pub id: Uuid,
    pub job_id: Option<String>,
    pub file_name: String,
    pub status: ListStatusKind,
    pub counts: ListCountsDto,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Object)]
pub struct PaginatedListsDto {
    pub lists: Vec<EmailListDto>,
    pub has_more: bool,
    pub next_offset: Option<u32>,
}

#[derive(Object)]
pub struct VerificationStatsDto {
    pub total_emails: i64,
    pub deliverable: i64,
    pub undeliverable: i64,
    pub accept_all: i64,
    pub unknown: i64,
}

#[derive(Object)]
pub struct SingleVerificationDto {
    pub email: String,
    pub result: VerdictKind,
    /// Raw provider payload.
    pub details: serde_json::Value,
}
