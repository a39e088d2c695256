use poem_openapi::Enum;

use crate::{
    application::services::verification::EmailVerdict,
    domain::models::{CreditEntryStatus, CreditEntryType, ListStatus},
};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[oai(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListStatusKind {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<ListStatusKind> for ListStatus {
    fn from(value: ListStatusKind) -> Self {
        match value {
            ListStatusKind::Pending => ListStatus::Pending,
            ListStatusKind::Processing => ListStatus::Processing,
            ListStatusKind::Completed => ListStatus::Completed,
            ListStatusKind::Failed => ListStatus::Failed,
        }
    }
}

impl From<ListStatus> for ListStatusKind {
    fn from(value: ListStatus) -> Self {
        match value {
            ListStatus::Pending => ListStatusKind::Pending,
            ListStatus::Processing => ListStatusKind::Processing,
            ListStatus::Completed => ListStatusKind::Completed,
            ListStatus::Failed => ListStatusKind::Failed,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[oai(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditEntryKind {
    Addition,
    Deduction,
}

impl From<CreditEntryType> for CreditEntryKind {
    fn from(value: CreditEntryType) -> Self {
        match value {
            CreditEntryType::Addition => CreditEntryKind::Addition,
            CreditEntryType::Deduction => CreditEntryKind::Deduction,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[oai(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditEntryStatusKind {
    VerifiedEmail,
    VerifiedList,
    Allocated,
}

impl From<CreditEntryStatus> for CreditEntryStatusKind {
    fn from(value: CreditEntryStatus) -> Self {
        match value {
            CreditEntryStatus::VerifiedEmail => CreditEntryStatusKind::VerifiedEmail,
            CreditEntryStatus::VerifiedList => CreditEntryStatusKind::VerifiedList,
            CreditEntryStatus::Allocated => CreditEntryStatusKind::Allocated,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[oai(rename_all = "snake_case")]
pub enum VerdictKind {
    Deliverable,
    Undeliverable,
    AcceptAll,
    Unknown,
}

impl From<EmailVerdict> for VerdictKind {
    fn from(value: EmailVerdict) -> Self {
        match value {
            EmailVerdict::Deliverable => VerdictKind::Deliverable,
            EmailVerdict::Undeliverable => VerdictKind::Undeliverable,
            EmailVerdict::AcceptAll => VerdictKind::AcceptAll,
            EmailVerdict::Unknown => VerdictKind::Unknown,
        }
    }
}
