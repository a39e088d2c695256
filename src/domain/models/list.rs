use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListStatus::Pending => "PENDING",
            ListStatus::Processing => "PROCESSING",
            ListStatus::Completed => "COMPLETED",
            ListStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(ListStatus::Pending),
            "PROCESSING" => Some(ListStatus::Processing),
            "COMPLETED" => Some(ListStatus::Completed),
            "FAILED" => Some(ListStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ListStatus::Completed | ListStatus::Failed)
    }

    /// PENDING -> PROCESSING -> COMPLETED | FAILED, nothing else.
    pub fn can_transition_to(&self, next: ListStatus) -> bool {
        matches!(
            (self, next),
            (ListStatus::Pending, ListStatus::Processing)
                | (ListStatus::Processing, ListStatus::Completed)
                | (ListStatus::Processing, ListStatus::Failed)
        )
    }

    pub fn ensure_transition(&self, next: ListStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for ListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListCounts {
    pub total: i64,
    pub verified: i64,
    pub deliverable: i64,
    pub undeliverable: i64,
    pub accept_all: i64,
    pub unknown: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailList {
    pub id: Uuid,
    pub uploaded_by: Uuid,
    pub job_id: Option<String>,
    pub file_name: String,
    pub status: ListStatus,
    pub counts: ListCounts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailList {
    pub fn new(uploaded_by: Uuid, file_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            uploaded_by,
            job_id: None,
            file_name: file_name.into(),
            status: ListStatus::Pending,
            counts: ListCounts::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-user totals summed over every stored list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationStats {
    pub total_emails: i64,
    pub deliverable: i64,
    pub undeliverable: i64,
    pub accept_all: i64,
    pub unknown: i64,
}

impl VerificationStats {
    pub fn from_lists<'a>(lists: impl IntoIterator<Item = &'a EmailList>) -> Self {
        lists.into_iter().fold(Self::default(), |acc, list| Self {
            total_emails: acc.total_emails + list.counts.total,
            deliverable: acc.deliverable + list.counts.deliverable,
            undeliverable: acc.undeliverable + list.counts.undeliverable,
            accept_all: acc.accept_all + list.counts.accept_all,
            unknown: acc.unknown + list.counts.unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ListStatus; 4] = [
        ListStatus::Pending,
        ListStatus::Processing,
        ListStatus::Completed,
        ListStatus::Failed,
    ];

    #[test]
    fn only_forward_transitions_are_allowed() {
        let allowed: Vec<(ListStatus, ListStatus)> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (ListStatus::Pending, ListStatus::Processing),
                (ListStatus::Processing, ListStatus::Completed),
                (ListStatus::Processing, ListStatus::Failed),
            ]
        );
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for to in ALL {
            assert!(ListStatus::Completed.ensure_transition(to).is_err());
            assert!(ListStatus::Failed.ensure_transition(to).is_err());
        }
    }

    #[test]
    fn new_list_is_pending_with_zeroed_counts() {
        let list = EmailList::new(Uuid::new_v4(), "leads.csv");
        assert_eq!(list.status, ListStatus::Pending);
        assert_eq!(list.counts, ListCounts::default());
        assert!(list.job_id.is_none());
    }

    #[test]
    fn status_round_trips_through_storage_label() {
        for status in ALL {
            assert_eq!(ListStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ListStatus::from_str("pending"), None);
    }

    #[test]
    fn stats_sum_every_list() {
        let owner = Uuid::new_v4();
        let mut first = EmailList::new(owner, "a.csv");
        first.counts = ListCounts {
            total: 10,
            verified: 10,
            deliverable: 6,
            undeliverable: 2,
            accept_all: 1,
            unknown: 1,
        };
        let mut second = EmailList::new(owner, "b.csv");
        second.counts.total = 5;
        second.counts.deliverable = 5;

        let stats = VerificationStats::from_lists([&first, &second]);
        assert_eq!(
            stats,
            VerificationStats {
                total_emails: 15,
                deliverable: 11,
                undeliverable: 2,
                accept_all: 1,
                unknown: 1,
            }
        );
    }
}
