use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    application::services::{credit::CreditService, verification::VerificationProvider},
    domain::{
        errors::{DomainError, DomainResult},
        models::{CreditEntryStatus, EmailList, ListCounts, ListStatus, VerificationStats},
        repositories::ListRepository,
    },
};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub struct UploadListRequest {
    pub user_id: Uuid,
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

pub struct ListPage {
    pub lists: Vec<EmailList>,
    pub has_more: bool,
    pub next_offset: Option<u32>,
}

pub struct DownloadedList {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// List registry operations backed by the bulk verification provider.
pub struct ListsUseCase {
    list_repo: Arc<dyn ListRepository>,
    provider: Arc<dyn VerificationProvider>,
    credits: Arc<CreditService>,
}

impl ListsUseCase {
    pub fn new(
        list_repo: Arc<dyn ListRepository>,
        provider: Arc<dyn VerificationProvider>,
        credits: Arc<CreditService>,
    ) -> Self {
        Self {
            list_repo,
            provider,
            credits,
        }
    }

    /// Records the list as PENDING before the provider sees it, then attaches
    /// the provider job id. A failed upload removes the record again.
    pub async fn upload(&self, request: UploadListRequest) -> DomainResult<EmailList> {
        validate_upload(&request)?;

        let mut list = EmailList::new(request.user_id, request.file_name.trim());
        self.list_repo.insert(&list).await?;

        let job = match self
            .provider
            .upload_file(&list.file_name, request.content)
            .await
        {
            Ok(job) => job,
            Err(err) => {
                warn!(list_id = %list.id, error = %err, "provider rejected upload");
                self.list_repo.delete(&list.id).await?;
                return Err(err.into());
            }
        };

        self.list_repo.attach_job(&list.id, &job.job_id).await?;
        list.job_id = Some(job.job_id);
        info!(list_id = %list.id, job_id = ?list.job_id, "list uploaded");
        Ok(list)
    }

    /// Claims the list (PENDING -> PROCESSING) before asking the provider to
    /// start, so concurrent callers cannot start the same job twice. A refused
    /// start puts the list back to PENDING.
    pub async fn start_verification(&self, user_id: Uuid, job_id: &str) -> DomainResult<EmailList> {
        let list = self.owned_by_job(user_id, job_id).await?;
        list.status.ensure_transition(ListStatus::Processing)?;
        let job_id = stored_job_id(&list)?;

        let status = self.provider.get_bulk_status(&job_id).await?;
        let total = status.counts.total.max(list.counts.total);
        self.credits.ensure_enough_credits(user_id, total).await?;

        let counts = ListCounts {
            total,
            ..ListCounts::default()
        };
        let started = self
            .list_repo
            .transition(&list.id, ListStatus::Pending, ListStatus::Processing, counts)
            .await?
            .ok_or_else(|| DomainError::InvalidTransition {
                from: ListStatus::Pending.to_string(),
                to: ListStatus::Processing.to_string(),
            })?;

        if let Err(err) = self.provider.start_bulk_verification(&job_id).await {
            warn!(list_id = %list.id, job_id = %job_id, error = %err, "provider refused to start job");
            self.list_repo.release_start(&list.id, list.counts).await?;
            return Err(err.into());
        }

        info!(list_id = %started.id, job_id = %job_id, total, "bulk verification started");
        Ok(started)
    }

    pub async fn refresh_status(&self, user_id: Uuid, job_id: &str) -> DomainResult<EmailList> {
        let list = self.owned_by_job(user_id, job_id).await?;
        self.refresh(list).await
    }

    /// Terminal lists are returned as stored; the provider is only asked about
    /// lists still PROCESSING.
    pub async fn refresh(&self, list: EmailList) -> DomainResult<EmailList> {
        match list.status {
            ListStatus::Pending => Err(DomainError::Validation(
                "verification has not been started for this list".to_string(),
            )),
            ListStatus::Completed | ListStatus::Failed => Ok(list),
            ListStatus::Processing => self.poll_provider(list).await,
        }
    }

    async fn poll_provider(&self, mut list: EmailList) -> DomainResult<EmailList> {
        let job_id = stored_job_id(&list)?;
        let status = self.provider.get_bulk_status(&job_id).await?;
        let next = status.list_status();
        let mut counts = status.counts;
        if counts.total == 0 {
            counts.total = list.counts.total;
        }

        if next == ListStatus::Processing {
            if self.list_repo.update_counts(&list.id, counts).await? {
                list.counts = counts;
                return Ok(list);
            }
            return self.reload(&list.id).await;
        }

        match self
            .list_repo
            .transition(&list.id, ListStatus::Processing, next, counts)
            .await?
        {
            Some(updated) => {
                info!(list_id = %updated.id, status = %updated.status, "bulk verification finished");
                if updated.status == ListStatus::Completed {
                    self.charge(&updated).await;
                }
                Ok(updated)
            }
            // Someone else finished it first; report what they stored.
            None => self.reload(&list.id).await,
        }
    }

    async fn reload(&self, list_id: &Uuid) -> DomainResult<EmailList> {
        self.list_repo
            .get(list_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("list".to_string()))
    }

    async fn charge(&self, list: &EmailList) {
        let amount = list.counts.total;
        if amount <= 0 {
            return;
        }
        if let Err(err) = self
            .credits
            .deduct_credits(
                list.uploaded_by,
                amount,
                format!("Bulk verification of {}", list.file_name),
                CreditEntryStatus::VerifiedList,
            )
            .await
        {
            error!(list_id = %list.id, amount, error = %err, "failed to charge completed list");
        }
    }

    pub async fn delete(&self, user_id: Uuid, job_id: &str) -> DomainResult<EmailList> {
        let list = self.owned_by_job(user_id, job_id).await?;
        let job_id = stored_job_id(&list)?;

        if let Err(err) = self.provider.remove_bulk_email_list(&job_id).await {
            if err.status != Some(404) {
                return Err(err.into());
            }
            warn!(list_id = %list.id, job_id = %job_id, "provider job already gone");
        }
        self.list_repo.delete(&list.id).await?;

        info!(list_id = %list.id, job_id = %job_id, "list deleted");
        Ok(list)
    }

    pub async fn download(&self, user_id: Uuid, job_id: &str) -> DomainResult<DownloadedList> {
        let list = self.owned_by_job(user_id, job_id).await?;
        if list.status != ListStatus::Completed {
            return Err(DomainError::Validation(
                "list verification is not completed".to_string(),
            ));
        }
        let job_id = stored_job_id(&list)?;
        let content = self.provider.download_bulk_email_list(&job_id).await?;
        Ok(DownloadedList {
            file_name: format!("verified_{}", list.file_name),
            content,
        })
    }

    pub async fn get(&self, user_id: Uuid, list_id: Uuid) -> DomainResult<EmailList> {
        self.list_repo
            .get(&list_id)
            .await?
            .filter(|list| list.uploaded_by == user_id)
            .ok_or_else(|| DomainError::NotFound("list".to_string()))
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        status: Option<ListStatus>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> DomainResult<ListPage> {
        let (lists, has_more) = self
            .list_repo
            .list_by_user(&user_id, status, limit, offset)
            .await?;
        let next_offset = has_more.then(|| offset.unwrap_or(0) + lists.len() as u32);
        Ok(ListPage {
            lists,
            has_more,
            next_offset,
        })
    }

    pub async fn stats(&self, user_id: Uuid) -> DomainResult<VerificationStats> {
        Ok(self.list_repo.calculate_stats(&user_id).await?)
    }

    pub async fn processing(&self) -> DomainResult<Vec<EmailList>> {
        Ok(self.list_repo.list_by_status(ListStatus::Processing).await?)
    }

    async fn owned_by_job(&self, user_id: Uuid, job_id: &str) -> DomainResult<EmailList> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(DomainError::Validation("job id is required".to_string()));
        }
        self.list_repo
            .find_by_job(&user_id, job_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("list".to_string()))
    }
}

fn validate_upload(request: &UploadListRequest) -> DomainResult<()> {
    let file_name = request.file_name.trim();
    if !file_name.to_ascii_lowercase().ends_with(".csv") {
        return Err(DomainError::Validation(
            "only CSV files are allowed".to_string(),
        ));
    }
    let is_csv = request.content_type.as_deref().is_some_and(|content_type| {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        essence.eq_ignore_ascii_case("text/csv")
    });
    if !is_csv {
        return Err(DomainError::Validation("invalid file type".to_string()));
    }
    if request.content.len() > MAX_UPLOAD_BYTES {
        return Err(DomainError::Validation(
            "file exceeds the 10 MB upload limit".to_string(),
        ));
    }
    if count_addresses(&request.content) == 0 {
        return Err(DomainError::Validation(
            "file contains no email addresses".to_string(),
        ));
    }
    Ok(())
}

/// Provider calls always use the id stored with the list, never the caller's
/// spelling of it.
fn stored_job_id(list: &EmailList) -> DomainResult<String> {
    list.job_id
        .clone()
        .ok_or_else(|| anyhow::anyhow!("list {} has no job id", list.id).into())
}

fn count_addresses(content: &[u8]) -> usize {
    String::from_utf8_lossy(content)
        .lines()
        .filter(|line| line.contains('@'))
        .count()
}
