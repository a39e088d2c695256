use std::sync::Arc;

use poem_openapi::{
    OpenApi,
    param::{Path, Query},
    payload::{Attachment, AttachmentType, Json},
};
use uuid::Uuid;

use crate::{
    application::usecases::lists::UploadListRequest,
    presentation::{
        http::{
            endpoints::root::{ApiState, EndpointsTags},
            errors::{ApiError, ApiResult},
            mappers::{map_list, map_stats, map_verification},
            requests::{JobRequestDto, UploadListForm, VerifySingleRequestDto},
            responses::{
                EmailListDto, Envelope, PaginatedListsDto, SingleVerificationDto,
                VerificationStatsDto,
            },
            security::JwtAuth,
        },
        models::ListStatusKind,
    },
};

#[derive(Clone)]
pub struct ListsEndpoints {
    state: Arc<ApiState>,
}

impl ListsEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl ListsEndpoints {
    /// Uploads a CSV list. The list stays PENDING until verification is started.
    #[oai(path = "/lists", method = "post", tag = EndpointsTags::Lists)]
    pub async fn upload_list(
        &self,
        auth: JwtAuth,
        form: UploadListForm,
    ) -> ApiResult<Json<Envelope<EmailListDto>>> {
        let user = auth.into_user(&self.state).await?;
        let file_name = form.file.file_name().unwrap_or_default().to_string();
        let content_type = form.file.content_type().map(str::to_string);
        let content = form
            .file
            .into_vec()
            .await
            .map_err(|_| ApiError::bad_request("unable to read uploaded file"))?;

        let list = self
            .state
            .lists_usecase
            .upload(UploadListRequest {
                user_id: user.user_id,
                file_name,
                content_type,
                content,
            })
            .await?;
        Ok(Envelope::success("List uploaded successfully", map_list(&list)))
    }

    #[oai(path = "/lists", method = "get", tag = EndpointsTags::Lists)]
    pub async fn list_lists(
        &self,
        auth: JwtAuth,
        status: Query<Option<ListStatusKind>>,
        limit: Query<Option<u32>>,
        offset: Query<Option<u32>>,
    ) -> ApiResult<Json<Envelope<PaginatedListsDto>>> {
        let user = auth.into_user(&self.state).await?;
        let page = self
            .state
            .lists_usecase
            .list(user.user_id, status.0.map(Into::into), limit.0, offset.0)
            .await?;
        Ok(Envelope::success(
            "Lists fetched successfully",
            PaginatedListsDto {
                lists: page.lists.iter().map(map_list).collect(),
                has_more: page.has_more,
                next_offset: page.next_offset,
            },
        ))
    }

    #[oai(path = "/lists/stats", method = "get", tag = EndpointsTags::Lists)]
    pub async fn stats(&self, auth: JwtAuth) -> ApiResult<Json<Envelope<VerificationStatsDto>>> {
        let user = auth.into_user(&self.state).await?;
        let stats = self.state.lists_usecase.stats(user.user_id).await?;
        Ok(Envelope::success("Stats fetched successfully", map_stats(&stats)))
    }

    #[oai(path = "/lists/:list_id", method = "get", tag = EndpointsTags::Lists)]
    pub async fn get_list(
        &self,
        auth: JwtAuth,
        list_id: Path<Uuid>,
    ) -> ApiResult<Json<Envelope<EmailListDto>>> {
        let user = auth.into_user(&self.state).await?;
        let list = self.state.lists_usecase.get(user.user_id, list_id.0).await?;
        Ok(Envelope::success("List fetched successfully", map_list(&list)))
    }

    #[oai(path = "/lists", method = "delete", tag = EndpointsTags::Lists)]
    pub async fn delete_list(
        &self,
        auth: JwtAuth,
        request: Json<JobRequestDto>,
    ) -> ApiResult<Json<Envelope<EmailListDto>>> {
        let user = auth.into_user(&self.state).await?;
        // A failed delete leaves the list stored, so its watcher must keep running.
        let list = self
            .state
            .lists_usecase
            .delete(user.user_id, &request.job_id)
            .await?;
        self.state.job_poller.cancel(&list.id).await;
        Ok(Envelope::success("List deleted successfully", map_list(&list)))
    }

    #[oai(path = "/lists/validate-single", method = "post", tag = EndpointsTags::Lists)]
    pub async fn validate_single(
        &self,
        auth: JwtAuth,
        request: Json<VerifySingleRequestDto>,
    ) -> ApiResult<Json<Envelope<SingleVerificationDto>>> {
        let user = auth.into_user(&self.state).await?;
        let result = self
            .state
            .verify_single_usecase
            .execute(user.user_id, &request.email)
            .await?;
        Ok(Envelope::success(
            "Email verified successfully",
            map_verification(result),
        ))
    }

    /// Starts the provider job and hands the list to the background poller.
    #[oai(path = "/lists/validate-bulk", method = "post", tag = EndpointsTags::Lists)]
    pub async fn validate_bulk(
        &self,
        auth: JwtAuth,
        request: Json<JobRequestDto>,
    ) -> ApiResult<Json<Envelope<EmailListDto>>> {
        let user = auth.into_user(&self.state).await?;
        let list = self
            .state
            .lists_usecase
            .start_verification(user.user_id, &request.job_id)
            .await?;
        self.state.job_poller.watch(&list).await;
        Ok(Envelope::success(
            "Bulk verification started successfully",
            map_list(&list),
        ))
    }

    #[oai(path = "/lists/get-status", method = "get", tag = EndpointsTags::Lists)]
    pub async fn get_status(
        &self,
        auth: JwtAuth,
        job_id: Query<String>,
    ) -> ApiResult<Json<Envelope<EmailListDto>>> {
        let user = auth.into_user(&self.state).await?;
        let list = self
            .state
            .lists_usecase
            .refresh_status(user.user_id, &job_id.0)
            .await?;
        Ok(Envelope::success("Status fetched successfully", map_list(&list)))
    }

    #[oai(path = "/lists/download/:job_id", method = "get", tag = EndpointsTags::Lists)]
    pub async fn download(
        &self,
        auth: JwtAuth,
        job_id: Path<String>,
    ) -> ApiResult<Attachment<Vec<u8>>> {
        let user = auth.into_user(&self.state).await?;
        let file = self
            .state
            .lists_usecase
            .download(user.user_id, &job_id.0)
            .await?;
        Ok(Attachment::new(file.content)
            .attachment_type(AttachmentType::Attachment)
            .filename(file.file_name))
    }
}
