use std::sync::Arc;

use poem_openapi::{OpenApi, param::Path, payload::Json};

use crate::{
    application::services::timezones,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        errors::ApiResult,
        mappers::{map_timezone, map_user},
        requests::SaveTimezoneRequestDto,
        responses::{Envelope, TimezoneDto, UserDto},
        security::JwtAuth,
    },
};

#[derive(Clone)]
pub struct TimezonesEndpoints {
    state: Arc<ApiState>,
}

impl TimezonesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }

    async fn save(&self, auth: JwtAuth, timezone: &str) -> ApiResult<Json<Envelope<UserDto>>> {
        let user = auth.into_user(&self.state).await?;
        let user = self
            .state
            .users_usecase
            .save_timezone(user.user_id, timezone)
            .await?;
        Ok(Envelope::success("Timezone saved successfully", map_user(&user)))
    }
}

#[OpenApi]
impl TimezonesEndpoints {
    /// Every IANA zone with its current GMT offset.
    #[oai(path = "/time-zone/country", method = "get", tag = EndpointsTags::Timezones)]
    pub async fn list_timezones(
        &self,
        auth: JwtAuth,
    ) -> ApiResult<Json<Envelope<Vec<TimezoneDto>>>> {
        auth.into_user(&self.state).await?;
        let zones = timezones::all_timezones();
        Ok(Envelope::success(
            "Timezones fetched successfully",
            zones.iter().map(map_timezone).collect(),
        ))
    }

    #[oai(path = "/time-zone/save", method = "post", tag = EndpointsTags::Timezones)]
    pub async fn save_timezone(
        &self,
        auth: JwtAuth,
        request: Json<SaveTimezoneRequestDto>,
    ) -> ApiResult<Json<Envelope<UserDto>>> {
        self.save(auth, &request.0.timezone).await
    }

    /// Same as `/time-zone/save`; `%2F` may stand in for `/` in the zone name.
    #[oai(path = "/users/time-zone/:time_zone", method = "get", tag = EndpointsTags::Timezones)]
    pub async fn save_timezone_by_path(
        &self,
        auth: JwtAuth,
        time_zone: Path<String>,
    ) -> ApiResult<Json<Envelope<UserDto>>> {
        self.save(auth, &time_zone.0).await
    }
}
