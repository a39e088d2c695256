use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use poem_openapi::{OpenApi, param::Query, payload::Json};

use crate::{
    domain::models::{CreditEntryStatus, CreditHistoryFilter, CreditHistoryQuery},
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        errors::{ApiError, ApiResult},
        mappers::{map_account, map_credit_details},
        requests::AddCreditsRequestDto,
        responses::{CreditAccountDto, CreditDetailsDto, Envelope},
        security::JwtAuth,
    },
};

#[derive(Clone)]
pub struct CreditsEndpoints {
    state: Arc<ApiState>,
}

impl CreditsEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl CreditsEndpoints {
    /// Balance plus one page of history, newest first.
    #[allow(clippy::too_many_arguments)]
    #[oai(path = "/users/credit", method = "get", tag = EndpointsTags::Credits)]
    pub async fn get_credits(
        &self,
        auth: JwtAuth,
        filter: Query<Option<String>>,
        search: Query<Option<String>>,
        from: Query<Option<String>>,
        to: Query<Option<String>>,
        page: Query<Option<u32>>,
        limit: Query<Option<u32>>,
    ) -> ApiResult<Json<Envelope<CreditDetailsDto>>> {
        let user = auth.into_user(&self.state).await?;
        let defaults = CreditHistoryQuery::default();
        let query = CreditHistoryQuery {
            filter: filter
                .0
                .as_deref()
                .map(CreditHistoryFilter::parse)
                .unwrap_or_default(),
            search: search.0.filter(|s| !s.trim().is_empty()),
            from: from.0.as_deref().map(|v| parse_bound(v, false)).transpose()?,
            to: to.0.as_deref().map(|v| parse_bound(v, true)).transpose()?,
            page: page.0.unwrap_or(defaults.page),
            limit: limit.0.unwrap_or(defaults.limit),
        };

        let details = self
            .state
            .credit_service
            .get_credit_details(user.user_id, query)
            .await?;
        Ok(Envelope::success(
            "Credits fetched successfully",
            map_credit_details(&details),
        ))
    }

    #[oai(path = "/users/credit", method = "post", tag = EndpointsTags::Credits)]
    pub async fn add_credits(
        &self,
        auth: JwtAuth,
        request: Json<AddCreditsRequestDto>,
    ) -> ApiResult<Json<Envelope<CreditAccountDto>>> {
        let user = auth.into_user(&self.state).await?;
        let request = request.0;
        let valid_till = request
            .valid_till
            .as_deref()
            .map(|v| parse_bound(v, true))
            .transpose()?;

        let account = self
            .state
            .credit_service
            .add_credits(
                user.user_id,
                request.amount,
                request
                    .description
                    .unwrap_or_else(|| "Credits allocated".to_string()),
                CreditEntryStatus::Allocated,
                valid_till,
            )
            .await?;
        Ok(Envelope::success("Credits added successfully", map_account(&account)))
    }
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD`, which covers the whole day.
fn parse_bound(value: &str, end_of_day: bool) -> ApiResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("invalid date: {value}")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| ApiError::bad_request(format!("invalid date: {value}")))?;
    Ok(date.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_dates_span_the_whole_day() {
        let from = parse_bound("2025-03-01", false).unwrap();
        let to = parse_bound("2025-03-01", true).unwrap();
        assert_eq!(from.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert!(to > from);
        assert_eq!(to.date_naive(), from.date_naive());
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        let ts = parse_bound("2025-03-01T10:00:00+02:00", false).unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-03-01T08:00:00+00:00");
        assert!(parse_bound("yesterday", false).is_err());
    }
}
