use crate::{
    application::{
        services::{credit::CreditDetails, verification::SingleVerification},
        usecases::users::UpdateUserRequest,
    },
    domain::models::{
        CreditAccount, CreditHistoryEntry, EmailList, ListCounts, TimezonePreference, User,
        VerificationStats,
    },
    presentation::http::{
        requests::UpdateUserRequestDto,
        responses::{
            CreditAccountDto, CreditDetailsDto, CreditHistoryEntryDto, EmailListDto,
            ListCountsDto, PaginationDto, SingleVerificationDto, TimezoneDto, UserDto,
            VerificationStatsDto,
        },
    },
};

pub fn map_user(user: &User) -> UserDto {
    UserDto {
        id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        timezone: user.timezone.as_ref().map(map_timezone),
        created_at: user.created_at.to_rfc3339(),
        updated_at: user.updated_at.to_rfc3339(),
    }
}

pub fn map_timezone(timezone: &TimezonePreference) -> TimezoneDto {
    TimezoneDto {
        key: timezone.key.clone(),
        value: timezone.value.clone(),
    }
}

pub fn map_account(account: &CreditAccount) -> CreditAccountDto {
    CreditAccountDto {
        total_credits: account.total_credits,
        used_credits: account.used_credits,
        remaining_credits: account.remaining_credits,
        valid_till: account.valid_till.map(|t| t.to_rfc3339()),
    }
}

fn map_history_entry(entry: &CreditHistoryEntry) -> CreditHistoryEntryDto {
    CreditHistoryEntryDto {
        id: entry.id,
        amount: entry.amount,
        entry_type: entry.entry_type.into(),
        description: entry.description.clone(),
        status: entry.status.into(),
        created_at: entry.created_at.to_rfc3339(),
    }
}

pub fn map_credit_details(details: &CreditDetails) -> CreditDetailsDto {
    let page = &details.history;
    let per_page = u64::from(page.per_page.max(1));
    CreditDetailsDto {
        credits: map_account(&details.account),
        history: page.entries.iter().map(map_history_entry).collect(),
        pagination: PaginationDto {
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total.div_ceil(per_page),
        },
    }
}

fn map_counts(counts: &ListCounts) -> ListCountsDto {
    ListCountsDto {
        total: counts.total,
        verified: counts.verified,
        deliverable: counts.deliverable,
        undeliverable: counts.undeliverable,
        accept_all: counts.accept_all,
        unknown: counts.unknown,
    }
}

pub fn map_list(list: &EmailList) -> EmailListDto {
    EmailListDto {
        id: list.id,
        job_id: list.job_id.clone(),
        file_name: list.file_name.clone(),
        status: list.status.into(),
        counts: map_counts(&list.counts),
        created_at: list.created_at.to_rfc3339(),
        updated_at: list.updated_at.to_rfc3339(),
    }
}

pub fn map_stats(stats: &VerificationStats) -> VerificationStatsDto {
    VerificationStatsDto {
        total_emails: stats.total_emails,
        deliverable: stats.deliverable,
        undeliverable: stats.undeliverable,
        accept_all: stats.accept_all,
        unknown: stats.unknown,
    }
}

pub fn map_verification(result: SingleVerification) -> SingleVerificationDto {
    SingleVerificationDto {
        email: result.email,
        result: result.verdict.into(),
        details: result.details,
    }
}

impl From<UpdateUserRequestDto> for UpdateUserRequest {
    fn from(value: UpdateUserRequestDto) -> Self {
        Self {
            email: value.email,
            username: value.username,
            password: value.password,
        }
    }
}
