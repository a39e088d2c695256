use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{
    models::{
        CreditAccount, CreditEntryStatus, CreditEntryType, CreditHistoryEntry,
        CreditHistoryFilter, CreditHistoryPage, CreditHistoryQuery, EmailList, ListCounts,
        ListStatus, TimezonePreference, User, VerificationStats,
    },
    repositories::{CreditChange, CreditRepository, DeductOutcome, ListRepository, UserRepository},
};

pub type PgPool = Pool<Postgres>;

const USER_COLUMNS: &str = "id, email, username, password_hash, timezone_key, timezone_value, created_at, updated_at";
const CREDIT_COLUMNS: &str =
    "user_id, total_credits, used_credits, remaining_credits, valid_till, created_at, updated_at";
const LIST_COLUMNS: &str = "id, uploaded_by, job_id, file_name, status, total_count, verified_count, deliverable_count, undeliverable_count, accept_all_count, unknown_count, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(User::from))
    }

    async fn get(&self, id: &Uuid) -> anyhow::Result<Option<User>> {
        let record =
            sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record.map(User::from))
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn upsert(&self, user: &User) -> anyhow::Result<()> {
        let (timezone_key, timezone_value) = match &user.timezone {
            Some(tz) => (Some(tz.key.as_str()), Some(tz.value.as_str())),
            None => (None, None),
        };
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, username, password_hash, timezone_key, timezone_value, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                username = EXCLUDED.username,
                password_hash = EXCLUDED.password_hash,
                timezone_key = EXCLUDED.timezone_key,
                timezone_value = EXCLUDED.timezone_value,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(timezone_key)
        .bind(timezone_value)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> anyhow::Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(User::from))
    }
}

#[derive(Clone)]
pub struct PostgresCreditRepository {
    pool: PgPool,
}

impl PostgresCreditRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl CreditRepository for PostgresCreditRepository {
    async fn find(&self, user_id: &Uuid) -> anyhow::Result<Option<CreditAccount>> {
        let record = sqlx::query_as::<_, CreditRecord>(&format!(
            "SELECT {CREDIT_COLUMNS} FROM credits WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(CreditAccount::from))
    }

    async fn create_if_absent(&self, user_id: &Uuid) -> anyhow::Result<CreditAccount> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO credits (user_id, total_credits, used_credits, remaining_credits, created_at, updated_at)
            VALUES ($1, 0, 0, 0, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("credit record for {user_id} vanished after insert"))
    }

    async fn deduct(&self, change: CreditChange) -> anyhow::Result<DeductOutcome> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, CreditRecord>(&format!(
            "SELECT {CREDIT_COLUMNS} FROM credits WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(change.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(record) = record else {
            return Ok(DeductOutcome::Missing);
        };
        let mut account = CreditAccount::from(record);
        let remaining = account.remaining_credits;
        if account.debit(change.amount).is_err() {
            return Ok(DeductOutcome::Insufficient { remaining });
        }

        write_balance(&mut tx, &account).await?;
        insert_history(&mut tx, &change, CreditEntryType::Deduction).await?;
        tx.commit().await?;

        Ok(DeductOutcome::Applied(account))
    }

    async fn add(&self, change: CreditChange) -> anyhow::Result<CreditAccount> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO credits (user_id, total_credits, used_credits, remaining_credits, created_at, updated_at)
            VALUES ($1, 0, 0, 0, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(change.user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let record = sqlx::query_as::<_, CreditRecord>(&format!(
            "SELECT {CREDIT_COLUMNS} FROM credits WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(change.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut account = CreditAccount::from(record);
        account.credit(change.amount, change.valid_till)?;

        write_balance(&mut tx, &account).await?;
        insert_history(&mut tx, &change, CreditEntryType::Addition).await?;
        tx.commit().await?;

        Ok(account)
    }

    async fn history(
        &self,
        user_id: &Uuid,
        query: &CreditHistoryQuery,
    ) -> anyhow::Result<CreditHistoryPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM credit_history");
        push_history_filters(&mut count, user_id, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT id, user_id, amount, entry_type, description, status, created_at FROM credit_history",
        );
        push_history_filters(&mut select, user_id, query);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.skip()));

        let rows = select
            .build_query_as::<CreditHistoryRecord>()
            .fetch_all(&self.pool)
            .await?;
        let entries = rows
            .into_iter()
            .map(CreditHistoryEntry::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(CreditHistoryPage {
            entries,
            total: total.max(0) as u64,
            page: query.page,
            per_page: query.limit,
        })
    }
}

async fn write_balance(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    account: &CreditAccount,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE credits
        SET total_credits = $2,
            used_credits = $3,
            remaining_credits = $4,
            valid_till = $5,
            updated_at = $6
        WHERE user_id = $1
        "#,
    )
    .bind(account.user_id)
    .bind(account.total_credits)
    .bind(account.used_credits)
    .bind(account.remaining_credits)
    .bind(account.valid_till)
    .bind(account.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_history(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    change: &CreditChange,
    entry_type: CreditEntryType,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO credit_history (id, user_id, amount, entry_type, description, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(change.user_id)
    .bind(change.amount)
    .bind(entry_type.as_str())
    .bind(&change.description)
    .bind(change.status.as_str())
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn push_history_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    user_id: &Uuid,
    query: &CreditHistoryQuery,
) {
    builder.push(" WHERE user_id = ").push_bind(*user_id);

    match query.filter {
        CreditHistoryFilter::All => {}
        CreditHistoryFilter::Addition => {
            builder
                .push(" AND entry_type = ")
                .push_bind(CreditEntryType::Addition.as_str());
        }
        CreditHistoryFilter::Deduction => {
            builder
                .push(" AND entry_type = ")
                .push_bind(CreditEntryType::Deduction.as_str());
        }
        CreditHistoryFilter::Email => {
            builder
                .push(" AND status = ")
                .push_bind(CreditEntryStatus::VerifiedEmail.as_str());
        }
        CreditHistoryFilter::List => {
            builder
                .push(" AND status = ")
                .push_bind(CreditEntryStatus::VerifiedList.as_str());
        }
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        builder
            .push(" AND description ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)))
            .push(" ESCAPE '\\'");
    }
    if let Some(from) = query.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Clone)]
pub struct PostgresListRepository {
    pool: PgPool,
}

impl PostgresListRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl ListRepository for PostgresListRepository {
    async fn insert(&self, list: &EmailList) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO email_lists (
                id, uploaded_by, job_id, file_name, status,
                total_count, verified_count, deliverable_count, undeliverable_count,
                accept_all_count, unknown_count, created_at, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            "#,
        )
        .bind(list.id)
        .bind(list.uploaded_by)
        .bind(&list.job_id)
        .bind(&list.file_name)
        .bind(list.status.as_str())
        .bind(list.counts.total)
        .bind(list.counts.verified)
        .bind(list.counts.deliverable)
        .bind(list.counts.undeliverable)
        .bind(list.counts.accept_all)
        .bind(list.counts.unknown)
        .bind(list.created_at)
        .bind(list.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, list_id: &Uuid) -> anyhow::Result<Option<EmailList>> {
        let record = sqlx::query_as::<_, ListRecord>(&format!(
            "SELECT {LIST_COLUMNS} FROM email_lists WHERE id = $1"
        ))
        .bind(list_id)
        .fetch_optional(&self.pool)
        .await?;
        record.map(EmailList::try_from).transpose()
    }

    async fn find_by_job(
        &self,
        user_id: &Uuid,
        job_id: &str,
    ) -> anyhow::Result<Option<EmailList>> {
        let record = sqlx::query_as::<_, ListRecord>(&format!(
            "SELECT {LIST_COLUMNS} FROM email_lists WHERE uploaded_by = $1 AND job_id = $2"
        ))
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        record.map(EmailList::try_from).transpose()
    }

    async fn attach_job(&self, list_id: &Uuid, job_id: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE email_lists SET job_id = $2, updated_at = $3 WHERE id = $1")
            .bind(list_id)
            .bind(job_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_counts(&self, list_id: &Uuid, counts: ListCounts) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE email_lists
            SET total_count = $2,
                verified_count = $3,
                deliverable_count = $4,
                undeliverable_count = $5,
                accept_all_count = $6,
                unknown_count = $7,
                updated_at = $8
            WHERE id = $1
              AND status NOT IN ('COMPLETED', 'FAILED')
            "#,
        )
        .bind(list_id)
        .bind(counts.total)
        .bind(counts.verified)
        .bind(counts.deliverable)
        .bind(counts.undeliverable)
        .bind(counts.accept_all)
        .bind(counts.unknown)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn transition(
        &self,
        list_id: &Uuid,
        from: ListStatus,
        to: ListStatus,
        counts: ListCounts,
    ) -> anyhow::Result<Option<EmailList>> {
        from.ensure_transition(to)?;
        let record = sqlx::query_as::<_, ListRecord>(&format!(
            r#"
            UPDATE email_lists
            SET status = $3,
                total_count = $4,
                verified_count = $5,
                deliverable_count = $6,
                undeliverable_count = $7,
                accept_all_count = $8,
                unknown_count = $9,
                updated_at = $10
            WHERE id = $1
              AND status = $2
            RETURNING {LIST_COLUMNS}
            "#
        ))
        .bind(list_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(counts.total)
        .bind(counts.verified)
        .bind(counts.deliverable)
        .bind(counts.undeliverable)
        .bind(counts.accept_all)
        .bind(counts.unknown)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        record.map(EmailList::try_from).transpose()
    }

    async fn release_start(&self, list_id: &Uuid, counts: ListCounts) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE email_lists
            SET status = 'PENDING',
                total_count = $2,
                verified_count = $3,
                deliverable_count = $4,
                undeliverable_count = $5,
                accept_all_count = $6,
                unknown_count = $7,
                updated_at = $8
            WHERE id = $1
              AND status = 'PROCESSING'
            "#,
        )
        .bind(list_id)
        .bind(counts.total)
        .bind(counts.verified)
        .bind(counts.deliverable)
        .bind(counts.undeliverable)
        .bind(counts.accept_all)
        .bind(counts.unknown)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_user(
        &self,
        user_id: &Uuid,
        status: Option<ListStatus>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> anyhow::Result<(Vec<EmailList>, bool)> {
        let limit = i64::from(limit.unwrap_or(50).min(200));
        let offset = i64::from(offset.unwrap_or(0));

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {LIST_COLUMNS} FROM email_lists WHERE uploaded_by = "
        ));
        select.push_bind(*user_id);
        if let Some(status) = status {
            select.push(" AND status = ").push_bind(status.as_str());
        }
        // Get one extra to check if there are more
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit + 1)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select
            .build_query_as::<ListRecord>()
            .fetch_all(&self.pool)
            .await?;

        let has_more = rows.len() as i64 > limit;
        let lists = rows
            .into_iter()
            .take(limit as usize)
            .map(EmailList::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok((lists, has_more))
    }

    async fn list_by_status(&self, status: ListStatus) -> anyhow::Result<Vec<EmailList>> {
        let rows = sqlx::query_as::<_, ListRecord>(&format!(
            "SELECT {LIST_COLUMNS} FROM email_lists WHERE status = $1 ORDER BY created_at"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(EmailList::try_from).collect()
    }

    async fn delete(&self, list_id: &Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM email_lists WHERE id = $1")
            .bind(list_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn calculate_stats(&self, user_id: &Uuid) -> anyhow::Result<VerificationStats> {
        let record = sqlx::query_as::<_, StatsRecord>(
            r#"
            SELECT
                COALESCE(SUM(total_count), 0)::BIGINT AS total_emails,
                COALESCE(SUM(deliverable_count), 0)::BIGINT AS deliverable,
                COALESCE(SUM(undeliverable_count), 0)::BIGINT AS undeliverable,
                COALESCE(SUM(accept_all_count), 0)::BIGINT AS accept_all,
                COALESCE(SUM(unknown_count), 0)::BIGINT AS unknown
            FROM email_lists
            WHERE uploaded_by = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(VerificationStats {
            total_emails: record.total_emails,
            deliverable: record.deliverable,
            undeliverable: record.undeliverable,
            accept_all: record.accept_all,
            unknown: record.unknown,
        })
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    username: Option<String>,
    password_hash: String,
    timezone_key: Option<String>,
    timezone_value: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(value: UserRecord) -> Self {
        let timezone = match (value.timezone_key, value.timezone_value) {
            (Some(key), Some(value)) => Some(TimezonePreference { key, value }),
            _ => None,
        };
        Self {
            id: value.id,
            email: value.email,
            username: value.username,
            password_hash: value.password_hash,
            timezone,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CreditRecord {
    user_id: Uuid,
    total_credits: i64,
    used_credits: i64,
    remaining_credits: i64,
    valid_till: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CreditRecord> for CreditAccount {
    fn from(value: CreditRecord) -> Self {
        Self {
            user_id: value.user_id,
            total_credits: value.total_credits,
            used_credits: value.used_credits,
            remaining_credits: value.remaining_credits,
            valid_till: value.valid_till,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CreditHistoryRecord {
    id: Uuid,
    user_id: Uuid,
    amount: i64,
    entry_type: String,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CreditHistoryRecord> for CreditHistoryEntry {
    type Error = anyhow::Error;

    fn try_from(value: CreditHistoryRecord) -> Result<Self, Self::Error> {
        let entry_type = CreditEntryType::from_str(&value.entry_type)
            .ok_or_else(|| anyhow::anyhow!("unknown credit entry type {}", value.entry_type))?;
        let status = CreditEntryStatus::from_str(&value.status)
            .ok_or_else(|| anyhow::anyhow!("unknown credit entry status {}", value.status))?;
        Ok(Self {
            id: value.id,
            user_id: value.user_id,
            amount: value.amount,
            entry_type,
            description: value.description,
            status,
            created_at: value.created_at,
        })
    }
}

#[derive(FromRow)]
struct ListRecord {
    id: Uuid,
    uploaded_by: Uuid,
    job_id: Option<String>,
    file_name: String,
    status: String,
    total_count: i64,
    verified_count: i64,
    deliverable_count: i64,
    undeliverable_count: i64,
    accept_all_count: i64,
    unknown_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListRecord> for EmailList {
    type Error = anyhow::Error;

    fn try_from(value: ListRecord) -> Result<Self, Self::Error> {
        let status = ListStatus::from_str(&value.status)
            .ok_or_else(|| anyhow::anyhow!("unknown list status {}", value.status))?;
        Ok(Self {
            id: value.id,
            uploaded_by: value.uploaded_by,
            job_id: value.job_id,
            file_name: value.file_name,
            status,
            counts: ListCounts {
                total: value.total_count,
                verified: value.verified_count,
                deliverable: value.deliverable_count,
                undeliverable: value.undeliverable_count,
                accept_all: value.accept_all_count,
                unknown: value.unknown_count,
            },
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(FromRow)]
struct StatsRecord {
    total_emails: i64,
    deliverable: i64,
    undeliverable: i64,
    accept_all: i64,
    unknown: i64,
}
