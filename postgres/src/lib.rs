//! `PostgreSQL` appointment store for the imaging booking service.
//!
//! [`PostgresAppointmentStore`] implements
//! [`AppointmentStore`](imaging_booking_core::providers::AppointmentStore) on a
//! sqlx connection pool. Both uniqueness rules live in the schema (see
//! `migrations/`):
//!
//! - `appointments_order_id_key`, a unique constraint on `order_id`
//! - `appointments_active_slot_key`, a partial unique index on
//!   `(appointment_date, test_type)` for rows that are not cancelled
//!
//! so two concurrent bookings of the same slot cannot both commit, whatever
//! the application-level pre-checks saw.
//!
//! # Example
//!
//! ```no_run
//! use imaging_booking_postgres::{PoolSettings, PostgresAppointmentStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresAppointmentStore::connect(
//!     "postgres://localhost/imaging",
//!     &PoolSettings::default(),
//! )
//! .await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use imaging_booking_core::appointment::{
    Appointment, AppointmentId, AppointmentStatus, NewAppointment, PaymentStatus,
};
use imaging_booking_core::providers::{AppointmentStore, BoxFuture, StoreError};
use imaging_booking_core::query::{AppointmentFilter, AppointmentSort};
use imaging_booking_core::TestType;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::{Duration, Instant};
use uuid::Uuid;

const COLUMNS: &str = "id, name, email, phone, test_type, appointment_date, notes, amount, \
     order_id, payment_id, status, payment_status, created_at, updated_at";

/// Connection pool sizing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long a query waits for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// `PostgreSQL` implementation of [`AppointmentStore`].
#[derive(Clone, Debug)]
pub struct PostgresAppointmentStore {
    pool: PgPool,
}

impl PostgresAppointmentStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the first connection fails.
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = settings.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn exists(&self, id: AppointmentId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM appointments WHERE id = $1)")
            .bind(*id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    test_type: String,
    appointment_date: DateTime<Utc>,
    notes: Option<String>,
    amount: i32,
    order_id: String,
    payment_id: Option<String>,
    status: String,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = StoreError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let corrupt = |e: &dyn std::fmt::Display| {
            StoreError::Serialization(format!("appointment {}: {e}", row.id))
        };
        let test_type: TestType = row.test_type.parse().map_err(|e| corrupt(&e))?;
        let status: AppointmentStatus = row.status.parse().map_err(|e| corrupt(&e))?;
        let payment_status: PaymentStatus = row.payment_status.parse().map_err(|e| corrupt(&e))?;
        let amount = u32::try_from(row.amount).map_err(|e| corrupt(&e))?;

        Ok(Self {
            id: AppointmentId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            test_type,
            appointment_date: row.appointment_date,
            notes: row.notes,
            amount,
            order_id: row.order_id,
            payment_id: row.payment_id,
            status,
            payment_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Translate a sqlx error, surfacing unique violations by constraint name.
fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            };
        }
    }
    match error {
        sqlx::Error::PoolTimedOut => StoreError::Database("connection pool timed out".to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Serialization(error.to_string())
        },
        other => StoreError::Database(other.to_string()),
    }
}

/// Record duration and failures of a store call.
fn observe<T>(operation: &'static str, started: Instant, result: &Result<T, StoreError>) {
    metrics::histogram!("booking_store_query_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
    if let Err(error) = result {
        match error {
            StoreError::Duplicate { .. } | StoreError::NotFound | StoreError::StaleWrite => {
                tracing::debug!(operation, error = %error, "Store rejected write");
            },
            StoreError::Database(_) | StoreError::Serialization(_) => {
                tracing::error!(operation, error = %error, "Store operation failed");
                metrics::counter!("booking_store_errors_total", "operation" => operation).increment(1);
            },
        }
    }
}

// ============================================================================
// Query building
// ============================================================================

/// Escape `LIKE` metacharacters so search terms match literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append the `WHERE` clause equivalent to [`AppointmentFilter::matches`].
fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: &AppointmentFilter) {
    builder.push(" WHERE TRUE");

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if filter.active_only {
        builder
            .push(" AND status <> ")
            .push_bind(AppointmentStatus::Cancelled.as_str());
    }
    if let Some(test_type) = filter.test_type {
        builder.push(" AND test_type = ").push_bind(test_type.key());
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND appointment_date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND appointment_date <= ").push_bind(to);
    }
    if let Some(order_id) = &filter.order_id {
        builder.push(" AND order_id = ").push_bind(order_id.clone());
    }
    if let Some(term) = filter.normalized_search() {
        let pattern = format!("%{}%", escape_like(&term));
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

const fn order_by(sort: AppointmentSort) -> &'static str {
    match sort {
        AppointmentSort::DateAscending => " ORDER BY appointment_date ASC, created_at ASC",
        AppointmentSort::DateDescending => " ORDER BY appointment_date DESC, created_at ASC",
        AppointmentSort::NewestFirst => " ORDER BY created_at DESC",
    }
}

fn select_query(
    filter: &AppointmentFilter,
    sort: AppointmentSort,
    skip: u64,
    limit: u32,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {COLUMNS} FROM appointments"));
    push_filter(&mut builder, filter);
    builder.push(order_by(sort));
    builder
        .push(" LIMIT ")
        .push_bind(i64::from(limit))
        .push(" OFFSET ")
        .push_bind(i64::try_from(skip).unwrap_or(i64::MAX));
    builder
}

fn to_db_amount(amount: u32) -> Result<i32, StoreError> {
    i32::try_from(amount).map_err(|_| StoreError::Serialization(format!("amount {amount} out of range")))
}

// ============================================================================
// AppointmentStore
// ============================================================================

impl AppointmentStore for PostgresAppointmentStore {
    fn find<'a>(
        &'a self,
        filter: &'a AppointmentFilter,
        sort: AppointmentSort,
        skip: u64,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<Appointment>, StoreError>> {
        Box::pin(async move {
            let started = Instant::now();
            let result: Result<Vec<Appointment>, StoreError> = async {
                let rows = select_query(filter, sort, skip, limit)
                    .build_query_as::<AppointmentRow>()
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;
                rows.into_iter().map(Appointment::try_from).collect()
            }
            .await;
            observe("find", started, &result);
            result
        })
    }

    fn count<'a>(&'a self, filter: &'a AppointmentFilter) -> BoxFuture<'a, Result<u64, StoreError>> {
        Box::pin(async move {
            let started = Instant::now();
            let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM appointments");
            push_filter(&mut builder, filter);
            let result = builder
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)
                .map(|count| u64::try_from(count).unwrap_or(0));
            observe("count", started, &result);
            result
        })
    }

    fn find_by_id(&self, id: AppointmentId) -> BoxFuture<'_, Result<Option<Appointment>, StoreError>> {
        Box::pin(async move {
            let started = Instant::now();
            let result: Result<Option<Appointment>, StoreError> = async {
                sqlx::query_as::<_, AppointmentRow>(&format!(
                    "SELECT {COLUMNS} FROM appointments WHERE id = $1"
                ))
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .map(Appointment::try_from)
                .transpose()
            }
            .await;
            observe("find_by_id", started, &result);
            result
        })
    }

    fn find_one<'a>(
        &'a self,
        filter: &'a AppointmentFilter,
    ) -> BoxFuture<'a, Result<Option<Appointment>, StoreError>> {
        Box::pin(async move {
            let mut matches = self.find(filter, AppointmentSort::DateAscending, 0, 1).await?;
            Ok(matches.pop())
        })
    }

    fn insert(&self, appointment: NewAppointment) -> BoxFuture<'_, Result<Appointment, StoreError>> {
        Box::pin(async move {
            let started = Instant::now();
            let record = appointment.into_appointment(AppointmentId::new(), Utc::now());
            let result: Result<Appointment, StoreError> = async {
                let row = sqlx::query_as::<_, AppointmentRow>(&format!(
                    "INSERT INTO appointments ({COLUMNS}) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
                     RETURNING {COLUMNS}"
                ))
                .bind(*record.id.as_uuid())
                .bind(&record.name)
                .bind(&record.email)
                .bind(&record.phone)
                .bind(record.test_type.key())
                .bind(record.appointment_date)
                .bind(&record.notes)
                .bind(to_db_amount(record.amount)?)
                .bind(&record.order_id)
                .bind(&record.payment_id)
                .bind(record.status.as_str())
                .bind(record.payment_status.as_str())
                .bind(record.created_at)
                .bind(record.updated_at)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
                Appointment::try_from(row)
            }
            .await;
            observe("insert", started, &result);
            result
        })
    }

    fn update<'a>(
        &'a self,
        appointment: &'a Appointment,
        expected_status: AppointmentStatus,
    ) -> BoxFuture<'a, Result<Appointment, StoreError>> {
        Box::pin(async move {
            let started = Instant::now();
            let result: Result<Appointment, StoreError> = async {
                let row = sqlx::query_as::<_, AppointmentRow>(&format!(
                    "UPDATE appointments \
                     SET status = $2, payment_status = $3, payment_id = $4, notes = $5, updated_at = now() \
                     WHERE id = $1 AND status = $6 \
                     RETURNING {COLUMNS}"
                ))
                .bind(*appointment.id.as_uuid())
                .bind(appointment.status.as_str())
                .bind(appointment.payment_status.as_str())
                .bind(&appointment.payment_id)
                .bind(&appointment.notes)
                .bind(expected_status.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

                match row {
                    Some(row) => Appointment::try_from(row),
                    None if self.exists(appointment.id).await? => Err(StoreError::StaleWrite),
                    None => Err(StoreError::NotFound),
                }
            }
            .await;
            observe("update", started, &result);
            result
        })
    }

    fn delete(&self, id: AppointmentId) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            let started = Instant::now();
            let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
                .bind(*id.as_uuid())
                .execute(&self.pool)
                .await
                .map(|done| done.rows_affected() > 0)
                .map_err(map_sqlx_error);
            observe("delete", started, &result);
            result
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(map_sqlx_error)
        })
    }
}
