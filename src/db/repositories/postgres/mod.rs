//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres database.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//! - Per-teacher advisory locking around the booking conflict check, so two
//!   concurrent bookings of the same window cannot both pass the scan
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

use crate::api::*;
use crate::db::repository::{
    ErrorContext, ExceptionRepository, LessonRepository, RepositoryError, RepositoryResult,
    SessionRepository, WeeklyRuleRepository,
};
use crate::models::time::parse_utc_offset;

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

const CANCELLED: &str = "CANCELLED";

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        Ok(Self {
            database_url,
            max_pool_size: env_parse("PG_POOL_MAX", 10),
            min_pool_size: env_parse("PG_POOL_MIN", 1),
            connection_timeout_sec: env_parse("PG_CONN_TIMEOUT_SEC", 30),
            idle_timeout_sec: env_parse("PG_IDLE_TIMEOUT_SEC", 600),
            max_retries: env_parse("PG_MAX_RETRIES", 3),
            retry_delay_ms: env_parse("PG_RETRY_DELAY_MS", 100),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

#[derive(Default)]
struct QueryStats {
    executed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    stats: Arc<QueryStats>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            stats: Arc::new(QueryStats::default()),
        })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        Ok(())
    }

    /// Run a blocking database operation on the pool, retrying transient
    /// failures (lost connections, timeouts, serialization aborts) with
    /// exponential backoff.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let stats = self.stats.clone();
        let max_retries = self.config.max_retries;
        let base_delay = Duration::from_millis(self.config.retry_delay_ms);

        task::spawn_blocking(move || {
            let mut last_error = None;

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    stats.retried.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(base_delay * 2u32.pow(attempt - 1));
                }

                let outcome = match pool.get() {
                    Ok(mut conn) => {
                        stats.executed.fetch_add(1, Ordering::Relaxed);
                        f.clone()(&mut conn)
                    }
                    Err(e) => Err(RepositoryError::connection_with_context(
                        e.to_string(),
                        ErrorContext::new("get_connection")
                            .with_details(format!("attempt={}", attempt + 1)),
                    )),
                };

                match outcome {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_retryable() && attempt < max_retries => last_error = Some(e),
                    Err(e) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            stats.failed.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Retry budget exhausted with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.stats.executed.load(Ordering::Relaxed),
            failed_queries: self.stats.failed.load(Ordering::Relaxed),
            retried_operations: self.stats.retried.load(Ordering::Relaxed),
        }
    }
}

/// Serialize writes for one teacher within the current transaction.
fn advisory_lock(conn: &mut PgConnection, teacher_id: i64) -> RepositoryResult<()> {
    sql_query("SELECT pg_advisory_xact_lock($1)")
        .bind::<diesel::sql_types::BigInt, _>(teacher_id)
        .execute(conn)?;
    Ok(())
}

fn lesson_teacher(conn: &mut PgConnection, lesson_id: i64) -> RepositoryResult<i64> {
    let teacher: Option<i64> = lessons::table
        .find(lesson_id)
        .select(lessons::teacher_id)
        .first(conn)
        .optional()?;
    teacher.ok_or_else(|| {
        RepositoryError::not_found_with_context(
            format!("Lesson {} not found", lesson_id),
            ErrorContext::default()
                .with_entity("lesson")
                .with_entity_id(lesson_id),
        )
    })
}

/// Teacher-scoped strict-overlap scan, skipping cancelled sessions.
fn find_conflict(
    conn: &mut PgConnection,
    teacher_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<i64>,
) -> RepositoryResult<Option<SessionRow>> {
    let mut query = lesson_sessions::table
        .inner_join(lessons::table)
        .select(SessionRow::as_select())
        .into_boxed()
        .filter(lessons::teacher_id.eq(teacher_id))
        .filter(lesson_sessions::start_time.lt(end))
        .filter(lesson_sessions::end_time.gt(start))
        .filter(lesson_sessions::status.ne(CANCELLED));
    if let Some(id) = exclude {
        query = query.filter(lesson_sessions::id.ne(id));
    }
    Ok(query
        .order(lesson_sessions::start_time.asc())
        .first(conn)
        .optional()?)
}

fn booking_conflict(teacher_id: i64, existing: &SessionRow) -> RepositoryError {
    RepositoryError::conflict_with_context(
        format!(
            "Teacher {} already has a session from {} to {}",
            teacher_id,
            existing.start_time.to_rfc3339(),
            existing.end_time.to_rfc3339()
        ),
        ErrorContext::new("create_session")
            .with_entity("session")
            .with_details(format!("blocking_session_id={}", existing.id)),
    )
}

#[async_trait]
impl WeeklyRuleRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
    }

    async fn create_rule(&self, rule: &WeeklyRule) -> RepositoryResult<WeeklyRule> {
        let new_row = NewWeeklyRuleRow::from(rule);
        let teacher = rule.teacher_id;
        let weekday = rule.weekday;
        self.with_conn(move |conn| {
            let row: WeeklyRuleRow = diesel::insert_into(weekly_rules::table)
                .values(&new_row)
                .returning(WeeklyRuleRow::as_returning())
                .get_result(conn)
                .map_err(|e| match RepositoryError::from(e) {
                    RepositoryError::Conflict { context, .. } => RepositoryError::Conflict {
                        message: format!(
                            "Teacher {} already has a rule for weekday {}",
                            teacher, weekday
                        ),
                        context,
                    },
                    other => other,
                })?;
            WeeklyRule::try_from(row)
        })
        .await
    }

    async fn get_rule(
        &self,
        teacher_id: TeacherId,
        weekday: u8,
    ) -> RepositoryResult<Option<WeeklyRule>> {
        let teacher = teacher_id.value();
        self.with_conn(move |conn| {
            let row: Option<WeeklyRuleRow> = weekly_rules::table
                .filter(weekly_rules::teacher_id.eq(teacher))
                .filter(weekly_rules::weekday.eq(weekday as i16))
                .select(WeeklyRuleRow::as_select())
                .first(conn)
                .optional()?;
            row.map(WeeklyRule::try_from).transpose()
        })
        .await
    }

    async fn list_rules(&self, teacher_id: TeacherId) -> RepositoryResult<Vec<WeeklyRule>> {
        let teacher = teacher_id.value();
        self.with_conn(move |conn| {
            let rows: Vec<WeeklyRuleRow> = weekly_rules::table
                .filter(weekly_rules::teacher_id.eq(teacher))
                .order(weekly_rules::weekday.asc())
                .select(WeeklyRuleRow::as_select())
                .load(conn)?;
            rows.into_iter().map(WeeklyRule::try_from).collect()
        })
        .await
    }

    async fn update_rule(
        &self,
        teacher_id: TeacherId,
        weekday: u8,
        patch: &WeeklyRulePatch,
    ) -> RepositoryResult<WeeklyRule> {
        let teacher = teacher_id.value();
        let patch = patch.clone();
        self.with_conn(move |conn| {
            conn.transaction::<WeeklyRule, RepositoryError, _>(|conn| {
                let row: Option<WeeklyRuleRow> = weekly_rules::table
                    .filter(weekly_rules::teacher_id.eq(teacher))
                    .filter(weekly_rules::weekday.eq(weekday as i16))
                    .select(WeeklyRuleRow::as_select())
                    .first(conn)
                    .optional()?;
                let row = row.ok_or_else(|| {
                    RepositoryError::not_found(format!(
                        "No rule for teacher {} on weekday {}",
                        teacher, weekday
                    ))
                })?;
                let id = row.id;
                let current = WeeklyRule::try_from(row)?;
                let updated = patch.apply(&current).map_err(RepositoryError::validation)?;

                let row: WeeklyRuleRow = diesel::update(weekly_rules::table.find(id))
                    .set((
                        weekly_rules::window_start.eq(updated.window.start.to_string()),
                        weekly_rules::window_end.eq(updated.window.end.to_string()),
                        weekly_rules::is_open.eq(updated.is_open),
                        weekly_rules::updated_at.eq(Some(Utc::now())),
                    ))
                    .returning(WeeklyRuleRow::as_returning())
                    .get_result(conn)?;
                WeeklyRule::try_from(row)
            })
        })
        .await
    }

    async fn get_settings(&self, teacher_id: TeacherId) -> RepositoryResult<CalendarSettings> {
        let teacher = teacher_id.value();
        self.with_conn(move |conn| {
            let row: Option<CalendarSettingsRow> = calendar_settings::table
                .find(teacher)
                .select(CalendarSettingsRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row
                .map(CalendarSettings::from)
                .unwrap_or_else(|| CalendarSettings::default_for(TeacherId::new(teacher))))
        })
        .await
    }

    async fn set_timezone(
        &self,
        teacher_id: TeacherId,
        timezone: &str,
    ) -> RepositoryResult<CalendarSettings> {
        parse_utc_offset(timezone).map_err(RepositoryError::validation)?;
        let teacher = teacher_id.value();
        let tz = timezone.to_string();
        self.with_conn(move |conn| {
            let row: CalendarSettingsRow = diesel::insert_into(calendar_settings::table)
                .values((
                    calendar_settings::teacher_id.eq(teacher),
                    calendar_settings::timezone.eq(&tz),
                ))
                .on_conflict(calendar_settings::teacher_id)
                .do_update()
                .set(calendar_settings::timezone.eq(&tz))
                .returning(CalendarSettingsRow::as_returning())
                .get_result(conn)?;
            Ok(CalendarSettings::from(row))
        })
        .await
    }
}

#[async_trait]
impl ExceptionRepository for PostgresRepository {
    async fn create_special_day(&self, day: &SpecialDay) -> RepositoryResult<SpecialDay> {
        let new_row = NewSpecialDayRow::from(day);
        let teacher = day.teacher_id;
        let date = day.date;
        self.with_conn(move |conn| {
            let row: SpecialDayRow = diesel::insert_into(special_days::table)
                .values(&new_row)
                .returning(SpecialDayRow::as_returning())
                .get_result(conn)
                .map_err(|e| match RepositoryError::from(e) {
                    RepositoryError::Conflict { context, .. } => RepositoryError::Conflict {
                        message: format!(
                            "Teacher {} already has a special day on {}",
                            teacher, date
                        ),
                        context,
                    },
                    other => other,
                })?;
            SpecialDay::try_from(row)
        })
        .await
    }

    async fn list_special_days(
        &self,
        teacher_id: TeacherId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<SpecialDay>> {
        let teacher = teacher_id.value();
        self.with_conn(move |conn| {
            let rows: Vec<SpecialDayRow> = special_days::table
                .filter(special_days::teacher_id.eq(teacher))
                .filter(special_days::day.ge(from))
                .filter(special_days::day.le(to))
                .order(special_days::day.asc())
                .select(SpecialDayRow::as_select())
                .load(conn)?;
            rows.into_iter().map(SpecialDay::try_from).collect()
        })
        .await
    }

    async fn update_special_day(
        &self,
        id: SpecialDayId,
        patch: &SpecialDayPatch,
    ) -> RepositoryResult<SpecialDay> {
        let id = id.value();
        let patch = patch.clone();
        self.with_conn(move |conn| {
            conn.transaction::<SpecialDay, RepositoryError, _>(|conn| {
                let row: Option<SpecialDayRow> = special_days::table
                    .find(id)
                    .select(SpecialDayRow::as_select())
                    .first(conn)
                    .optional()?;
                let row = row.ok_or_else(|| {
                    RepositoryError::not_found(format!("Special day {} not found", id))
                })?;
                let current = SpecialDay::try_from(row)?;
                let updated = patch.apply(&current).map_err(RepositoryError::validation)?;

                let row: SpecialDayRow = diesel::update(special_days::table.find(id))
                    .set((
                        special_days::window_start.eq(updated.window.start.to_string()),
                        special_days::window_end.eq(updated.window.end.to_string()),
                        special_days::is_active.eq(updated.is_active),
                        special_days::booked_slots.eq(serde_json::to_value(&updated.booked_slots)
                            .unwrap_or_else(|_| serde_json::Value::Array(vec![]))),
                    ))
                    .returning(SpecialDayRow::as_returning())
                    .get_result(conn)?;
                SpecialDay::try_from(row)
            })
        })
        .await
    }

    async fn delete_special_day(&self, id: SpecialDayId) -> RepositoryResult<()> {
        let id = id.value();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(special_days::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Special day {} not found",
                    id
                )));
            }
            Ok(())
        })
        .await
    }

    async fn create_unavailable_period(
        &self,
        period: &UnavailablePeriod,
    ) -> RepositoryResult<UnavailablePeriod> {
        let new_row = NewUnavailablePeriodRow::from(period);
        self.with_conn(move |conn| {
            let row: UnavailablePeriodRow = diesel::insert_into(unavailable_periods::table)
                .values(&new_row)
                .returning(UnavailablePeriodRow::as_returning())
                .get_result(conn)?;
            Ok(UnavailablePeriod::from(row))
        })
        .await
    }

    async fn list_unavailable_periods(
        &self,
        teacher_id: TeacherId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<UnavailablePeriod>> {
        let teacher = teacher_id.value();
        self.with_conn(move |conn| {
            let rows: Vec<UnavailablePeriodRow> = unavailable_periods::table
                .filter(unavailable_periods::teacher_id.eq(teacher))
                .filter(unavailable_periods::end_time.ge(from))
                .filter(unavailable_periods::start_time.le(to))
                .order(unavailable_periods::start_time.asc())
                .select(UnavailablePeriodRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(UnavailablePeriod::from).collect())
        })
        .await
    }

    async fn delete_unavailable_period(&self, id: UnavailablePeriodId) -> RepositoryResult<()> {
        let id = id.value();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(unavailable_periods::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Unavailable period {} not found",
                    id
                )));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl LessonRepository for PostgresRepository {
    async fn create_lesson(&self, lesson: &Lesson) -> RepositoryResult<Lesson> {
        let new_row = NewLessonRow::from(lesson);
        self.with_conn(move |conn| {
            let row: LessonRow = diesel::insert_into(lessons::table)
                .values(&new_row)
                .returning(LessonRow::as_returning())
                .get_result(conn)?;
            Lesson::try_from(row)
        })
        .await
    }

    async fn get_lesson(&self, id: LessonId) -> RepositoryResult<Lesson> {
        let id = id.value();
        self.with_conn(move |conn| {
            let row: Option<LessonRow> = lessons::table
                .find(id)
                .select(LessonRow::as_select())
                .first(conn)
                .optional()?;
            row.ok_or_else(|| RepositoryError::not_found(format!("Lesson {} not found", id)))
                .and_then(Lesson::try_from)
        })
        .await
    }

    async fn list_lessons(&self, teacher_id: Option<TeacherId>) -> RepositoryResult<Vec<Lesson>> {
        let teacher = teacher_id.map(|t| t.value());
        self.with_conn(move |conn| {
            let mut query = lessons::table
                .select(LessonRow::as_select())
                .into_boxed();
            if let Some(t) = teacher {
                query = query.filter(lessons::teacher_id.eq(t));
            }
            let rows: Vec<LessonRow> = query.order(lessons::id.asc()).load(conn)?;
            rows.into_iter().map(Lesson::try_from).collect()
        })
        .await
    }

    async fn update_lesson(&self, id: LessonId, patch: &LessonPatch) -> RepositoryResult<Lesson> {
        let id = id.value();
        let patch = patch.clone();
        self.with_conn(move |conn| {
            conn.transaction::<Lesson, RepositoryError, _>(|conn| {
                let row: Option<LessonRow> = lessons::table
                    .find(id)
                    .select(LessonRow::as_select())
                    .first(conn)
                    .optional()?;
                let row = row.ok_or_else(|| {
                    RepositoryError::not_found(format!("Lesson {} not found", id))
                })?;
                let updated = patch.apply(&Lesson::try_from(row)?);

                let row: LessonRow = diesel::update(lessons::table.find(id))
                    .set((
                        lessons::title.eq(updated.title.clone()),
                        lessons::description.eq(updated.description.clone()),
                        lessons::lesson_type.eq(updated.lesson_type.as_str()),
                        lessons::language.eq(updated.language.clone()),
                        lessons::level.eq(updated.level.clone()),
                    ))
                    .returning(LessonRow::as_returning())
                    .get_result(conn)?;
                Lesson::try_from(row)
            })
        })
        .await
    }

    async fn delete_lesson(&self, id: LessonId) -> RepositoryResult<()> {
        let id = id.value();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(lessons::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Lesson {} not found",
                    id
                )));
            }
            Ok(())
        })
        .await
    }

    async fn add_participant(&self, participant: &Participant) -> RepositoryResult<Participant> {
        let new_row = NewParticipantRow::from(participant);
        let lesson_id = participant.lesson_id.value();
        self.with_conn(move |conn| {
            conn.transaction::<Participant, RepositoryError, _>(|conn| {
                lesson_teacher(conn, lesson_id)?;

                let mut existing = lesson_participants::table
                    .select(lesson_participants::id)
                    .into_boxed()
                    .filter(lesson_participants::lesson_id.eq(lesson_id));
                existing = match (new_row.student_id, new_row.group_id) {
                    (Some(s), _) => existing.filter(lesson_participants::student_id.eq(s)),
                    (_, Some(g)) => existing.filter(lesson_participants::group_id.eq(g)),
                    _ => existing,
                };
                let duplicate: Option<i64> = existing.first(conn).optional()?;
                if duplicate.is_some() {
                    return Err(RepositoryError::conflict_with_context(
                        "Participant already enrolled in this lesson".to_string(),
                        ErrorContext::new("add_participant").with_entity("participant"),
                    ));
                }

                let row: ParticipantRow = diesel::insert_into(lesson_participants::table)
                    .values(&new_row)
                    .returning(ParticipantRow::as_returning())
                    .get_result(conn)?;
                Participant::try_from(row)
            })
        })
        .await
    }

    async fn list_participants(&self, lesson_id: LessonId) -> RepositoryResult<Vec<Participant>> {
        let lesson = lesson_id.value();
        self.with_conn(move |conn| {
            let rows: Vec<ParticipantRow> = lesson_participants::table
                .filter(lesson_participants::lesson_id.eq(lesson))
                .order(lesson_participants::id.asc())
                .select(ParticipantRow::as_select())
                .load(conn)?;
            rows.into_iter().map(Participant::try_from).collect()
        })
        .await
    }

    async fn set_participant_confirmed(
        &self,
        id: ParticipantId,
        confirmed: bool,
    ) -> RepositoryResult<Participant> {
        let id = id.value();
        self.with_conn(move |conn| {
            let confirmation = confirmed.then(Utc::now);
            let row: Option<ParticipantRow> = diesel::update(lesson_participants::table.find(id))
                .set((
                    lesson_participants::is_confirmed.eq(confirmed),
                    lesson_participants::confirmation_date.eq(confirmation),
                ))
                .returning(ParticipantRow::as_returning())
                .get_result(conn)
                .optional()?;
            row.ok_or_else(|| {
                RepositoryError::not_found(format!("Participant {} not found", id))
            })
            .and_then(Participant::try_from)
        })
        .await
    }

    async fn remove_participant(&self, id: ParticipantId) -> RepositoryResult<()> {
        let id = id.value();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(lesson_participants::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Participant {} not found",
                    id
                )));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SessionRepository for PostgresRepository {
    async fn create_session(
        &self,
        lesson_id: LessonId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        status: Option<SessionStatus>,
    ) -> RepositoryResult<Session> {
        if end_time <= start_time {
            return Err(RepositoryError::validation(
                "Session end must be after start",
            ));
        }
        let lesson = lesson_id.value();
        let status = status.unwrap_or(SessionStatus::Scheduled);
        self.with_conn(move |conn| {
            conn.transaction::<Session, RepositoryError, _>(|conn| {
                let teacher = lesson_teacher(conn, lesson)?;
                advisory_lock(conn, teacher)?;

                if let Some(existing) = find_conflict(conn, teacher, start_time, end_time, None)? {
                    return Err(booking_conflict(teacher, &existing));
                }

                let row: SessionRow = diesel::insert_into(lesson_sessions::table)
                    .values(&NewSessionRow {
                        lesson_id: lesson,
                        start_time,
                        end_time,
                        status: status.as_str().to_string(),
                    })
                    .returning(SessionRow::as_returning())
                    .get_result(conn)?;
                Session::try_from(row)
            })
        })
        .await
    }

    async fn get_session(&self, id: SessionId) -> RepositoryResult<Session> {
        let id = id.value();
        self.with_conn(move |conn| {
            let row: Option<SessionRow> = lesson_sessions::table
                .find(id)
                .select(SessionRow::as_select())
                .first(conn)
                .optional()?;
            row.ok_or_else(|| RepositoryError::not_found(format!("Session {} not found", id)))
                .and_then(Session::try_from)
        })
        .await
    }

    async fn list_sessions_for_teacher(
        &self,
        teacher_id: TeacherId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<AnnotatedSession>> {
        let teacher = teacher_id.value();
        self.with_conn(move |conn| {
            let rows: Vec<(SessionRow, LessonRow)> = lesson_sessions::table
                .inner_join(lessons::table)
                .filter(lessons::teacher_id.eq(teacher))
                .filter(lesson_sessions::start_time.lt(to))
                .filter(lesson_sessions::end_time.gt(from))
                .order((lesson_sessions::start_time.asc(), lesson_sessions::id.asc()))
                .select((SessionRow::as_select(), LessonRow::as_select()))
                .load(conn)?;

            let lesson_ids: Vec<i64> = rows.iter().map(|(_, l)| l.id).collect();
            let participants: Vec<ParticipantRow> = if lesson_ids.is_empty() {
                Vec::new()
            } else {
                lesson_participants::table
                    .filter(lesson_participants::lesson_id.eq_any(&lesson_ids))
                    .order(lesson_participants::id.asc())
                    .select(ParticipantRow::as_select())
                    .load(conn)?
            };

            rows.into_iter()
                .map(|(session_row, lesson_row)| {
                    let first_party = participants
                        .iter()
                        .find(|p| p.lesson_id == session_row.lesson_id)
                        .cloned()
                        .map(Participant::try_from)
                        .transpose()?;
                    let session = Session::try_from(session_row)?;
                    let lesson = Lesson::try_from(lesson_row)?;
                    Ok(AnnotatedSession {
                        session,
                        booked: first_party.is_some(),
                        booked_by: first_party.map(|p| p.party),
                        lesson: Some(LessonSummary::from(&lesson)),
                    })
                })
                .collect()
        })
        .await
    }

    async fn update_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> RepositoryResult<Session> {
        let id = id.value();
        let patch = patch.clone();
        self.with_conn(move |conn| {
            conn.transaction::<Session, RepositoryError, _>(|conn| {
                let row: Option<SessionRow> = lesson_sessions::table
                    .find(id)
                    .select(SessionRow::as_select())
                    .first(conn)
                    .optional()?;
                let row = row.ok_or_else(|| {
                    RepositoryError::not_found(format!("Session {} not found", id))
                })?;
                let current = Session::try_from(row)?;

                let updated = Session {
                    start_time: patch.start_time.unwrap_or(current.start_time),
                    end_time: patch.end_time.unwrap_or(current.end_time),
                    status: patch.status.unwrap_or(current.status),
                    ..current.clone()
                };
                if updated.end_time <= updated.start_time {
                    return Err(RepositoryError::validation(
                        "Session end must be after start",
                    ));
                }

                if patch.moves_window(&current) && updated.status != SessionStatus::Cancelled {
                    let teacher = lesson_teacher(conn, current.lesson_id.value())?;
                    advisory_lock(conn, teacher)?;
                    if let Some(existing) = find_conflict(
                        conn,
                        teacher,
                        updated.start_time,
                        updated.end_time,
                        Some(id),
                    )? {
                        return Err(
                            booking_conflict(teacher, &existing).with_operation("update_session")
                        );
                    }
                }

                let row: SessionRow = diesel::update(lesson_sessions::table.find(id))
                    .set((
                        lesson_sessions::start_time.eq(updated.start_time),
                        lesson_sessions::end_time.eq(updated.end_time),
                        lesson_sessions::status.eq(updated.status.as_str()),
                        lesson_sessions::updated_at.eq(Some(Utc::now())),
                    ))
                    .returning(SessionRow::as_returning())
                    .get_result(conn)?;
                Session::try_from(row)
            })
        })
        .await
    }

    async fn delete_session(&self, id: SessionId) -> RepositoryResult<()> {
        let id = id.value();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(lesson_sessions::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(RepositoryError::not_found(format!(
                    "Session {} not found",
                    id
                )));
            }
            Ok(())
        })
        .await
    }
}
