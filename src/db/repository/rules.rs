//! Recurring schedule store trait.
//!
//! One row per (teacher, weekday) with an open/closed flag and a wall-clock
//! window. An absent rule means the day is closed.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{CalendarSettings, TeacherId, WeeklyRule, WeeklyRulePatch};

/// Repository trait for recurring weekly availability rules.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait WeeklyRuleRepository: Send + Sync {
    /// Check if the store is healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if the connection is healthy
    /// - `Ok(false)` if unhealthy but no error occurred
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Create a weekly rule.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` if a rule already exists for the
    ///   same (teacher, weekday); callers must use [`update_rule`] instead
    ///
    /// [`update_rule`]: WeeklyRuleRepository::update_rule
    async fn create_rule(&self, rule: &WeeklyRule) -> RepositoryResult<WeeklyRule>;

    /// Fetch the rule for one weekday. `Ok(None)` means the day is closed.
    async fn get_rule(
        &self,
        teacher_id: TeacherId,
        weekday: u8,
    ) -> RepositoryResult<Option<WeeklyRule>>;

    /// List all rules for a teacher (seven or fewer rows, any order).
    async fn list_rules(&self, teacher_id: TeacherId) -> RepositoryResult<Vec<WeeklyRule>>;

    /// Partially update the rule for one weekday.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` if no rule exists for the weekday
    /// * `Err(RepositoryError::ValidationError)` if the patched window inverts
    async fn update_rule(
        &self,
        teacher_id: TeacherId,
        weekday: u8,
        patch: &WeeklyRulePatch,
    ) -> RepositoryResult<WeeklyRule>;

    /// Fetch the teacher's calendar settings, defaulting to UTC.
    async fn get_settings(&self, teacher_id: TeacherId) -> RepositoryResult<CalendarSettings>;

    /// Set the teacher's timezone (a fixed UTC offset string).
    ///
    /// # Returns
    /// * `Err(RepositoryError::ValidationError)` if the offset does not parse
    async fn set_timezone(
        &self,
        teacher_id: TeacherId,
        timezone: &str,
    ) -> RepositoryResult<CalendarSettings>;
}
