//! Exception store trait: two independent override layers.
//!
//! *Special days* replace the weekday rule for a single calendar date;
//! *unavailable periods* are blackout instant ranges that are always
//! subtracted, regardless of the override layering.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::error::RepositoryResult;
use crate::api::{
    SpecialDay, SpecialDayId, SpecialDayPatch, TeacherId, UnavailablePeriod, UnavailablePeriodId,
};

/// Repository trait for schedule exceptions.
#[async_trait]
pub trait ExceptionRepository: Send + Sync {
    /// Create a special day.
    ///
    /// # Returns
    /// * `Err(RepositoryError::Conflict)` if the teacher already has a
    ///   special day on the same date
    async fn create_special_day(&self, day: &SpecialDay) -> RepositoryResult<SpecialDay>;

    /// List special days whose date lies in the inclusive range `[from, to]`.
    async fn list_special_days(
        &self,
        teacher_id: TeacherId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<SpecialDay>>;

    /// Partially update a special day by surrogate id.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` if the id is absent
    async fn update_special_day(
        &self,
        id: SpecialDayId,
        patch: &SpecialDayPatch,
    ) -> RepositoryResult<SpecialDay>;

    /// Delete a special day by surrogate id; `NotFound` if absent.
    async fn delete_special_day(&self, id: SpecialDayId) -> RepositoryResult<()>;

    /// Create a blackout period.
    async fn create_unavailable_period(
        &self,
        period: &UnavailablePeriod,
    ) -> RepositoryResult<UnavailablePeriod>;

    /// List blackout periods intersecting the instant range: a period
    /// matches when `end >= from AND start <= to`.
    async fn list_unavailable_periods(
        &self,
        teacher_id: TeacherId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<UnavailablePeriod>>;

    /// Delete a blackout period by id; `NotFound` if absent.
    async fn delete_unavailable_period(&self, id: UnavailablePeriodId) -> RepositoryResult<()>;
}
