//! Session store trait, including the booking conflict guard.
//!
//! The guard is part of the store contract rather than a separate layer
//! because the conflict scan and the insert must be atomic per teacher:
//! two concurrent bookings of the same free window must not both pass the
//! scan. The local store runs both under a single write guard; the Postgres
//! store holds a per-teacher advisory transaction lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::api::{
    AnnotatedSession, LessonId, Session, SessionId, SessionPatch, SessionStatus, TeacherId,
};

/// Repository trait for lesson sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a session after the teacher-scoped conflict check.
    ///
    /// Two sessions conflict iff `existing.start < new.end AND existing.end
    /// > new.start`; touching endpoints do not conflict. CANCELLED sessions
    /// are ignored by the scan.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` if the lesson is absent
    /// * `Err(RepositoryError::Conflict)` if the teacher already has a
    ///   non-cancelled session overlapping the window
    async fn create_session(
        &self,
        lesson_id: LessonId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        status: Option<SessionStatus>,
    ) -> RepositoryResult<Session>;

    /// Fetch a session by id; `NotFound` if absent.
    async fn get_session(&self, id: SessionId) -> RepositoryResult<Session>;

    /// List the teacher's sessions overlapping the instant range, each
    /// annotated with its booking state and lesson summary. The annotation
    /// is a join against participants, not stored state.
    async fn list_sessions_for_teacher(
        &self,
        teacher_id: TeacherId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<AnnotatedSession>>;

    /// Partially update a session.
    ///
    /// A patch that moves the session in time re-runs the conflict scan
    /// (excluding the session itself) under the same atomicity discipline
    /// as [`create_session`]. Status-only patches are unconditional.
    ///
    /// [`create_session`]: SessionRepository::create_session
    async fn update_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> RepositoryResult<Session>;

    /// Delete a session by id; `NotFound` if absent. Removal only reduces
    /// busy intervals, so no other session needs re-validation.
    async fn delete_session(&self, id: SessionId) -> RepositoryResult<()>;
}
