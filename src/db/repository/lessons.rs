//! Lesson store trait: lesson definitions and participant enrollments.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{Lesson, LessonId, LessonPatch, Participant, ParticipantId, TeacherId};

/// Repository trait for lessons and their participants.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Create a lesson definition.
    async fn create_lesson(&self, lesson: &Lesson) -> RepositoryResult<Lesson>;

    /// Fetch a lesson by id; `NotFound` if absent.
    async fn get_lesson(&self, id: LessonId) -> RepositoryResult<Lesson>;

    /// List lessons, optionally filtered to one teacher.
    async fn list_lessons(&self, teacher_id: Option<TeacherId>) -> RepositoryResult<Vec<Lesson>>;

    /// Partially update a lesson; `NotFound` if absent.
    async fn update_lesson(&self, id: LessonId, patch: &LessonPatch) -> RepositoryResult<Lesson>;

    /// Delete a lesson by id; `NotFound` if absent.
    async fn delete_lesson(&self, id: LessonId) -> RepositoryResult<()>;

    /// Enroll a student or group into a lesson.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` if the lesson is absent
    /// * `Err(RepositoryError::Conflict)` if the same party is already
    ///   enrolled in the lesson
    async fn add_participant(&self, participant: &Participant) -> RepositoryResult<Participant>;

    /// List all enrollments for a lesson.
    async fn list_participants(&self, lesson_id: LessonId) -> RepositoryResult<Vec<Participant>>;

    /// Confirm or unconfirm an enrollment; `NotFound` if absent.
    async fn set_participant_confirmed(
        &self,
        id: ParticipantId,
        confirmed: bool,
    ) -> RepositoryResult<Participant>;

    /// Remove an enrollment by id; `NotFound` if absent.
    async fn remove_participant(&self, id: ParticipantId) -> RepositoryResult<()>;
}
