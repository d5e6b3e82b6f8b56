//! Booking orchestration over the session store.
//!
//! The overlap guard itself lives inside the repository implementations,
//! where the conflict scan and the insert can be made atomic per teacher.
//! This layer adds the boundary validation and the lifecycle rules that
//! sit above the store: window sanity, status transitions, and logging.

use chrono::{DateTime, Utc};

use crate::api::{LessonId, Session, SessionId, SessionPatch, SessionStatus};
use crate::db::repository::{
    FullRepository, RepositoryError, RepositoryResult, SessionRepository,
};

/// Book a new session for a lesson.
///
/// Fails with `NotFound` when the lesson is absent (correctness-critical,
/// always propagated) and with `Conflict` when the teacher already holds an
/// overlapping non-cancelled session.
pub async fn book_session(
    repo: &dyn FullRepository,
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

    let session = repo
        .create_session(lesson_id, start_time, end_time, status)
        .await?;
    log::info!(
        "Booked session {} for lesson {} ({} - {})",
        session.id.map(|i| i.value()).unwrap_or_default(),
        lesson_id,
        session.start_time.to_rfc3339(),
        session.end_time.to_rfc3339()
    );
    Ok(session)
}

/// Update a session, enforcing the status state machine.
///
/// Time changes are re-checked for conflicts by the store; an illegal
/// status jump (e.g. COMPLETED back to SCHEDULED) is rejected here.
pub async fn reschedule_session(
    repo: &dyn FullRepository,
    id: SessionId,
    patch: &SessionPatch,
) -> RepositoryResult<Session> {
    if let Some(next) = patch.status {
        let current = repo.get_session(id).await?;
        if !current.status.can_transition_to(next) {
            return Err(RepositoryError::validation(format!(
                "Session {} cannot move from {} to {}",
                id,
                current.status.as_str(),
                next.as_str()
            )));
        }
    }

    repo.update_session(id, patch).await
}

/// Cancel a session, optionally removing it entirely.
///
/// Plain cancellation keeps the row with status CANCELLED; removal deletes
/// it. Either way the window becomes bookable again, and no other session
/// needs re-validation.
pub async fn cancel_session(
    repo: &dyn FullRepository,
    id: SessionId,
    remove: bool,
) -> RepositoryResult<()> {
    if remove {
        repo.delete_session(id).await?;
        log::info!("Removed session {}", id);
        return Ok(());
    }

    let current = repo.get_session(id).await?;
    if !current.status.can_transition_to(SessionStatus::Cancelled) {
        return Err(RepositoryError::validation(format!(
            "Session {} cannot move from {} to CANCELLED",
            id,
            current.status.as_str()
        )));
    }
    repo.update_session(
        id,
        &SessionPatch {
            status: Some(SessionStatus::Cancelled),
            ..Default::default()
        },
    )
    .await?;
    log::info!("Cancelled session {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{LessonRepository, SessionRepository};
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap()
    }

    async fn seed_lesson(repo: &LocalRepository) -> LessonId {
        let lesson = Lesson {
            id: None,
            title: "Italian A2".to_string(),
            description: None,
            lesson_type: LessonType::Trial,
            language: "it".to_string(),
            level: "A2".to_string(),
            teacher_id: TeacherId::new(900),
        };
        repo.create_lesson(&lesson).await.unwrap().id.unwrap()
    }

    #[tokio::test]
    async fn test_book_session_rejects_inverted_window() {
        let repo = LocalRepository::new();
        let lesson = seed_lesson(&repo).await;
        let err = book_session(&repo, lesson, at(15), at(14), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_book_session_missing_lesson_propagates() {
        let repo = LocalRepository::new();
        let err = book_session(&repo, LessonId::new(404), at(14), at(15), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reschedule_enforces_state_machine() {
        let repo = LocalRepository::new();
        let lesson = seed_lesson(&repo).await;
        let session = book_session(&repo, lesson, at(14), at(15), None).await.unwrap();
        let id = session.id.unwrap();

        // SCHEDULED -> COMPLETED skips IN_PROGRESS.
        let err = reschedule_session(
            &repo,
            id,
            &SessionPatch {
                status: Some(SessionStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));

        let started = reschedule_session(
            &repo,
            id,
            &SessionPatch {
                status: Some(SessionStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(started.status, SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn test_cancel_keeps_row_and_frees_window() {
        let repo = LocalRepository::new();
        let lesson = seed_lesson(&repo).await;
        let session = book_session(&repo, lesson, at(14), at(15), None).await.unwrap();

        cancel_session(&repo, session.id.unwrap(), false).await.unwrap();
        let kept = repo.get_session(session.id.unwrap()).await.unwrap();
        assert_eq!(kept.status, SessionStatus::Cancelled);

        // The window is bookable again.
        book_session(&repo, lesson, at(14), at(15), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_with_removal_deletes_row() {
        let repo = LocalRepository::new();
        let lesson = seed_lesson(&repo).await;
        let session = book_session(&repo, lesson, at(14), at(15), None).await.unwrap();

        cancel_session(&repo, session.id.unwrap(), true).await.unwrap();
        let err = repo.get_session(session.id.unwrap()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
