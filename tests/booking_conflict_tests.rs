//! Booking conflict guard tests, including the concurrent double-booking
//! race the guard exists to prevent.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use calendary_rust::api::*;
use calendary_rust::db::repositories::LocalRepository;
use calendary_rust::db::repository::{
    LessonRepository, RepositoryError, SessionRepository,
};
use calendary_rust::services::booking;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 7, h, m, 0).unwrap()
}

async fn seed_lesson(repo: &LocalRepository, teacher: i64) -> LessonId {
    let lesson = Lesson {
        id: None,
        title: "Conversation practice".to_string(),
        description: Some("Weekly slot".to_string()),
        lesson_type: LessonType::Individual,
        language: "en".to_string(),
        level: "B1".to_string(),
        teacher_id: TeacherId::new(teacher),
    };
    repo.create_lesson(&lesson).await.unwrap().id.unwrap()
}

#[tokio::test]
async fn test_overlap_rejected_touching_allowed() {
    let repo = LocalRepository::new();
    let lesson = seed_lesson(&repo, 1).await;

    // A: [14:00, 15:00) succeeds.
    booking::book_session(&repo, lesson, at(14, 0), at(15, 0), None)
        .await
        .unwrap();

    // B: [14:30, 15:30) overlaps and fails with a conflict.
    let err = booking::book_session(&repo, lesson, at(14, 30), at(15, 30), None)
        .await
        .unwrap_err();
    match err {
        RepositoryError::Conflict { ref message, ref context } => {
            assert!(message.contains("already has a session"));
            assert_eq!(context.entity.as_deref(), Some("session"));
        }
        other => panic!("Expected Conflict, got {:?}", other),
    }

    // C: [15:00, 16:00) touches and succeeds.
    booking::book_session(&repo, lesson, at(15, 0), at(16, 0), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_lesson_is_not_found() {
    let repo = LocalRepository::new();
    let err = booking::book_session(&repo, LessonId::new(12345), at(9, 0), at(10, 0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[tokio::test]
async fn test_conflict_scoped_per_teacher() {
    let repo = LocalRepository::new();
    let lesson_a = seed_lesson(&repo, 10).await;
    let lesson_b = seed_lesson(&repo, 20).await;

    booking::book_session(&repo, lesson_a, at(14, 0), at(15, 0), None)
        .await
        .unwrap();
    // A different teacher can hold the same wall-clock window.
    booking::book_session(&repo, lesson_b, at(14, 0), at(15, 0), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancelled_sessions_do_not_conflict() {
    let repo = LocalRepository::new();
    let lesson = seed_lesson(&repo, 1).await;

    let session = booking::book_session(&repo, lesson, at(14, 0), at(15, 0), None)
        .await
        .unwrap();
    booking::cancel_session(&repo, session.id.unwrap(), false)
        .await
        .unwrap();

    booking::book_session(&repo, lesson, at(14, 0), at(15, 0), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_no_overlap_invariant_over_many_bookings() {
    let repo = LocalRepository::new();
    let lesson = seed_lesson(&repo, 1).await;

    // Try to book every half-hour window in a morning; only the
    // non-overlapping half survive.
    for half_hour in 0..8 {
        let start = at(9, 0) + chrono::Duration::minutes(30 * half_hour);
        let end = start + chrono::Duration::hours(1);
        let _ = booking::book_session(&repo, lesson, start, end, None).await;
    }

    let sessions = repo
        .list_sessions_for_teacher(TeacherId::new(1), at(0, 0), at(23, 59))
        .await
        .unwrap();

    let active: Vec<_> = sessions
        .iter()
        .filter(|s| s.session.status != SessionStatus::Cancelled)
        .collect();
    for (i, a) in active.iter().enumerate() {
        for b in active.iter().skip(i + 1) {
            assert!(
                a.session.end_time <= b.session.start_time
                    || b.session.end_time <= a.session.start_time,
                "Sessions {:?} and {:?} overlap",
                a.session,
                b.session
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_double_booking_single_winner() {
    // Two workers race for the same free window; the per-teacher
    // serialization inside the store must let exactly one through.
    for _ in 0..20 {
        let repo = Arc::new(LocalRepository::new());
        let lesson = seed_lesson(&repo, 1).await;

        let r1 = repo.clone();
        let r2 = repo.clone();
        let t1 = tokio::spawn(async move {
            booking::book_session(r1.as_ref(), lesson, at(14, 0), at(15, 0), None).await
        });
        let t2 = tokio::spawn(async move {
            booking::book_session(r2.as_ref(), lesson, at(14, 0), at(15, 0), None).await
        });

        let results = [t1.await.unwrap(), t2.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(RepositoryError::Conflict { .. })))
            .count();
        assert_eq!(successes, 1, "exactly one booking must win the race");
        assert_eq!(conflicts, 1, "the loser must see a conflict");
    }
}

#[tokio::test]
async fn test_reschedule_into_occupied_window_rejected() {
    let repo = LocalRepository::new();
    let lesson = seed_lesson(&repo, 1).await;

    booking::book_session(&repo, lesson, at(9, 0), at(10, 0), None)
        .await
        .unwrap();
    let movable = booking::book_session(&repo, lesson, at(11, 0), at(12, 0), None)
        .await
        .unwrap();

    let err = booking::reschedule_session(
        &repo,
        movable.id.unwrap(),
        &SessionPatch {
            start_time: Some(at(9, 30)),
            end_time: Some(at(10, 30)),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict { .. }));
}
