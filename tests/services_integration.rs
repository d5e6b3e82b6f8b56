//! End-to-end service tests: rules, overrides, blackouts, and sessions
//! flowing through free-slot generation and the full-schedule aggregator.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use calendary_rust::api::*;
use calendary_rust::db::repositories::LocalRepository;
use calendary_rust::db::repository::{
    ExceptionRepository, LessonRepository, SessionRepository, WeeklyRuleRepository,
};
use calendary_rust::services::directory::StaticDirectory;
use calendary_rust::services::{compute_free_slots, full_schedule};

fn teacher() -> TeacherId {
    TeacherId::new(42)
}

/// 2025-05-05 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 5).unwrap()
}

fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, d, h, m, 0).unwrap()
}

async fn seed_week(repo: &LocalRepository) {
    // Open Monday to Friday 09:00-18:00, closed weekend.
    for weekday in 0..5 {
        let rule = WeeklyRule::new(
            teacher(),
            weekday,
            DayWindow::parse("09:00", "18:00").unwrap(),
            true,
        )
        .unwrap();
        repo.create_rule(&rule).await.unwrap();
    }
}

async fn seed_lesson(repo: &LocalRepository) -> LessonId {
    let lesson = Lesson {
        id: None,
        title: "Grammar intensive".to_string(),
        description: None,
        lesson_type: LessonType::Group,
        language: "en".to_string(),
        level: "C1".to_string(),
        teacher_id: teacher(),
    };
    repo.create_lesson(&lesson).await.unwrap().id.unwrap()
}

#[tokio::test]
async fn test_booked_sessions_disappear_from_free_slots() {
    let repo = LocalRepository::new();
    seed_week(&repo).await;
    let lesson = seed_lesson(&repo).await;

    repo.create_session(lesson, at(5, 12, 0), at(5, 13, 0), None)
        .await
        .unwrap();

    let slots = compute_free_slots(&repo, teacher(), monday()).await.unwrap();
    assert_eq!(slots.len(), 8);
    assert!(!slots
        .iter()
        .any(|s| s.start == at(5, 12, 0) || s.end == at(5, 13, 0)));
}

#[tokio::test]
async fn test_blackout_and_sessions_compose() {
    let repo = LocalRepository::new();
    seed_week(&repo).await;
    let lesson = seed_lesson(&repo).await;

    // Blackout covers the morning; a session takes 14:00-15:00.
    let blackout =
        UnavailablePeriod::new(teacher(), at(5, 9, 0), at(5, 12, 0), Some("Away".into()))
            .unwrap();
    repo.create_unavailable_period(&blackout).await.unwrap();
    repo.create_session(lesson, at(5, 14, 0), at(5, 15, 0), None)
        .await
        .unwrap();

    let slots = compute_free_slots(&repo, teacher(), monday()).await.unwrap();
    let labels: Vec<String> = slots
        .iter()
        .map(|s| format!("{}-{}", s.start.format("%H"), s.end.format("%H")))
        .collect();
    assert_eq!(labels, vec!["12-13", "13-14", "15-16", "16-17", "17-18"]);
}

#[tokio::test]
async fn test_full_schedule_reflects_all_layers() {
    let repo = LocalRepository::new();
    seed_week(&repo).await;
    let lesson = seed_lesson(&repo).await;

    // Saturday 2025-05-10 becomes a special working day.
    let saturday = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
    repo.create_special_day(&SpecialDay {
        id: None,
        teacher_id: teacher(),
        date: saturday,
        window: DayWindow::parse("10:00", "14:00").unwrap(),
        is_active: true,
        booked_slots: vec!["10:00-11:00".to_string()],
    })
    .await
    .unwrap();

    // Wednesday is blacked out.
    let blackout =
        UnavailablePeriod::new(teacher(), at(7, 0, 0), at(7, 23, 59), None).unwrap();
    repo.create_unavailable_period(&blackout).await.unwrap();

    // A booked session on Monday.
    repo.create_session(lesson, at(5, 9, 0), at(5, 10, 0), None)
        .await
        .unwrap();
    let student = StudentId::new(uuid::Uuid::new_v4());
    repo.add_participant(&Participant::new(lesson, BookingParty::Student(student)))
        .await
        .unwrap();

    let directory = StaticDirectory::new();
    directory.add_student(student, "Dana");

    let sunday = NaiveDate::from_ymd_opt(2025, 5, 11).unwrap();
    let calendar = full_schedule(&repo, &directory, teacher(), monday(), sunday)
        .await
        .unwrap();

    assert_eq!(calendar.days.len(), 7);

    // Monday: open with a booked, name-resolved session.
    let mon = &calendar.days[0];
    assert!(mon.is_active);
    assert_eq!(mon.entries.len(), 1);
    assert!(mon.entries[0].booked);
    assert_eq!(
        mon.entries[0].booked_by.as_ref().unwrap().display_name,
        "Dana"
    );

    // Wednesday: blacked out despite the weekly rule, window still shown.
    let wed = &calendar.days[2];
    assert!(!wed.is_active);
    assert_eq!(wed.window_start.unwrap().to_string(), "09:00");

    // Saturday: special day open, with its placeholder slot entry.
    let sat = &calendar.days[5];
    assert!(sat.is_active);
    assert_eq!(sat.window_start.unwrap().to_string(), "10:00");
    assert_eq!(sat.entries.len(), 1);
    assert_eq!(sat.entries[0].status, CalendarEntryStatus::Unavailable);

    // Sunday: no rule at all.
    let sun = &calendar.days[6];
    assert!(!sun.is_active);
    assert!(sun.window_start.is_none());
}

#[tokio::test]
async fn test_free_slots_of_closed_day_empty_not_error() {
    let repo = LocalRepository::new();
    seed_week(&repo).await;

    let saturday = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
    let slots = compute_free_slots(&repo, teacher(), saturday).await.unwrap();
    assert!(slots.is_empty());
}

#[tokio::test]
async fn test_slots_line_up_with_calendar_sessions() {
    let repo = LocalRepository::new();
    seed_week(&repo).await;
    let lesson = seed_lesson(&repo).await;

    repo.create_session(lesson, at(5, 9, 0), at(5, 10, 0), None)
        .await
        .unwrap();
    repo.create_session(lesson, at(5, 17, 0), at(5, 18, 0), None)
        .await
        .unwrap();

    let slots = compute_free_slots(&repo, teacher(), monday()).await.unwrap();
    assert_eq!(slots.len(), 7);
    assert_eq!(slots.first().unwrap().start, at(5, 10, 0));
    assert_eq!(slots.last().unwrap().end, at(5, 17, 0));
}
