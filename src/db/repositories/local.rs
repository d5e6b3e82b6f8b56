//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory using HashMap structures behind a single `RwLock`, providing
//! fast, deterministic, and isolated execution.
//!
//! The lock doubles as the concurrency discipline the booking guard needs:
//! the conflict scan and the insert both happen under one write guard, so
//! two concurrent bookings of the same window can never both pass the scan.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::*;
use crate::db::repository::*;
use crate::models::time::{parse_utc_offset, Interval};

/// In-memory local repository.
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

#[derive(Default)]
struct LocalData {
    rules: HashMap<(i64, u8), WeeklyRule>,
    timezones: HashMap<i64, String>,
    special_days: HashMap<i64, SpecialDay>,
    unavailable_periods: HashMap<i64, UnavailablePeriod>,
    lessons: HashMap<i64, Lesson>,
    sessions: HashMap<i64, Session>,
    participants: HashMap<i64, Participant>,

    next_special_day_id: i64,
    next_unavailable_id: i64,
    next_lesson_id: i64,
    next_session_id: i64,
    next_participant_id: i64,

    is_healthy: bool,
}

impl LocalData {
    fn new() -> Self {
        LocalData {
            next_special_day_id: 1,
            next_unavailable_id: 1,
            next_lesson_id: 1,
            next_session_id: 1,
            next_participant_id: 1,
            is_healthy: true,
            ..Default::default()
        }
    }

    fn lesson_or_not_found(&self, id: LessonId) -> RepositoryResult<&Lesson> {
        self.lessons.get(&id.value()).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Lesson {} not found", id),
                ErrorContext::default()
                    .with_entity("lesson")
                    .with_entity_id(id),
            )
        })
    }

    /// Teacher-scoped conflict scan. Touching endpoints do not conflict and
    /// cancelled sessions never block.
    fn find_conflict(
        &self,
        teacher_id: TeacherId,
        window: &Interval,
        exclude: Option<SessionId>,
    ) -> Option<&Session> {
        self.sessions.values().find(|s| {
            if exclude.is_some() && s.id == exclude {
                return false;
            }
            let same_teacher = self
                .lessons
                .get(&s.lesson_id.value())
                .is_some_and(|l| l.teacher_id == teacher_id);
            same_teacher && s.blocks(window)
        })
    }

    fn annotate(&self, session: &Session) -> AnnotatedSession {
        let lesson = self.lessons.get(&session.lesson_id.value());
        let mut parties = self
            .participants
            .values()
            .filter(|p| p.lesson_id == session.lesson_id)
            .collect::<Vec<_>>();
        parties.sort_by_key(|p| p.id);

        AnnotatedSession {
            session: session.clone(),
            booked: !parties.is_empty(),
            booked_by: parties.first().map(|p| p.party),
            lesson: lesson.map(LessonSummary::from),
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::new())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let healthy = data.is_healthy;
        *data = LocalData::new();
        data.is_healthy = healthy;
    }

    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeeklyRuleRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_rule(&self, rule: &WeeklyRule) -> RepositoryResult<WeeklyRule> {
        self.check_health()?;
        let mut data = self.data.write();
        let key = (rule.teacher_id.value(), rule.weekday);
        if data.rules.contains_key(&key) {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "Teacher {} already has a rule for weekday {}",
                    rule.teacher_id, rule.weekday
                ),
                ErrorContext::new("create_rule").with_entity("weekly_rule"),
            ));
        }
        data.rules.insert(key, rule.clone());
        Ok(rule.clone())
    }

    async fn get_rule(
        &self,
        teacher_id: TeacherId,
        weekday: u8,
    ) -> RepositoryResult<Option<WeeklyRule>> {
        let data = self.data.read();
        Ok(data.rules.get(&(teacher_id.value(), weekday)).cloned())
    }

    async fn list_rules(&self, teacher_id: TeacherId) -> RepositoryResult<Vec<WeeklyRule>> {
        let data = self.data.read();
        let mut rules: Vec<WeeklyRule> = data
            .rules
            .values()
            .filter(|r| r.teacher_id == teacher_id)
            .cloned()
            .collect();
        rules.sort_by_key(|r| r.weekday);
        Ok(rules)
    }

    async fn update_rule(
        &self,
        teacher_id: TeacherId,
        weekday: u8,
        patch: &WeeklyRulePatch,
    ) -> RepositoryResult<WeeklyRule> {
        let mut data = self.data.write();
        let key = (teacher_id.value(), weekday);
        let rule = data.rules.get(&key).ok_or_else(|| {
            RepositoryError::not_found(format!(
                "No rule for teacher {} on weekday {}",
                teacher_id, weekday
            ))
        })?;
        let updated = patch.apply(rule).map_err(RepositoryError::validation)?;
        data.rules.insert(key, updated.clone());
        Ok(updated)
    }

    async fn get_settings(&self, teacher_id: TeacherId) -> RepositoryResult<CalendarSettings> {
        let data = self.data.read();
        Ok(data
            .timezones
            .get(&teacher_id.value())
            .map(|tz| CalendarSettings {
                teacher_id,
                timezone: tz.clone(),
            })
            .unwrap_or_else(|| CalendarSettings::default_for(teacher_id)))
    }

    async fn set_timezone(
        &self,
        teacher_id: TeacherId,
        timezone: &str,
    ) -> RepositoryResult<CalendarSettings> {
        parse_utc_offset(timezone).map_err(RepositoryError::validation)?;
        let mut data = self.data.write();
        data.timezones
            .insert(teacher_id.value(), timezone.to_string());
        Ok(CalendarSettings {
            teacher_id,
            timezone: timezone.to_string(),
        })
    }
}

#[async_trait]
impl ExceptionRepository for LocalRepository {
    async fn create_special_day(&self, day: &SpecialDay) -> RepositoryResult<SpecialDay> {
        self.check_health()?;
        let mut data = self.data.write();
        let duplicate = data
            .special_days
            .values()
            .any(|d| d.teacher_id == day.teacher_id && d.date == day.date);
        if duplicate {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "Teacher {} already has a special day on {}",
                    day.teacher_id, day.date
                ),
                ErrorContext::new("create_special_day").with_entity("special_day"),
            ));
        }

        let id = data.next_special_day_id;
        data.next_special_day_id += 1;
        let mut stored = day.clone();
        stored.id = Some(SpecialDayId::new(id));
        data.special_days.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_special_days(
        &self,
        teacher_id: TeacherId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<SpecialDay>> {
        let data = self.data.read();
        let mut days: Vec<SpecialDay> = data
            .special_days
            .values()
            .filter(|d| d.teacher_id == teacher_id && d.date >= from && d.date <= to)
            .cloned()
            .collect();
        days.sort_by_key(|d| d.date);
        Ok(days)
    }

    async fn update_special_day(
        &self,
        id: SpecialDayId,
        patch: &SpecialDayPatch,
    ) -> RepositoryResult<SpecialDay> {
        let mut data = self.data.write();
        let day = data.special_days.get(&id.value()).ok_or_else(|| {
            RepositoryError::not_found(format!("Special day {} not found", id))
        })?;
        let updated = patch.apply(day).map_err(RepositoryError::validation)?;
        data.special_days.insert(id.value(), updated.clone());
        Ok(updated)
    }

    async fn delete_special_day(&self, id: SpecialDayId) -> RepositoryResult<()> {
        let mut data = self.data.write();
        data.special_days
            .remove(&id.value())
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(format!("Special day {} not found", id)))
    }

    async fn create_unavailable_period(
        &self,
        period: &UnavailablePeriod,
    ) -> RepositoryResult<UnavailablePeriod> {
        self.check_health()?;
        let mut data = self.data.write();
        let id = data.next_unavailable_id;
        data.next_unavailable_id += 1;
        let mut stored = period.clone();
        stored.id = Some(UnavailablePeriodId::new(id));
        data.unavailable_periods.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_unavailable_periods(
        &self,
        teacher_id: TeacherId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<UnavailablePeriod>> {
        let data = self.data.read();
        let mut periods: Vec<UnavailablePeriod> = data
            .unavailable_periods
            .values()
            .filter(|p| p.teacher_id == teacher_id && p.end_time >= from && p.start_time <= to)
            .cloned()
            .collect();
        periods.sort_by_key(|p| p.start_time);
        Ok(periods)
    }

    async fn delete_unavailable_period(&self, id: UnavailablePeriodId) -> RepositoryResult<()> {
        let mut data = self.data.write();
        data.unavailable_periods
            .remove(&id.value())
            .map(|_| ())
            .ok_or_else(|| {
                RepositoryError::not_found(format!("Unavailable period {} not found", id))
            })
    }
}

#[async_trait]
impl LessonRepository for LocalRepository {
    async fn create_lesson(&self, lesson: &Lesson) -> RepositoryResult<Lesson> {
        self.check_health()?;
        let mut data = self.data.write();
        let id = data.next_lesson_id;
        data.next_lesson_id += 1;
        let mut stored = lesson.clone();
        stored.id = Some(LessonId::new(id));
        data.lessons.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_lesson(&self, id: LessonId) -> RepositoryResult<Lesson> {
        let data = self.data.read();
        data.lesson_or_not_found(id).cloned()
    }

    async fn list_lessons(&self, teacher_id: Option<TeacherId>) -> RepositoryResult<Vec<Lesson>> {
        let data = self.data.read();
        let mut lessons: Vec<Lesson> = data
            .lessons
            .values()
            .filter(|l| teacher_id.map_or(true, |t| l.teacher_id == t))
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.id);
        Ok(lessons)
    }

    async fn update_lesson(&self, id: LessonId, patch: &LessonPatch) -> RepositoryResult<Lesson> {
        let mut data = self.data.write();
        let lesson = data.lesson_or_not_found(id)?.clone();
        let updated = patch.apply(&lesson);
        data.lessons.insert(id.value(), updated.clone());
        Ok(updated)
    }

    async fn delete_lesson(&self, id: LessonId) -> RepositoryResult<()> {
        let mut data = self.data.write();
        data.lessons
            .remove(&id.value())
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(format!("Lesson {} not found", id)))
    }

    async fn add_participant(&self, participant: &Participant) -> RepositoryResult<Participant> {
        let mut data = self.data.write();
        data.lesson_or_not_found(participant.lesson_id)?;

        let duplicate = data
            .participants
            .values()
            .any(|p| p.lesson_id == participant.lesson_id && p.party == participant.party);
        if duplicate {
            return Err(RepositoryError::conflict_with_context(
                "Participant already enrolled in this lesson".to_string(),
                ErrorContext::new("add_participant").with_entity("participant"),
            ));
        }

        let id = data.next_participant_id;
        data.next_participant_id += 1;
        let mut stored = participant.clone();
        stored.id = Some(ParticipantId::new(id));
        data.participants.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_participants(&self, lesson_id: LessonId) -> RepositoryResult<Vec<Participant>> {
        let data = self.data.read();
        let mut participants: Vec<Participant> = data
            .participants
            .values()
            .filter(|p| p.lesson_id == lesson_id)
            .cloned()
            .collect();
        participants.sort_by_key(|p| p.id);
        Ok(participants)
    }

    async fn set_participant_confirmed(
        &self,
        id: ParticipantId,
        confirmed: bool,
    ) -> RepositoryResult<Participant> {
        let mut data = self.data.write();
        let participant = data.participants.get_mut(&id.value()).ok_or_else(|| {
            RepositoryError::not_found(format!("Participant {} not found", id))
        })?;
        participant.is_confirmed = confirmed;
        participant.confirmation_date = confirmed.then(Utc::now);
        Ok(participant.clone())
    }

    async fn remove_participant(&self, id: ParticipantId) -> RepositoryResult<()> {
        let mut data = self.data.write();
        data.participants
            .remove(&id.value())
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(format!("Participant {} not found", id)))
    }
}

#[async_trait]
impl SessionRepository for LocalRepository {
    async fn create_session(
        &self,
        lesson_id: LessonId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        status: Option<SessionStatus>,
    ) -> RepositoryResult<Session> {
        self.check_health()?;
        if end_time <= start_time {
            return Err(RepositoryError::validation(
                "Session end must be after start",
            ));
        }

        // Scan and insert under one write guard; see the module docs.
        let mut data = self.data.write();
        let teacher_id = data.lesson_or_not_found(lesson_id)?.teacher_id;

        let window = Interval::new(start_time, end_time);
        if let Some(existing) = data.find_conflict(teacher_id, &window, None) {
            return Err(booking_conflict(teacher_id, existing));
        }

        let id = data.next_session_id;
        data.next_session_id += 1;
        let session = Session {
            id: Some(SessionId::new(id)),
            lesson_id,
            start_time,
            end_time,
            status: status.unwrap_or(SessionStatus::Scheduled),
        };
        data.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> RepositoryResult<Session> {
        let data = self.data.read();
        data.sessions
            .get(&id.value())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Session {} not found", id)))
    }

    async fn list_sessions_for_teacher(
        &self,
        teacher_id: TeacherId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<AnnotatedSession>> {
        let data = self.data.read();
        let range = Interval::new(from, to);
        let mut sessions: Vec<&Session> = data
            .sessions
            .values()
            .filter(|s| {
                let same_teacher = data
                    .lessons
                    .get(&s.lesson_id.value())
                    .is_some_and(|l| l.teacher_id == teacher_id);
                same_teacher && s.interval().overlaps(&range)
            })
            .collect();
        sessions.sort_by_key(|s| (s.start_time, s.id));
        Ok(sessions.into_iter().map(|s| data.annotate(s)).collect())
    }

    async fn update_session(
        &self,
        id: SessionId,
        patch: &SessionPatch,
    ) -> RepositoryResult<Session> {
        let mut data = self.data.write();
        let session = data
            .sessions
            .get(&id.value())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Session {} not found", id)))?;

        let updated = Session {
            start_time: patch.start_time.unwrap_or(session.start_time),
            end_time: patch.end_time.unwrap_or(session.end_time),
            status: patch.status.unwrap_or(session.status),
            ..session.clone()
        };
        if updated.end_time <= updated.start_time {
            return Err(RepositoryError::validation(
                "Session end must be after start",
            ));
        }

        if patch.moves_window(&session) && updated.status != SessionStatus::Cancelled {
            let teacher_id = data.lesson_or_not_found(updated.lesson_id)?.teacher_id;
            let window = updated.interval();
            if let Some(existing) = data.find_conflict(teacher_id, &window, Some(id)) {
                return Err(booking_conflict(teacher_id, existing).with_operation("update_session"));
            }
        }

        data.sessions.insert(id.value(), updated.clone());
        Ok(updated)
    }

    async fn delete_session(&self, id: SessionId) -> RepositoryResult<()> {
        let mut data = self.data.write();
        data.sessions
            .remove(&id.value())
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(format!("Session {} not found", id)))
    }
}

fn booking_conflict(teacher_id: TeacherId, existing: &Session) -> RepositoryError {
    RepositoryError::conflict_with_context(
        format!(
            "Teacher {} already has a session from {} to {}",
            teacher_id,
            existing.start_time.to_rfc3339(),
            existing.end_time.to_rfc3339()
        ),
        ErrorContext::new("create_session")
            .with_entity("session")
            .with_details(format!(
                "blocking_session_id={}",
                existing.id.map(|i| i.value()).unwrap_or_default()
            )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn teacher() -> TeacherId {
        TeacherId::new(100)
    }

    async fn lesson(repo: &LocalRepository) -> LessonId {
        lesson_for(repo, teacher()).await
    }

    async fn lesson_for(repo: &LocalRepository, teacher_id: TeacherId) -> LessonId {
        let lesson = Lesson {
            id: None,
            title: "Spanish B2".to_string(),
            description: None,
            lesson_type: LessonType::Individual,
            language: "es".to_string(),
            level: "B2".to_string(),
            teacher_id,
        };
        repo.create_lesson(&lesson).await.unwrap().id.unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let repo = LocalRepository::new();
        assert!(repo.health_check().await.unwrap());

        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_rule_conflicts() {
        let repo = LocalRepository::new();
        let rule = WeeklyRule::new(
            teacher(),
            1,
            DayWindow::parse("09:00", "18:00").unwrap(),
            true,
        )
        .unwrap();

        repo.create_rule(&rule).await.unwrap();
        let err = repo.create_rule(&rule).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        // The update path still works.
        let patch = WeeklyRulePatch {
            is_open: Some(false),
            ..Default::default()
        };
        let updated = repo.update_rule(teacher(), 1, &patch).await.unwrap();
        assert!(!updated.is_open);
    }

    #[tokio::test]
    async fn test_update_missing_rule_not_found() {
        let repo = LocalRepository::new();
        let err = repo
            .update_rule(teacher(), 3, &WeeklyRulePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_special_day_unique_per_date() {
        let repo = LocalRepository::new();
        let day = SpecialDay {
            id: None,
            teacher_id: teacher(),
            date: NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            window: DayWindow::parse("10:00", "14:00").unwrap(),
            is_active: true,
            booked_slots: vec![],
        };

        let stored = repo.create_special_day(&day).await.unwrap();
        assert!(stored.id.is_some());

        let err = repo.create_special_day(&day).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        // Another teacher on the same date is fine.
        let other = SpecialDay {
            teacher_id: TeacherId::new(200),
            ..day
        };
        repo.create_special_day(&other).await.unwrap();
    }

    #[tokio::test]
    async fn test_special_day_range_is_inclusive() {
        let repo = LocalRepository::new();
        for d in [10, 15, 20] {
            let day = SpecialDay {
                id: None,
                teacher_id: teacher(),
                date: NaiveDate::from_ymd_opt(2025, 3, d).unwrap(),
                window: DayWindow::parse("10:00", "14:00").unwrap(),
                is_active: true,
                booked_slots: vec![],
            };
            repo.create_special_day(&day).await.unwrap();
        }

        let days = repo
            .list_special_days(
                teacher(),
                NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_period_intersection_semantics() {
        use chrono::Datelike;
        let repo = LocalRepository::new();
        let period = UnavailablePeriod::new(teacher(), at(12, 0), at(14, 0), None).unwrap();
        repo.create_unavailable_period(&period).await.unwrap();

        // end >= from AND start <= to
        let hit = repo
            .list_unavailable_periods(teacher(), at(14, 0), at(15, 0))
            .await
            .unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].start_time.day(), 10);

        let miss = repo
            .list_unavailable_periods(teacher(), at(14, 1), at(15, 0))
            .await
            .unwrap();
        assert!(miss.is_empty());
    }

    #[tokio::test]
    async fn test_create_session_conflict_and_touching() {
        let repo = LocalRepository::new();
        let lesson_id = lesson_for(&repo, teacher()).await;

        repo.create_session(lesson_id, at(14, 0), at(15, 0), None)
            .await
            .unwrap();

        // Overlapping window is rejected.
        let err = repo
            .create_session(lesson_id, at(14, 30), at(15, 30), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        // Touching window is allowed.
        repo.create_session(lesson_id, at(15, 0), at(16, 0), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_conflict_is_scoped_to_teacher() {
        let repo = LocalRepository::new();
        let a = lesson_for(&repo, TeacherId::new(1)).await;
        let b = lesson_for(&repo, TeacherId::new(2)).await;

        repo.create_session(a, at(14, 0), at(15, 0), None).await.unwrap();
        // A different teacher can hold the same window.
        repo.create_session(b, at(14, 0), at(15, 0), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_session_does_not_block() {
        let repo = LocalRepository::new();
        let lesson_id = lesson(&repo).await;

        let s = repo
            .create_session(lesson_id, at(14, 0), at(15, 0), None)
            .await
            .unwrap();
        repo.update_session(
            s.id.unwrap(),
            &SessionPatch {
                status: Some(SessionStatus::Cancelled),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        repo.create_session(lesson_id, at(14, 0), at(15, 0), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_session_revalidates_moved_window() {
        let repo = LocalRepository::new();
        let lesson_id = lesson(&repo).await;

        repo.create_session(lesson_id, at(10, 0), at(11, 0), None)
            .await
            .unwrap();
        let s = repo
            .create_session(lesson_id, at(12, 0), at(13, 0), None)
            .await
            .unwrap();

        let err = repo
            .update_session(
                s.id.unwrap(),
                &SessionPatch {
                    start_time: Some(at(10, 30)),
                    end_time: Some(at(11, 30)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        // Status-only update on the same window passes.
        let updated = repo
            .update_session(
                s.id.unwrap(),
                &SessionPatch {
                    status: Some(SessionStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn test_create_session_unknown_lesson() {
        let repo = LocalRepository::new();
        let err = repo
            .create_session(LessonId::new(999), at(10, 0), at(11, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_session_annotation_join() {
        let repo = LocalRepository::new();
        let lesson_id = lesson(&repo).await;

        repo.create_session(lesson_id, at(9, 0), at(10, 0), None)
            .await
            .unwrap();

        let unbooked = repo
            .list_sessions_for_teacher(teacher(), at(0, 0), at(23, 0))
            .await
            .unwrap();
        assert_eq!(unbooked.len(), 1);
        assert!(!unbooked[0].booked);
        assert!(unbooked[0].booked_by.is_none());

        let participant = Participant::new(lesson_id, BookingParty::Group(GroupId::new(7)));
        repo.add_participant(&participant).await.unwrap();

        let booked = repo
            .list_sessions_for_teacher(teacher(), at(0, 0), at(23, 0))
            .await
            .unwrap();
        assert!(booked[0].booked);
        assert_eq!(booked[0].booked_by, Some(BookingParty::Group(GroupId::new(7))));
        assert_eq!(booked[0].lesson.as_ref().unwrap().title, "Spanish B2");
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_conflicts() {
        let repo = LocalRepository::new();
        let lesson_id = lesson(&repo).await;
        let participant = Participant::new(lesson_id, BookingParty::Group(GroupId::new(7)));

        repo.add_participant(&participant).await.unwrap();
        let err = repo.add_participant(&participant).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_delete_session_then_rebook() {
        let repo = LocalRepository::new();
        let lesson_id = lesson(&repo).await;

        let s = repo
            .create_session(lesson_id, at(14, 0), at(15, 0), None)
            .await
            .unwrap();
        repo.delete_session(s.id.unwrap()).await.unwrap();

        repo.create_session(lesson_id, at(14, 0), at(15, 0), None)
            .await
            .unwrap();

        let err = repo.delete_session(SessionId::new(999)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_timezone_validation() {
        let repo = LocalRepository::new();
        assert_eq!(
            repo.get_settings(teacher()).await.unwrap().timezone,
            "UTC"
        );

        repo.set_timezone(teacher(), "+03:00").await.unwrap();
        assert_eq!(
            repo.get_settings(teacher()).await.unwrap().timezone,
            "+03:00"
        );

        let err = repo.set_timezone(teacher(), "Mars/Olympus").await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }
}
