//! Row structs and conversions between database rows and domain objects.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use std::str::FromStr;

use super::schema::{
    calendar_settings, lesson_participants, lesson_sessions, lessons, special_days,
    unavailable_periods, weekly_rules,
};
use crate::api::*;
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::time::DayWindow;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = weekly_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // timestamps are database bookkeeping only
pub struct WeeklyRuleRow {
    pub id: i64,
    pub teacher_id: i64,
    pub weekday: i16,
    pub window_start: String,
    pub window_end: String,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = weekly_rules)]
pub struct NewWeeklyRuleRow {
    pub teacher_id: i64,
    pub weekday: i16,
    pub window_start: String,
    pub window_end: String,
    pub is_open: bool,
}

impl From<&WeeklyRule> for NewWeeklyRuleRow {
    fn from(rule: &WeeklyRule) -> Self {
        NewWeeklyRuleRow {
            teacher_id: rule.teacher_id.value(),
            weekday: rule.weekday as i16,
            window_start: rule.window.start.to_string(),
            window_end: rule.window.end.to_string(),
            is_open: rule.is_open,
        }
    }
}

impl TryFrom<WeeklyRuleRow> for WeeklyRule {
    type Error = RepositoryError;

    fn try_from(row: WeeklyRuleRow) -> RepositoryResult<Self> {
        let window = DayWindow::parse(&row.window_start, &row.window_end)
            .map_err(RepositoryError::internal)?;
        WeeklyRule::new(
            TeacherId::new(row.teacher_id),
            row.weekday as u8,
            window,
            row.is_open,
        )
        .map_err(RepositoryError::internal)
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = calendar_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CalendarSettingsRow {
    pub teacher_id: i64,
    pub timezone: String,
}

impl From<CalendarSettingsRow> for CalendarSettings {
    fn from(row: CalendarSettingsRow) -> Self {
        CalendarSettings {
            teacher_id: TeacherId::new(row.teacher_id),
            timezone: row.timezone,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = special_days)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct SpecialDayRow {
    pub id: i64,
    pub teacher_id: i64,
    pub day: NaiveDate,
    pub window_start: String,
    pub window_end: String,
    pub is_active: bool,
    pub booked_slots: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = special_days)]
pub struct NewSpecialDayRow {
    pub teacher_id: i64,
    pub day: NaiveDate,
    pub window_start: String,
    pub window_end: String,
    pub is_active: bool,
    pub booked_slots: Value,
}

impl From<&SpecialDay> for NewSpecialDayRow {
    fn from(day: &SpecialDay) -> Self {
        NewSpecialDayRow {
            teacher_id: day.teacher_id.value(),
            day: day.date,
            window_start: day.window.start.to_string(),
            window_end: day.window.end.to_string(),
            is_active: day.is_active,
            booked_slots: serde_json::to_value(&day.booked_slots)
                .unwrap_or_else(|_| Value::Array(vec![])),
        }
    }
}

impl TryFrom<SpecialDayRow> for SpecialDay {
    type Error = RepositoryError;

    fn try_from(row: SpecialDayRow) -> RepositoryResult<Self> {
        let window = DayWindow::parse(&row.window_start, &row.window_end)
            .map_err(RepositoryError::internal)?;
        let booked_slots: Vec<String> = serde_json::from_value(row.booked_slots)
            .map_err(|e| RepositoryError::internal(format!("Bad booked_slots JSON: {}", e)))?;
        Ok(SpecialDay {
            id: Some(SpecialDayId::new(row.id)),
            teacher_id: TeacherId::new(row.teacher_id),
            date: row.day,
            window,
            is_active: row.is_active,
            booked_slots,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = unavailable_periods)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct UnavailablePeriodRow {
    pub id: i64,
    pub teacher_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = unavailable_periods)]
pub struct NewUnavailablePeriodRow {
    pub teacher_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reason: Option<String>,
}

impl From<&UnavailablePeriod> for NewUnavailablePeriodRow {
    fn from(period: &UnavailablePeriod) -> Self {
        NewUnavailablePeriodRow {
            teacher_id: period.teacher_id.value(),
            start_time: period.start_time,
            end_time: period.end_time,
            reason: period.reason.clone(),
        }
    }
}

impl From<UnavailablePeriodRow> for UnavailablePeriod {
    fn from(row: UnavailablePeriodRow) -> Self {
        UnavailablePeriod {
            id: Some(UnavailablePeriodId::new(row.id)),
            teacher_id: TeacherId::new(row.teacher_id),
            start_time: row.start_time,
            end_time: row.end_time,
            reason: row.reason,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lessons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LessonRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub lesson_type: String,
    pub language: String,
    pub level: String,
    pub teacher_id: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lessons)]
pub struct NewLessonRow {
    pub title: String,
    pub description: Option<String>,
    pub lesson_type: String,
    pub language: String,
    pub level: String,
    pub teacher_id: i64,
}

impl From<&Lesson> for NewLessonRow {
    fn from(lesson: &Lesson) -> Self {
        NewLessonRow {
            title: lesson.title.clone(),
            description: lesson.description.clone(),
            lesson_type: lesson.lesson_type.as_str().to_string(),
            language: lesson.language.clone(),
            level: lesson.level.clone(),
            teacher_id: lesson.teacher_id.value(),
        }
    }
}

impl TryFrom<LessonRow> for Lesson {
    type Error = RepositoryError;

    fn try_from(row: LessonRow) -> RepositoryResult<Self> {
        let lesson_type =
            LessonType::from_str(&row.lesson_type).map_err(RepositoryError::internal)?;
        Ok(Lesson {
            id: Some(LessonId::new(row.id)),
            title: row.title,
            description: row.description,
            lesson_type,
            language: row.language,
            level: row.level,
            teacher_id: TeacherId::new(row.teacher_id),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lesson_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct SessionRow {
    pub id: i64,
    pub lesson_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lesson_sessions)]
pub struct NewSessionRow {
    pub lesson_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
}

impl TryFrom<SessionRow> for Session {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> RepositoryResult<Self> {
        let status = SessionStatus::from_str(&row.status).map_err(RepositoryError::internal)?;
        Ok(Session {
            id: Some(SessionId::new(row.id)),
            lesson_id: LessonId::new(row.lesson_id),
            start_time: row.start_time,
            end_time: row.end_time,
            status,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lesson_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ParticipantRow {
    pub id: i64,
    pub lesson_id: i64,
    pub student_id: Option<uuid::Uuid>,
    pub group_id: Option<i64>,
    pub is_confirmed: bool,
    pub confirmation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lesson_participants)]
pub struct NewParticipantRow {
    pub lesson_id: i64,
    pub student_id: Option<uuid::Uuid>,
    pub group_id: Option<i64>,
    pub is_confirmed: bool,
    pub confirmation_date: Option<DateTime<Utc>>,
}

impl From<&Participant> for NewParticipantRow {
    fn from(p: &Participant) -> Self {
        let (student_id, group_id) = match p.party {
            BookingParty::Student(s) => (Some(s.value()), None),
            BookingParty::Group(g) => (None, Some(g.value())),
        };
        NewParticipantRow {
            lesson_id: p.lesson_id.value(),
            student_id,
            group_id,
            is_confirmed: p.is_confirmed,
            confirmation_date: p.confirmation_date,
        }
    }
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = RepositoryError;

    fn try_from(row: ParticipantRow) -> RepositoryResult<Self> {
        let party = match (row.student_id, row.group_id) {
            (Some(s), None) => BookingParty::Student(StudentId::new(s)),
            (None, Some(g)) => BookingParty::Group(GroupId::new(g)),
            _ => {
                return Err(RepositoryError::internal(format!(
                    "Participant {} has inconsistent party columns",
                    row.id
                )))
            }
        };
        Ok(Participant {
            id: Some(ParticipantId::new(row.id)),
            lesson_id: LessonId::new(row.lesson_id),
            party,
            is_confirmed: row.is_confirmed,
            confirmation_date: row.confirmation_date,
        })
    }
}
