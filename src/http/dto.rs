//! Data Transfer Objects for the HTTP API.
//!
//! These DTOs are used for request/response serialization in the REST API.
//! Calendar and slot types are re-exported from the service layer since
//! they already derive Serialize/Deserialize.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Re-export existing types that are already serializable
pub use crate::api::{
    AnnotatedSession, BookingParty, CalendarDay, CalendarEntry, CalendarEntryStatus,
    CalendarSettings, Lesson, LessonSummary, SpecialDay, TeacherCalendar, TimeSlot,
    UnavailablePeriod, WallClock, WeeklyRule,
};
use crate::api::{GroupId, LessonId, Participant, Session, SessionStatus, StudentId};

fn default_true() -> bool {
    true
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Store connection status
    pub database: String,
}

// =============================================================================
// Weekly rules & settings
// =============================================================================

/// Request body for creating a weekly rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    /// Monday = 0 .. Sunday = 6
    pub weekday: u8,
    pub window_start: WallClock,
    pub window_end: WallClock,
    #[serde(default = "default_true")]
    pub is_open: bool,
}

/// Request body for partially updating a weekly rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRuleRequest {
    #[serde(default)]
    pub window_start: Option<WallClock>,
    #[serde(default)]
    pub window_end: Option<WallClock>,
    #[serde(default)]
    pub is_open: Option<bool>,
}

/// Weekly rule as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResponse {
    pub teacher_id: i64,
    pub weekday: u8,
    pub window_start: WallClock,
    pub window_end: WallClock,
    pub is_open: bool,
}

impl From<WeeklyRule> for RuleResponse {
    fn from(rule: WeeklyRule) -> Self {
        RuleResponse {
            teacher_id: rule.teacher_id.value(),
            weekday: rule.weekday,
            window_start: rule.window.start,
            window_end: rule.window.end,
            is_open: rule.is_open,
        }
    }
}

/// Request body for setting the teacher's timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimezoneRequest {
    pub timezone: String,
}

// =============================================================================
// Special days & unavailable periods
// =============================================================================

/// Request body for creating a special day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSpecialDayRequest {
    pub date: NaiveDate,
    pub window_start: WallClock,
    pub window_end: WallClock,
    #[serde(default)]
    pub booked_slots: Vec<String>,
}

/// Request body for partially updating a special day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSpecialDayRequest {
    #[serde(default)]
    pub window_start: Option<WallClock>,
    #[serde(default)]
    pub window_end: Option<WallClock>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub booked_slots: Option<Vec<String>>,
}

/// Special day as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialDayResponse {
    pub id: i64,
    pub teacher_id: i64,
    pub date: NaiveDate,
    pub window_start: WallClock,
    pub window_end: WallClock,
    pub is_active: bool,
    pub booked_slots: Vec<String>,
}

impl From<SpecialDay> for SpecialDayResponse {
    fn from(day: SpecialDay) -> Self {
        SpecialDayResponse {
            id: day.id.map(|i| i.value()).unwrap_or_default(),
            teacher_id: day.teacher_id.value(),
            date: day.date,
            window_start: day.window.start,
            window_end: day.window.end,
            is_active: day.is_active,
            booked_slots: day.booked_slots,
        }
    }
}

/// Request body for creating a blackout period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUnavailableRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Blackout period as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableResponse {
    pub id: i64,
    pub teacher_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reason: Option<String>,
}

impl From<UnavailablePeriod> for UnavailableResponse {
    fn from(period: UnavailablePeriod) -> Self {
        UnavailableResponse {
            id: period.id.map(|i| i.value()).unwrap_or_default(),
            teacher_id: period.teacher_id.value(),
            start_time: period.start_time,
            end_time: period.end_time,
            reason: period.reason,
        }
    }
}

/// Query parameters for date-range listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Query parameters for instant-range listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantRangeQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// =============================================================================
// Free slots & calendar
// =============================================================================

/// Query parameters for the free-slots endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeSlotsQuery {
    pub date: NaiveDate,
}

/// Free slots for one teacher and date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeSlotsResponse {
    pub teacher_id: i64,
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

/// Request body for the full-schedule endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullScheduleRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// =============================================================================
// Lessons, sessions, participants
// =============================================================================

/// Request body for creating a lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLessonRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub lesson_type: crate::api::LessonType,
    pub language: String,
    pub level: String,
    pub teacher_id: i64,
}

/// Request body for partially updating a lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLessonRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lesson_type: Option<crate::api::LessonType>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

/// Query parameters for the lessons listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonsQuery {
    #[serde(default)]
    pub teacher_id: Option<i64>,
}

/// Request body for creating a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub lesson_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

/// Request body for partially updating a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

/// Request body for listing a teacher's sessions over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherSessionsRequest {
    pub teacher_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Session as returned by the API, with its booking annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: i64,
    pub lesson_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub booked: bool,
    pub booked_by: Option<BookingParty>,
    pub lesson: Option<LessonSummary>,
}

impl From<AnnotatedSession> for SessionResponse {
    fn from(annotated: AnnotatedSession) -> Self {
        SessionResponse {
            id: annotated.session.id.map(|i| i.value()).unwrap_or_default(),
            lesson_id: annotated.session.lesson_id.value(),
            start_time: annotated.session.start_time,
            end_time: annotated.session.end_time,
            status: annotated.session.status,
            booked: annotated.booked,
            booked_by: annotated.booked_by,
            lesson: annotated.lesson,
        }
    }
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        SessionResponse {
            id: session.id.map(|i| i.value()).unwrap_or_default(),
            lesson_id: session.lesson_id.value(),
            start_time: session.start_time,
            end_time: session.end_time,
            status: session.status,
            booked: false,
            booked_by: None,
            lesson: None,
        }
    }
}

/// Request body for enrolling a participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub lesson_id: i64,
    #[serde(default)]
    pub student_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub group_id: Option<i64>,
}

impl EnrollmentRequest {
    pub fn into_participant(self) -> Result<Participant, String> {
        Participant::from_ids(
            LessonId::new(self.lesson_id),
            self.student_id.map(StudentId::new),
            self.group_id.map(GroupId::new),
        )
    }
}

/// Query parameter for confirming an enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmQuery {
    pub confirmed: bool,
}

/// Participant as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub id: i64,
    pub lesson_id: i64,
    pub student_id: Option<String>,
    pub group_id: Option<i64>,
    pub is_confirmed: bool,
    pub confirmation_date: Option<DateTime<Utc>>,
}

impl From<Participant> for ParticipantResponse {
    fn from(p: Participant) -> Self {
        let (student_id, group_id) = match p.party {
            BookingParty::Student(s) => (Some(s.to_string()), None),
            BookingParty::Group(g) => (None, Some(g.value())),
        };
        ParticipantResponse {
            id: p.id.map(|i| i.value()).unwrap_or_default(),
            lesson_id: p.lesson_id.value(),
            student_id,
            group_id,
            is_confirmed: p.is_confirmed,
            confirmation_date: p.confirmation_date,
        }
    }
}

/// Generic deletion acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
}

impl DeleteResponse {
    pub fn deleted() -> Self {
        DeleteResponse {
            status: "deleted".to_string(),
        }
    }
}

/// Lesson as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub lesson_type: crate::api::LessonType,
    pub language: String,
    pub level: String,
    pub teacher_id: i64,
}

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        LessonResponse {
            id: lesson.id.map(|i| i.value()).unwrap_or_default(),
            title: lesson.title,
            description: lesson.description,
            lesson_type: lesson.lesson_type,
            language: lesson.language,
            level: lesson.level,
            teacher_id: lesson.teacher_id.value(),
        }
    }
}
