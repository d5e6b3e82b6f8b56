//! Lesson domain objects: lesson definitions, bookable sessions, and
//! participant enrollments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{GroupId, LessonId, ParticipantId, SessionId, StudentId, TeacherId};
use crate::models::time::Interval;

/// Lesson format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonType {
    Individual,
    Group,
    Trial,
}

impl LessonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonType::Individual => "INDIVIDUAL",
            LessonType::Group => "GROUP",
            LessonType::Trial => "TRIAL",
        }
    }
}

impl std::str::FromStr for LessonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INDIVIDUAL" => Ok(LessonType::Individual),
            "GROUP" => Ok(LessonType::Group),
            "TRIAL" => Ok(LessonType::Trial),
            other => Err(format!("Unknown lesson type '{}'", other)),
        }
    }
}

/// A lesson definition owned by one teacher. Sessions instantiate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Option<LessonId>,
    pub title: String,
    pub description: Option<String>,
    pub lesson_type: LessonType,
    pub language: String,
    pub level: String,
    pub teacher_id: TeacherId,
}

/// Partial update for a lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lesson_type: Option<LessonType>,
    pub language: Option<String>,
    pub level: Option<String>,
}

impl LessonPatch {
    pub fn apply(&self, lesson: &Lesson) -> Lesson {
        Lesson {
            title: self.title.clone().unwrap_or_else(|| lesson.title.clone()),
            description: self.description.clone().or_else(|| lesson.description.clone()),
            lesson_type: self.lesson_type.unwrap_or(lesson.lesson_type),
            language: self
                .language
                .clone()
                .unwrap_or_else(|| lesson.language.clone()),
            level: self.level.clone().unwrap_or_else(|| lesson.level.clone()),
            ..lesson.clone()
        }
    }
}

/// Compact lesson projection attached to session listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub id: LessonId,
    pub title: String,
    pub lesson_type: LessonType,
    pub language: String,
    pub level: String,
    pub teacher_id: TeacherId,
}

impl From<&Lesson> for LessonSummary {
    fn from(lesson: &Lesson) -> Self {
        LessonSummary {
            id: lesson.id.unwrap_or(LessonId(0)),
            title: lesson.title.clone(),
            lesson_type: lesson.lesson_type,
            language: lesson.language.clone(),
            level: lesson.level.clone(),
            teacher_id: lesson.teacher_id,
        }
    }
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "SCHEDULED",
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Cancelled => "CANCELLED",
        }
    }

    /// Lifecycle transitions: forward through the state machine, with
    /// cancellation allowed from any non-terminal state.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Scheduled, InProgress) | (Scheduled, Cancelled) => true,
            (InProgress, Completed) | (InProgress, Cancelled) => true,
            _ => false,
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(SessionStatus::Scheduled),
            "IN_PROGRESS" => Ok(SessionStatus::InProgress),
            "COMPLETED" => Ok(SessionStatus::Completed),
            "CANCELLED" => Ok(SessionStatus::Cancelled),
            other => Err(format!("Unknown session status '{}'", other)),
        }
    }
}

/// One concrete bookable/booked time instance of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<SessionId>,
    pub lesson_id: LessonId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
}

impl Session {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }

    /// Whether this session blocks the given window for its teacher.
    ///
    /// Cancelled sessions never block; touching endpoints do not conflict.
    pub fn blocks(&self, window: &Interval) -> bool {
        self.status != SessionStatus::Cancelled && self.interval().overlaps(window)
    }
}

/// Partial update for a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<SessionStatus>,
}

impl SessionPatch {
    /// True when the patch moves the session in time.
    pub fn moves_window(&self, session: &Session) -> bool {
        self.start_time.is_some_and(|s| s != session.start_time)
            || self.end_time.is_some_and(|e| e != session.end_time)
    }
}

/// The party a lesson was booked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum BookingParty {
    Student(StudentId),
    Group(GroupId),
}

/// Enrollment of a student or group into a lesson.
///
/// Exactly one of the two party kinds; enforced at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Option<ParticipantId>,
    pub lesson_id: LessonId,
    pub party: BookingParty,
    pub is_confirmed: bool,
    pub confirmation_date: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn new(lesson_id: LessonId, party: BookingParty) -> Self {
        Participant {
            id: None,
            lesson_id,
            party,
            is_confirmed: false,
            confirmation_date: None,
        }
    }

    /// Build from the optional pair shape used at the API boundary.
    pub fn from_ids(
        lesson_id: LessonId,
        student_id: Option<StudentId>,
        group_id: Option<GroupId>,
    ) -> Result<Self, String> {
        let party = match (student_id, group_id) {
            (Some(s), None) => BookingParty::Student(s),
            (None, Some(g)) => BookingParty::Group(g),
            (None, None) => return Err("Provide student_id or group_id".to_string()),
            (Some(_), Some(_)) => {
                return Err("student_id and group_id are mutually exclusive".to_string())
            }
        };
        Ok(Participant::new(lesson_id, party))
    }
}

/// A session joined with its booking annotation and lesson summary.
///
/// `booked`/`booked_by` are derived from participants at query time, not
/// stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedSession {
    pub session: Session,
    pub booked: bool,
    pub booked_by: Option<BookingParty>,
    pub lesson: Option<LessonSummary>,
}
