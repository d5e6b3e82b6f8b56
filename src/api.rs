//! Public API surface for the calendar backend.
//!
//! This file consolidates the strongly-typed identifiers and re-exports the
//! domain and service types consumed by the HTTP layer. All types derive
//! Serialize/Deserialize for JSON serialization.

pub use crate::models::calendar::{
    CalendarSettings, SpecialDay, SpecialDayPatch, UnavailablePeriod, WeeklyRule, WeeklyRulePatch,
};
pub use crate::models::lesson::{
    AnnotatedSession, BookingParty, Lesson, LessonPatch, LessonSummary, LessonType, Participant,
    Session, SessionPatch, SessionStatus,
};
pub use crate::models::time::{DayWindow, Interval, WallClock};
pub use crate::services::availability::TimeSlot;
pub use crate::services::calendar::{
    BookingPartyView, CalendarDay, CalendarEntry, CalendarEntryStatus, TeacherCalendar,
};

use serde::{Deserialize, Serialize};

/// Teacher identifier (the platform's numeric account id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeacherId(pub i64);

/// Lesson identifier (database primary key).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LessonId(pub i64);

/// Lesson session identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub i64);

/// Special day identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpecialDayId(pub i64);

/// Unavailable period identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnavailablePeriodId(pub i64);

/// Lesson participant identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub i64);

/// Student group identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub i64);

/// Student identifier (UUID issued by the students service).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub uuid::Uuid);

macro_rules! impl_i64_id {
    ($($name:ident),* $(,)?) => {
        $(
            impl $name {
                pub fn new(value: i64) -> Self {
                    $name(value)
                }

                pub fn value(&self) -> i64 {
                    self.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<$name> for i64 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )*
    };
}

impl_i64_id!(
    TeacherId,
    LessonId,
    SessionId,
    SpecialDayId,
    UnavailablePeriodId,
    ParticipantId,
    GroupId,
);

impl StudentId {
    pub fn new(value: uuid::Uuid) -> Self {
        StudentId(value)
    }

    pub fn value(&self) -> uuid::Uuid {
        self.0
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = TeacherId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_ids_serialize_as_bare_numbers() {
        let id = SessionId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
    }

    #[test]
    fn test_student_id_display() {
        let raw = uuid::Uuid::nil();
        let id = StudentId::new(raw);
        assert_eq!(id.to_string(), raw.to_string());
    }
}
