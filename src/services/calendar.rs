//! Full-schedule aggregation.
//!
//! Builds the per-day calendar view a client renders: one record per day of
//! the requested range with the day's open/closed state, its displayed
//! window, and the booked entries (real sessions plus the special day's
//! pre-declared slot strings). Booking-party names are resolved through the
//! external identity directory as best-effort enrichment.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::{
    AnnotatedSession, BookingParty, LessonId, SessionId, SessionStatus, TeacherId, WallClock,
};
use crate::db::repository::{
    ExceptionRepository, FullRepository, RepositoryError, RepositoryResult, SessionRepository,
    WeeklyRuleRepository,
};
use crate::models::time::{day_bounds, local_date, parse_utc_offset, DayWindow};
use crate::services::availability::resolve_day_capacity;
use crate::services::directory::IdentityDirectory;

/// Display status of a calendar entry.
///
/// Real sessions carry their lifecycle status; the special day's
/// pre-declared slot strings surface as `Unavailable` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarEntryStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Unavailable,
}

impl From<SessionStatus> for CalendarEntryStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Scheduled => CalendarEntryStatus::Scheduled,
            SessionStatus::InProgress => CalendarEntryStatus::InProgress,
            SessionStatus::Completed => CalendarEntryStatus::Completed,
            SessionStatus::Cancelled => CalendarEntryStatus::Cancelled,
        }
    }
}

/// A booking party together with its resolved display name.
///
/// The name is best-effort: an unknown party renders as an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPartyView {
    #[serde(flatten)]
    pub party: BookingParty,
    pub display_name: String,
}

/// One entry in a calendar day: a session or a placeholder slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: CalendarEntryStatus,
    pub session_id: Option<SessionId>,
    pub lesson_id: Option<LessonId>,
    pub booked: bool,
    pub booked_by: Option<BookingPartyView>,
}

/// One day of the aggregated calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_active: bool,
    pub window_start: Option<WallClock>,
    pub window_end: Option<WallClock>,
    pub entries: Vec<CalendarEntry>,
}

/// The aggregated calendar for one teacher over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherCalendar {
    pub teacher_id: TeacherId,
    pub days: Vec<CalendarDay>,
}

/// Assemble the per-day calendar for the inclusive date range.
///
/// Day skeleton precedence follows [`resolve_day_capacity`]; any blackout
/// period whose date span covers a day forces it inactive without erasing
/// the displayed window bounds. Days are strictly ascending; entries within
/// a day ascend by start time (stable sort).
pub async fn full_schedule(
    repo: &dyn FullRepository,
    directory: &dyn IdentityDirectory,
    teacher_id: TeacherId,
    start: NaiveDate,
    end: NaiveDate,
) -> RepositoryResult<TeacherCalendar> {
    if end < start {
        return Err(RepositoryError::validation(format!(
            "Date range inverted: {} is after {}",
            start, end
        )));
    }

    let settings = repo.get_settings(teacher_id).await?;
    let offset = parse_utc_offset(&settings.timezone).map_err(RepositoryError::validation)?;

    let range_start = day_bounds(start, offset).start;
    let range_end = day_bounds(end, offset).end;

    let rules = repo.list_rules(teacher_id).await?;
    let special_days = repo.list_special_days(teacher_id, start, end).await?;
    let blackouts = repo
        .list_unavailable_periods(teacher_id, range_start, range_end)
        .await?;
    let sessions = repo
        .list_sessions_for_teacher(teacher_id, range_start, range_end)
        .await?;

    // Group sessions by their local calendar date; repository order (start
    // time, then id) is preserved within each bucket.
    let mut sessions_by_date: HashMap<NaiveDate, Vec<AnnotatedSession>> = HashMap::new();
    for session in sessions {
        let date = local_date(session.session.start_time, offset);
        sessions_by_date.entry(date).or_default().push(session);
    }

    let mut days = Vec::new();
    let mut date = start;
    while date <= end {
        let capacity = resolve_day_capacity(date, &rules, &special_days);
        let mut is_active = capacity.is_open;

        // Blackout always wins over open hours, but the window stays
        // visible so the client can still render the day's shape.
        let covered = blackouts.iter().any(|p| {
            local_date(p.start_time, offset) <= date && date <= local_date(p.end_time, offset)
        });
        if covered {
            is_active = false;
        }

        let mut entries = Vec::new();
        if let Some(special) = special_days.iter().find(|d| d.date == date && d.is_active) {
            for slot in &special.booked_slots {
                match DayWindow::parse_range(slot) {
                    Ok(window) => {
                        let interval = window.to_interval(date, offset);
                        entries.push(CalendarEntry {
                            start_time: interval.start,
                            end_time: interval.end,
                            status: CalendarEntryStatus::Unavailable,
                            session_id: None,
                            lesson_id: None,
                            booked: false,
                            booked_by: None,
                        });
                    }
                    Err(e) => {
                        log::warn!(
                            "Skipping malformed slot '{}' on special day {}: {}",
                            slot,
                            date,
                            e
                        );
                    }
                }
            }
        }

        for annotated in sessions_by_date.get(&date).into_iter().flatten() {
            let booked_by = match annotated.booked_by {
                Some(party) => {
                    let display_name = directory
                        .resolve_display_name(&party)
                        .await
                        .unwrap_or_default();
                    Some(BookingPartyView {
                        party,
                        display_name,
                    })
                }
                None => None,
            };
            entries.push(CalendarEntry {
                start_time: annotated.session.start_time,
                end_time: annotated.session.end_time,
                status: annotated.session.status.into(),
                session_id: annotated.session.id,
                lesson_id: Some(annotated.session.lesson_id),
                booked: annotated.booked,
                booked_by,
            });
        }

        entries.sort_by_key(|e| e.start_time);

        days.push(CalendarDay {
            date,
            is_active,
            window_start: capacity.window.map(|w| w.start),
            window_end: capacity.window.map(|w| w.end),
            entries,
        });

        date += Duration::days(1);
    }

    Ok(TeacherCalendar { teacher_id, days })
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod calendar_tests;
