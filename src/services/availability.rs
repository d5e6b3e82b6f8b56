//! Availability merge and free-slot generation.
//!
//! The merge precedence is: active special day replaces the weekday rule
//! entirely; an absent or closed rule means a closed day. Free slots are
//! what remains of the capacity window after subtracting blackout periods
//! and booked sessions, quantized into fixed one-hour increments.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::api::{SessionStatus, SpecialDay, TeacherId, WeeklyRule};
use crate::db::repository::{
    ExceptionRepository, FullRepository, RepositoryError, RepositoryResult, SessionRepository,
    WeeklyRuleRepository,
};
use crate::models::time::{
    day_bounds, parse_utc_offset, subtract_busy, weekday_index, DayWindow, Interval,
};

/// Offered slot length.
pub const SLOT_MINUTES: i64 = 60;

/// A quantized, offerable sub-interval of free time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
    pub available: bool,
}

/// Resolved capacity for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCapacity {
    pub is_open: bool,
    pub window: Option<DayWindow>,
}

impl DayCapacity {
    fn closed() -> Self {
        DayCapacity {
            is_open: false,
            window: None,
        }
    }
}

/// Merge the override layers into one per-day capacity record.
///
/// An active special day wins and forces the day open; otherwise the weekly
/// rule for the date's weekday applies; no rule means closed. Inactive
/// special days are ignored.
pub fn resolve_day_capacity(
    date: NaiveDate,
    rules: &[WeeklyRule],
    special_days: &[SpecialDay],
) -> DayCapacity {
    if let Some(special) = special_days.iter().find(|d| d.date == date && d.is_active) {
        return DayCapacity {
            is_open: true,
            window: Some(special.window),
        };
    }

    let weekday = weekday_index(date);
    match rules.iter().find(|r| r.weekday == weekday) {
        Some(rule) => DayCapacity {
            is_open: rule.is_open,
            window: Some(rule.window),
        },
        None => DayCapacity::closed(),
    }
}

/// Quantize free intervals into fixed-size slots.
///
/// Each emitted slot lies entirely inside one free interval; a remainder
/// shorter than the slot length yields nothing.
pub fn quantize_slots(free: &[Interval]) -> Vec<TimeSlot> {
    let step = Duration::minutes(SLOT_MINUTES);
    let mut slots = Vec::new();
    for interval in free {
        let mut cursor = interval.start;
        while cursor + step <= interval.end {
            slots.push(TimeSlot {
                start: cursor,
                end: cursor + step,
                available: true,
            });
            cursor += step;
        }
    }
    slots
}

/// Enumerate the teacher's free bookable slots for one date.
///
/// Closed days return an empty list, not an error.
pub async fn compute_free_slots(
    repo: &dyn FullRepository,
    teacher_id: TeacherId,
    date: NaiveDate,
) -> RepositoryResult<Vec<TimeSlot>> {
    let settings = repo.get_settings(teacher_id).await?;
    let offset = parse_utc_offset(&settings.timezone).map_err(RepositoryError::validation)?;

    let special_days = repo.list_special_days(teacher_id, date, date).await?;
    let rules = match repo.get_rule(teacher_id, weekday_index(date)).await? {
        Some(rule) => vec![rule],
        None => Vec::new(),
    };

    let capacity = resolve_day_capacity(date, &rules, &special_days);
    let window = match (capacity.is_open, capacity.window) {
        (true, Some(window)) => window,
        _ => return Ok(Vec::new()),
    };

    let base = window.to_interval(date, offset);
    if base.is_empty() {
        return Ok(Vec::new());
    }

    let day = day_bounds(date, offset);
    let mut busy: Vec<Interval> = repo
        .list_unavailable_periods(teacher_id, day.start, day.end)
        .await?
        .iter()
        .map(|p| p.interval())
        .collect();
    busy.extend(
        repo.list_sessions_for_teacher(teacher_id, day.start, day.end)
            .await?
            .iter()
            .filter(|s| s.session.status != SessionStatus::Cancelled)
            .map(|s| s.session.interval()),
    );

    let free = subtract_busy(vec![base], &busy);
    log::debug!(
        "Teacher {} has {} free interval(s) on {}",
        teacher_id,
        free.len(),
        date
    );

    Ok(quantize_slots(&free))
}

#[cfg(test)]
#[path = "availability_tests.rs"]
mod availability_tests;
