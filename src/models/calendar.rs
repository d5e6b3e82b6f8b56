//! Calendar domain objects: recurring weekly rules, date-specific special
//! days, blackout periods, and per-teacher settings.
//!
//! These are validated value objects; malformed time strings or inverted
//! windows are rejected at construction so the stores and services never
//! see them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{SpecialDayId, TeacherId, UnavailablePeriodId};
use crate::models::time::{DayWindow, Interval, WallClock};

/// Default open/closed window for one weekday, repeating indefinitely.
///
/// At most one rule exists per (teacher, weekday); an absent rule means the
/// day is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyRule {
    pub teacher_id: TeacherId,
    /// Monday = 0 .. Sunday = 6.
    pub weekday: u8,
    pub window: DayWindow,
    pub is_open: bool,
}

impl WeeklyRule {
    pub fn new(
        teacher_id: TeacherId,
        weekday: u8,
        window: DayWindow,
        is_open: bool,
    ) -> Result<Self, String> {
        if weekday > 6 {
            return Err(format!("Weekday {} out of range 0..=6", weekday));
        }
        Ok(WeeklyRule {
            teacher_id,
            weekday,
            window,
            is_open,
        })
    }
}

/// Partial update for a weekly rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyRulePatch {
    pub window_start: Option<WallClock>,
    pub window_end: Option<WallClock>,
    pub is_open: Option<bool>,
}

impl WeeklyRulePatch {
    /// Apply the patch, re-validating the resulting window.
    pub fn apply(&self, rule: &WeeklyRule) -> Result<WeeklyRule, String> {
        let window = DayWindow::new(
            self.window_start.unwrap_or(rule.window.start),
            self.window_end.unwrap_or(rule.window.end),
        )?;
        Ok(WeeklyRule {
            window,
            is_open: self.is_open.unwrap_or(rule.is_open),
            ..rule.clone()
        })
    }
}

/// Date-specific override replacing the weekday rule for one calendar date.
///
/// When an active special day exists for a date, the weekly rule for that
/// weekday is ignored entirely; the override is a replacement, not a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialDay {
    pub id: Option<SpecialDayId>,
    pub teacher_id: TeacherId,
    pub date: NaiveDate,
    pub window: DayWindow,
    pub is_active: bool,
    /// Pre-declared `"HH:MM-HH:MM"` slot strings shown as unavailable in
    /// the calendar view.
    #[serde(default)]
    pub booked_slots: Vec<String>,
}

/// Partial update for a special day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialDayPatch {
    pub window_start: Option<WallClock>,
    pub window_end: Option<WallClock>,
    pub is_active: Option<bool>,
    pub booked_slots: Option<Vec<String>>,
}

impl SpecialDayPatch {
    pub fn apply(&self, day: &SpecialDay) -> Result<SpecialDay, String> {
        let window = DayWindow::new(
            self.window_start.unwrap_or(day.window.start),
            self.window_end.unwrap_or(day.window.end),
        )?;
        Ok(SpecialDay {
            window,
            is_active: self.is_active.unwrap_or(day.is_active),
            booked_slots: self
                .booked_slots
                .clone()
                .unwrap_or_else(|| day.booked_slots.clone()),
            ..day.clone()
        })
    }
}

/// Absolute blackout instant range, always subtracted from availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailablePeriod {
    pub id: Option<UnavailablePeriodId>,
    pub teacher_id: TeacherId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reason: Option<String>,
}

impl UnavailablePeriod {
    pub fn new(
        teacher_id: TeacherId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<Self, String> {
        if end_time <= start_time {
            return Err("Unavailable period end must be after start".to_string());
        }
        Ok(UnavailablePeriod {
            id: None,
            teacher_id,
            start_time,
            end_time,
            reason,
        })
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }
}

/// Per-teacher calendar settings.
///
/// The timezone is a fixed UTC offset string (`"UTC"`, `"+03:00"`) applied
/// to the teacher's wall-clock windows when instants are needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
    pub teacher_id: TeacherId,
    pub timezone: String,
}

impl CalendarSettings {
    pub fn default_for(teacher_id: TeacherId) -> Self {
        CalendarSettings {
            teacher_id,
            timezone: "UTC".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> DayWindow {
        DayWindow::parse("09:00", "18:00").unwrap()
    }

    #[test]
    fn test_weekly_rule_rejects_bad_weekday() {
        let err = WeeklyRule::new(TeacherId::new(1), 7, window(), true);
        assert!(err.is_err());
    }

    #[test]
    fn test_rule_patch_keeps_unset_fields() {
        let rule = WeeklyRule::new(TeacherId::new(1), 2, window(), true).unwrap();
        let patch = WeeklyRulePatch {
            is_open: Some(false),
            ..Default::default()
        };
        let updated = patch.apply(&rule).unwrap();
        assert!(!updated.is_open);
        assert_eq!(updated.window, rule.window);
    }

    #[test]
    fn test_rule_patch_rejects_inverted_window() {
        let rule = WeeklyRule::new(TeacherId::new(1), 2, window(), true).unwrap();
        let patch = WeeklyRulePatch {
            window_end: Some(WallClock::parse("08:00").unwrap()),
            ..Default::default()
        };
        assert!(patch.apply(&rule).is_err());
    }

    #[test]
    fn test_unavailable_period_rejects_inverted() {
        use chrono::TimeZone;
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        assert!(UnavailablePeriod::new(TeacherId::new(1), start, end, None).is_err());
    }

    #[test]
    fn test_special_day_serde_defaults_booked_slots() {
        let json = r#"{
            "id": null,
            "teacher_id": 5,
            "date": "2025-03-11",
            "window": {"start": "10:00", "end": "14:00"},
            "is_active": true
        }"#;
        let day: SpecialDay = serde_json::from_str(json).unwrap();
        assert!(day.booked_slots.is_empty());
        assert_eq!(day.teacher_id, TeacherId::new(5));
    }
}
