//! Time primitives for the scheduling engine.
//!
//! Weekly rules and special days carry wall-clock windows ("HH:MM" strings
//! with no timezone); sessions and blackout periods carry UTC instants.
//! [`WallClock`] and [`DayWindow`] cover the former, [`Interval`] the
//! latter. Conversion between the two goes through the teacher's configured
//! UTC offset.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock time of day, serialized as a zero-padded `"HH:MM"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallClock(NaiveTime);

impl WallClock {
    /// Parse a strict `"HH:MM"` string (24-hour, zero-padded).
    pub fn parse(s: &str) -> Result<Self, String> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(format!("Invalid time '{}', expected HH:MM", s));
        }
        let time = NaiveTime::parse_from_str(s, "%H:%M")
            .map_err(|_| format!("Invalid time '{}', expected HH:MM", s))?;
        Ok(WallClock(time))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// Minutes since midnight.
    pub fn minutes_from_midnight(&self) -> i64 {
        use chrono::Timelike;
        self.0.hour() as i64 * 60 + self.0.minute() as i64
    }
}

impl std::fmt::Display for WallClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl TryFrom<String> for WallClock {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        WallClock::parse(&s)
    }
}

impl From<WallClock> for String {
    fn from(w: WallClock) -> Self {
        w.to_string()
    }
}

/// A wall-clock window within a single day, half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: WallClock,
    pub end: WallClock,
}

impl DayWindow {
    /// Build a window, rejecting `end <= start`.
    pub fn new(start: WallClock, end: WallClock) -> Result<Self, String> {
        if end <= start {
            return Err(format!("Window end {} must be after start {}", end, start));
        }
        Ok(DayWindow { start, end })
    }

    /// Parse a pair of `"HH:MM"` strings into a window.
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        Self::new(WallClock::parse(start)?, WallClock::parse(end)?)
    }

    /// Parse a literal `"HH:MM-HH:MM"` range string.
    pub fn parse_range(s: &str) -> Result<Self, String> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid range '{}', expected HH:MM-HH:MM", s))?;
        Self::parse(start, end)
    }

    /// Anchor the window on a calendar date in the given UTC offset,
    /// yielding a UTC instant interval.
    pub fn to_interval(&self, date: NaiveDate, offset: FixedOffset) -> Interval {
        Interval {
            start: local_instant(date, self.start.time(), offset),
            end: local_instant(date, self.end.time(), offset),
        }
    }
}

impl std::fmt::Display for DayWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Half-open UTC instant interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Interval { start, end }
    }

    /// An interval with no extent contributes nothing to availability.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Strict overlap: touching endpoints do not count.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Remove `busy` from this interval. Yields zero, one, or two pieces.
    pub fn subtract(&self, busy: &Interval) -> Vec<Interval> {
        if !self.overlaps(busy) {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(2);
        if self.start < busy.start {
            pieces.push(Interval::new(self.start, busy.start));
        }
        if busy.end < self.end {
            pieces.push(Interval::new(busy.end, self.end));
        }
        pieces
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Subtract every busy interval from every base interval.
///
/// The result is independent of the order busy intervals are applied in;
/// empty inputs pass through untouched.
pub fn subtract_busy(base: Vec<Interval>, busy: &[Interval]) -> Vec<Interval> {
    let mut free = base;
    for b in busy {
        if b.is_empty() {
            continue;
        }
        free = free.iter().flat_map(|a| a.subtract(b)).collect();
    }
    free.retain(|i| !i.is_empty());
    free
}

/// Weekday index with Monday = 0 .. Sunday = 6, matching the stored rules.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Parse a per-teacher timezone setting into a fixed UTC offset.
///
/// Accepts `"UTC"` (case-insensitive) or `"+HH:MM"` / `"-HH:MM"`.
pub fn parse_utc_offset(tz: &str) -> Result<FixedOffset, String> {
    let tz = tz.trim();
    if tz.is_empty() || tz.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| "Invalid UTC offset".to_string());
    }

    let (sign, rest) = if let Some(rest) = tz.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = tz.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(format!("Invalid timezone '{}', expected UTC or +HH:MM", tz));
    };
    let clock = WallClock::parse(rest)
        .map_err(|_| format!("Invalid timezone '{}', expected UTC or +HH:MM", tz))?;
    let seconds = sign * (clock.minutes_from_midnight() as i32) * 60;
    FixedOffset::east_opt(seconds).ok_or_else(|| format!("Offset '{}' out of range", tz))
}

/// Combine a date and wall-clock time in the given offset into a UTC instant.
pub fn local_instant(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match offset.from_local_datetime(&naive).single() {
        Some(dt) => dt.with_timezone(&Utc),
        // Fixed offsets never produce ambiguous local times.
        None => Utc.from_utc_datetime(&naive),
    }
}

/// The full calendar day `[00:00, 24:00)` in the given offset, as UTC instants.
pub fn day_bounds(date: NaiveDate, offset: FixedOffset) -> Interval {
    let midnight = NaiveTime::MIN;
    let next = date + Duration::days(1);
    Interval::new(
        local_instant(date, midnight, offset),
        local_instant(next, midnight, offset),
    )
}

/// Calendar date of an instant as seen in the given offset.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod time_tests;
