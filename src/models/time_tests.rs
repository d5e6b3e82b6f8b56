use super::*;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn iv(start_h: u32, end_h: u32) -> Interval {
    Interval::new(utc(2025, 3, 10, start_h, 0), utc(2025, 3, 10, end_h, 0))
}

#[test]
fn test_wall_clock_parse() {
    let w = WallClock::parse("09:30").unwrap();
    assert_eq!(w.to_string(), "09:30");
    assert_eq!(w.minutes_from_midnight(), 570);
}

#[test]
fn test_wall_clock_rejects_malformed() {
    assert!(WallClock::parse("9:30").is_err());
    assert!(WallClock::parse("24:00").is_err());
    assert!(WallClock::parse("12:60").is_err());
    assert!(WallClock::parse("12-30").is_err());
    assert!(WallClock::parse("").is_err());
}

#[test]
fn test_wall_clock_serde_roundtrip() {
    let w = WallClock::parse("18:00").unwrap();
    let json = serde_json::to_string(&w).unwrap();
    assert_eq!(json, "\"18:00\"");
    let back: WallClock = serde_json::from_str(&json).unwrap();
    assert_eq!(back, w);
}

#[test]
fn test_day_window_rejects_inverted() {
    assert!(DayWindow::parse("18:00", "09:00").is_err());
    assert!(DayWindow::parse("09:00", "09:00").is_err());
    assert!(DayWindow::parse("09:00", "18:00").is_ok());
}

#[test]
fn test_day_window_parse_range() {
    let w = DayWindow::parse_range("10:00-14:00").unwrap();
    assert_eq!(w.start.to_string(), "10:00");
    assert_eq!(w.end.to_string(), "14:00");
    assert!(DayWindow::parse_range("10:00").is_err());
    assert!(DayWindow::parse_range("14:00-10:00").is_err());
}

#[test]
fn test_window_to_interval_respects_offset() {
    let window = DayWindow::parse("09:00", "18:00").unwrap();
    let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

    let at_utc = window.to_interval(date, parse_utc_offset("UTC").unwrap());
    assert_eq!(at_utc.start, utc(2025, 3, 10, 9, 0));

    // 09:00 local at +03:00 is 06:00 UTC.
    let at_plus3 = window.to_interval(date, parse_utc_offset("+03:00").unwrap());
    assert_eq!(at_plus3.start, utc(2025, 3, 10, 6, 0));
    assert_eq!(at_plus3.end, utc(2025, 3, 10, 15, 0));
}

#[test]
fn test_strict_overlap_touching_endpoints() {
    let a = iv(14, 15);
    let b = iv(15, 16);
    assert!(!a.overlaps(&b));
    assert!(!b.overlaps(&a));

    let c = Interval::new(utc(2025, 3, 10, 14, 30), utc(2025, 3, 10, 15, 30));
    assert!(a.overlaps(&c));
}

#[test]
fn test_subtract_middle_splits() {
    let base = iv(9, 18);
    let busy = iv(12, 13);
    let pieces = base.subtract(&busy);
    assert_eq!(pieces, vec![iv(9, 12), iv(13, 18)]);
}

#[test]
fn test_subtract_disjoint_is_noop() {
    let base = iv(9, 12);
    let busy = iv(13, 14);
    assert_eq!(base.subtract(&busy), vec![base]);
}

#[test]
fn test_subtract_covering_removes() {
    let base = iv(10, 11);
    let busy = iv(9, 18);
    assert!(base.subtract(&busy).is_empty());
}

#[test]
fn test_subtract_busy_equal_to_base() {
    let base = iv(9, 18);
    assert!(subtract_busy(vec![base], &[base]).is_empty());
}

#[test]
fn test_subtract_busy_order_independent() {
    let base = vec![iv(8, 20)];
    let busy_a = [iv(9, 10), iv(12, 14), iv(13, 15)];
    let busy_b = [iv(13, 15), iv(9, 10), iv(12, 14)];
    assert_eq!(
        subtract_busy(base.clone(), &busy_a),
        subtract_busy(base, &busy_b)
    );
}

#[test]
fn test_weekday_index_monday_zero() {
    // 2025-03-10 is a Monday, 2025-03-16 a Sunday.
    assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()), 0);
    assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2025, 3, 16).unwrap()), 6);
}

#[test]
fn test_parse_utc_offset() {
    assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
    assert_eq!(parse_utc_offset("utc").unwrap().local_minus_utc(), 0);
    assert_eq!(parse_utc_offset("+03:00").unwrap().local_minus_utc(), 3 * 3600);
    assert_eq!(
        parse_utc_offset("-05:30").unwrap().local_minus_utc(),
        -(5 * 3600 + 30 * 60)
    );
    assert!(parse_utc_offset("Europe/Moscow").is_err());
    assert!(parse_utc_offset("+3:00").is_err());
}

#[test]
fn test_day_bounds_cover_whole_day() {
    let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let bounds = day_bounds(date, parse_utc_offset("UTC").unwrap());
    assert_eq!(bounds.start, utc(2025, 3, 10, 0, 0));
    assert_eq!(bounds.end, utc(2025, 3, 11, 0, 0));
    assert_eq!(bounds.duration(), Duration::hours(24));
}

#[test]
fn test_local_date_shifts_across_midnight() {
    let offset = parse_utc_offset("+03:00").unwrap();
    // 22:30 UTC is already the next day at +03:00.
    let instant = utc(2025, 3, 10, 22, 30);
    assert_eq!(
        local_date(instant, offset),
        NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()
    );
}
