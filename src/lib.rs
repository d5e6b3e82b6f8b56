//! # Calendary Rust Backend
//!
//! Calendar availability and booking-conflict engine for the tutoring
//! platform.
//!
//! This crate reconciles a teacher's recurring weekly hours, one-off date
//! overrides, blackout periods, and booked lesson sessions into a
//! displayable day-by-day calendar and an enumerable list of free bookable
//! slots, while enforcing the one hard correctness property of the system:
//! no two non-cancelled sessions for the same teacher ever overlap.
//!
//! ## Features
//!
//! - **Recurring schedule**: one open/closed wall-clock window per weekday
//! - **Exceptions**: date-specific overrides and absolute blackout periods
//! - **Sessions**: bookable lesson instances with a lifecycle state machine
//! - **Free slots**: interval subtraction and fixed-size quantization
//! - **Conflict guard**: atomic per-teacher overlap check on every booking
//! - **HTTP API**: axum-based REST endpoints for the platform's gateway
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: strongly-typed identifiers and the public type surface
//! - [`models`]: validated domain value objects (times, rules, sessions)
//! - [`db`]: repository pattern with in-memory and Postgres backends
//! - [`services`]: availability merge, slot generation, aggregation, booking
//! - [`http`]: axum HTTP server and request handlers

pub mod api;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
