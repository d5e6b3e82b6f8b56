//! Service layer for business logic and orchestration.
//!
//! Services sit between the repository traits and the HTTP layer. They
//! implement the availability merge, free-slot generation, full-schedule
//! aggregation, and booking lifecycle over any repository implementation.

pub mod availability;

pub mod booking;

pub mod calendar;

pub mod directory;

pub use availability::{compute_free_slots, quantize_slots, resolve_day_capacity, TimeSlot};
pub use booking::{book_session, cancel_session, reschedule_session};
pub use calendar::full_schedule;
pub use directory::{IdentityDirectory, NullDirectory, StaticDirectory};
