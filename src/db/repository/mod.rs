//! Repository trait definitions for the calendar stores.
//!
//! This module provides a collection of focused repository traits that
//! abstract the persistence layer. By splitting responsibilities across
//! multiple traits, implementations can be more focused and testable.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`rules`]: Recurring weekly schedule store
//! - [`exceptions`]: Special days and blackout periods
//! - [`lessons`]: Lesson definitions and participant enrollments
//! - [`sessions`]: Bookable sessions and the conflict guard
//!
//! # Trait Composition
//!
//! A complete repository implementation implements all four traits:
//!
//! ```ignore
//! impl WeeklyRuleRepository for MyRepo { ... }
//! impl ExceptionRepository for MyRepo { ... }
//! impl LessonRepository for MyRepo { ... }
//! impl SessionRepository for MyRepo { ... }
//! ```
//!
//! For functions that need all capabilities, use the [`FullRepository`]
//! trait bound:
//!
//! ```ignore
//! async fn my_service(repo: &dyn FullRepository) -> RepositoryResult<()> {
//!     let rules = repo.list_rules(teacher).await?;
//!     let sessions = repo.list_sessions_for_teacher(teacher, from, to).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod exceptions;
pub mod lessons;
pub mod rules;
pub mod sessions;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use exceptions::ExceptionRepository;
pub use lessons::LessonRepository;
pub use rules::WeeklyRuleRepository;
pub use sessions::SessionRepository;

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type that implements all four store
/// traits. Use this as the bound when a service needs the whole engine.
pub trait FullRepository:
    WeeklyRuleRepository + ExceptionRepository + LessonRepository + SessionRepository
{
}

// Blanket implementation: implementing the four traits is sufficient.
impl<T> FullRepository for T where
    T: WeeklyRuleRepository + ExceptionRepository + LessonRepository + SessionRepository
{
}
