//! External identity lookup contract.
//!
//! Booking parties are referenced by id; their display names live in the
//! students and groups services. The calendar only needs a best-effort name
//! for display, so the contract is a single optional lookup: absence or
//! failure must never fail the calling request.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::api::{BookingParty, GroupId, StudentId};

/// Resolves booking-party display names.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Look up the display name for a student or group. `None` when the
    /// party is unknown or the upstream lookup failed.
    async fn resolve_display_name(&self, party: &BookingParty) -> Option<String>;
}

/// In-memory directory for tests and local development.
#[derive(Default)]
pub struct StaticDirectory {
    students: RwLock<HashMap<uuid::Uuid, String>>,
    groups: RwLock<HashMap<i64, String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&self, id: StudentId, name: impl Into<String>) {
        self.students.write().insert(id.value(), name.into());
    }

    pub fn add_group(&self, id: GroupId, name: impl Into<String>) {
        self.groups.write().insert(id.value(), name.into());
    }
}

#[async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn resolve_display_name(&self, party: &BookingParty) -> Option<String> {
        match party {
            BookingParty::Student(id) => self.students.read().get(&id.value()).cloned(),
            BookingParty::Group(id) => self.groups.read().get(&id.value()).cloned(),
        }
    }
}

/// Directory that resolves nothing; every name degrades to empty.
pub struct NullDirectory;

#[async_trait]
impl IdentityDirectory for NullDirectory {
    async fn resolve_display_name(&self, _party: &BookingParty) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory_lookup() {
        let directory = StaticDirectory::new();
        let student = StudentId::new(uuid::Uuid::new_v4());
        directory.add_student(student, "Alice");
        directory.add_group(GroupId::new(3), "Beginners");

        assert_eq!(
            directory
                .resolve_display_name(&BookingParty::Student(student))
                .await
                .as_deref(),
            Some("Alice")
        );
        assert_eq!(
            directory
                .resolve_display_name(&BookingParty::Group(GroupId::new(3)))
                .await
                .as_deref(),
            Some("Beginners")
        );
        assert!(directory
            .resolve_display_name(&BookingParty::Group(GroupId::new(99)))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_null_directory_resolves_nothing() {
        let party = BookingParty::Group(GroupId::new(1));
        assert!(NullDirectory.resolve_display_name(&party).await.is_none());
    }
}
