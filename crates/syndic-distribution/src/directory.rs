//! # User Directory
//!
//! Read-only lookup from user id to display name, and from display name
//! back to user id for the legacy normalizer. The engine never fails on an
//! unknown user: it logs a warning and labels the entry
//! [`UNKNOWN_USER_LABEL`].

use std::collections::BTreeMap;

use syndic_core::UserId;

/// Label shown for a user id the directory cannot resolve.
pub const UNKNOWN_USER_LABEL: &str = "Unknown";

/// Read-only user lookup consulted during normalization and computation.
pub trait UserDirectory: Send + Sync {
    /// Display name for a user, if known.
    fn display_name(&self, user: &UserId) -> Option<String>;

    /// Resolve a display name to a unique user.
    ///
    /// Matching is trimmed and case-insensitive. Returns `None` when no user
    /// or more than one user carries the name.
    fn find_by_name(&self, name: &str) -> Option<UserId>;
}

/// Resolve a user's display name, falling back to [`UNKNOWN_USER_LABEL`].
pub fn resolve_display_name(directory: &dyn UserDirectory, user: &UserId) -> String {
    match directory.display_name(user) {
        Some(name) => name,
        None => {
            tracing::warn!(user_id = %user, "user not found in directory, using fallback label");
            UNKNOWN_USER_LABEL.to_string()
        }
    }
}

/// Compare two display names the way the directory does.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// In-memory directory for tooling and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: BTreeMap<UserId, String>,
}

impl StaticDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register a user.
    pub fn with_user(mut self, id: UserId, name: impl Into<String>) -> Self {
        self.insert(id, name);
        self
    }

    /// Register or rename a user.
    pub fn insert(&mut self, id: UserId, name: impl Into<String>) {
        self.users.insert(id, name.into());
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserDirectory for StaticDirectory {
    fn display_name(&self, user: &UserId) -> Option<String> {
        self.users.get(user).cloned()
    }

    fn find_by_name(&self, name: &str) -> Option<UserId> {
        let mut matches = self
            .users
            .iter()
            .filter(|(_, candidate)| names_match(candidate, name))
            .map(|(id, _)| *id);
        let first = matches.next()?;
        match matches.next() {
            Some(_) => None,
            None => Some(first),
        }
    }
}
