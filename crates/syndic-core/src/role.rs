//! # Roles and Operation Context
//!
//! The dashboard has three roles, ordered by privilege. Rather than reading
//! the current role from ambient session state, callers build an
//! [`OperationContext`] and pass it explicitly to every operation that logs
//! or gates on who is acting.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::identity::UserId;

/// Roles, ordered by privilege level.
///
/// The `Ord` derivation follows declaration order:
/// `Client < Admin < Owner`, so access checks are a single `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Investor/participant: reads own balance, requests withdrawals.
    Client,
    /// Records profits, edits account configuration, approves withdrawals.
    Admin,
    /// Full access.
    Owner,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "client" => Ok(Self::Client),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            other => Err(ValidationError::InvalidRole(other.to_string())),
        }
    }
}

/// Who is performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// The caller's user id. `None` for service identities (CLI, bare
    /// bearer secret).
    pub user_id: Option<UserId>,
    /// The caller's role.
    pub role: Role,
}

impl Caller {
    /// A service identity with owner privileges.
    pub fn system() -> Self {
        Self {
            user_id: None,
            role: Role::Owner,
        }
    }

    /// Whether the caller has at least the given role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Whether the caller is the given user.
    pub fn is_user(&self, user: &UserId) -> bool {
        self.user_id.as_ref() == Some(user)
    }
}

/// Explicit context for a single operation: the caller plus a correlation
/// id that ties together every log line the operation emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationContext {
    /// Who is acting.
    pub caller: Caller,
    /// Correlates log events across the workflow.
    pub correlation_id: Uuid,
}

impl OperationContext {
    /// Context for the given caller with a fresh correlation id.
    pub fn new(caller: Caller) -> Self {
        Self {
            caller,
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Context for offline tooling (CLI, tests).
    pub fn system() -> Self {
        Self::new(Caller::system())
    }
}
