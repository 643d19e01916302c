//! User roles and the authenticated principal.
//!
//! Credentials are verified upstream; the core only sees the principal's
//! identifier, role and contractor back-reference.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Error;

/// Attribute holding a user's role.
pub const ROLE_FIELD: &str = "role";
/// Attribute linking drivers (and deliveries) to their contractor.
pub const CONTRACTOR_ID_FIELD: &str = "contractorId";
/// Attribute linking deliveries to their driver.
pub const DRIVER_ID_FIELD: &str = "driverId";

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Sees and manages everything.
    Admin,
    /// Owns a fleet of drivers.
    Contractor,
    /// Uploads documents for their own deliveries.
    Driver,
}

impl Role {
    /// Read a stored role, case-insensitively.
    ///
    /// Missing or unknown roles read as [`Role::Driver`], the least
    /// privileged role.
    #[must_use]
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_uppercase()).as_deref() {
            Some("ADMIN") => Self::Admin,
            Some("CONTRACTOR") => Self::Contractor,
            _ => Self::Driver,
        }
    }

    /// Canonical stored spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Contractor => "CONTRACTOR",
            Self::Driver => "DRIVER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: String,
    role: Role,
    contractor_id: Option<String>,
}

impl Principal {
    /// Build a principal.
    pub fn new(id: impl Into<String>, role: Role, contractor_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            role,
            contractor_id,
        }
    }

    /// User identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Owning contractor. Contractors own themselves when unset.
    #[must_use]
    pub fn contractor_id(&self) -> Option<&str> {
        match (self.role, self.contractor_id.as_deref()) {
            (_, Some(id)) => Some(id),
            (Role::Contractor, None) => Some(&self.id),
            _ => None,
        }
    }

    /// Whether the principal is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless the principal is an administrator.
    ///
    /// # Errors
    /// Returns [`Error::forbidden`] for non-admin principals.
    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden("administrator role required"))
        }
    }
}
