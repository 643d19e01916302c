//! Tenant ("city") identity and resolution policy.
//!
//! Every request runs against exactly one tenant. The policy picks the first
//! non-blank candidate in precedence order (header, query string, body),
//! normalises it, and collapses anything outside the allow-list to the
//! default tenant.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// Field carrying the tenant on tenant-partitioned records.
pub const TENANT_FIELD: &str = "city";

/// Tenants accepted when no allow-list is configured.
pub const DEFAULT_TENANTS: [&str; 3] = ["santos", "itajai", "paranagua"];

/// Tenant used when no allow-listed candidate is supplied.
pub const DEFAULT_TENANT: &str = "santos";

/// Collection holding users (drivers, contractors, administrators).
pub const DRIVERS: &str = "drivers";

/// Collection holding deliveries.
pub const DELIVERIES: &str = "deliveries";

/// Whether records in `collection` are scoped by [`TENANT_FIELD`] in the
/// shared database. Users are global.
#[must_use]
pub fn is_tenant_partitioned(collection: &str) -> bool {
    collection == DELIVERIES
}

/// A resolved, allow-listed tenant identifier.
///
/// Tenant names are lower-case ASCII and safe to use as file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tenant(String);

impl Tenant {
    /// Tenant name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration errors for [`TenantPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantPolicyError {
    /// A tenant name is empty or contains characters other than `[a-z0-9_-]`.
    #[error("invalid tenant name `{name}`")]
    InvalidName {
        /// Offending name.
        name: String,
    },
    /// The default tenant is not on the allow-list.
    #[error("default tenant `{name}` is not in the allow-list")]
    DefaultNotAllowed {
        /// Configured default.
        name: String,
    },
}

/// Raw tenant candidates gathered from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantCandidates<'a> {
    /// `x-city` header.
    pub header: Option<&'a str>,
    /// `city` query parameter.
    pub query: Option<&'a str>,
    /// `city` field of the request body.
    pub body: Option<&'a str>,
}

/// Allow-list and default used to resolve tenants.
///
/// # Examples
/// ```
/// use podtrack::domain::{TenantCandidates, TenantPolicy};
///
/// let policy = TenantPolicy::standard();
/// let tenant = policy.resolve(&TenantCandidates {
///     header: Some("  ITAJAI "),
///     ..TenantCandidates::default()
/// });
/// assert_eq!(tenant.as_str(), "itajai");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantPolicy {
    allowed: BTreeSet<String>,
    default: Tenant,
}

impl TenantPolicy {
    /// Build a policy from an allow-list and a default.
    ///
    /// Names are normalised (trimmed, lower-cased) before validation.
    ///
    /// # Errors
    /// Returns [`TenantPolicyError`] for unsafe names or a default that is
    /// not allow-listed.
    pub fn new<I, S>(allowed: I, default: &str) -> Result<Self, TenantPolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = allowed
            .into_iter()
            .map(|name| validated(name.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let default = validated(default)?;
        if !allowed.contains(&default) {
            return Err(TenantPolicyError::DefaultNotAllowed { name: default });
        }
        Ok(Self {
            allowed,
            default: Tenant(default),
        })
    }

    /// The built-in allow-list with `santos` as default.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            allowed: DEFAULT_TENANTS.iter().map(|name| (*name).to_owned()).collect(),
            default: Tenant(DEFAULT_TENANT.to_owned()),
        }
    }

    /// Default tenant.
    #[must_use]
    pub fn default_tenant(&self) -> &Tenant {
        &self.default
    }

    /// Allow-listed tenants in name order.
    pub fn tenants(&self) -> impl Iterator<Item = Tenant> + '_ {
        self.allowed.iter().cloned().map(Tenant)
    }

    /// Normalise a single raw value, collapsing unknown names to the default.
    #[must_use]
    pub fn normalise(&self, raw: &str) -> Tenant {
        let name = raw.trim().to_lowercase();
        if self.allowed.contains(&name) {
            Tenant(name)
        } else {
            self.default.clone()
        }
    }

    /// Resolve the tenant for a request.
    #[must_use]
    pub fn resolve(&self, candidates: &TenantCandidates<'_>) -> Tenant {
        [candidates.header, candidates.query, candidates.body]
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty())
            .map_or_else(|| self.default.clone(), |raw| self.normalise(raw))
    }
}

impl Default for TenantPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

fn validated(raw: &str) -> Result<String, TenantPolicyError> {
    let name = raw.trim().to_lowercase();
    let safe = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if safe {
        Ok(name)
    } else {
        Err(TenantPolicyError::InvalidName { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn candidates<'a>(
        header: Option<&'a str>,
        query: Option<&'a str>,
        body: Option<&'a str>,
    ) -> TenantCandidates<'a> {
        TenantCandidates {
            header,
            query,
            body,
        }
    }

    #[rstest]
    #[case(candidates(Some("itajai"), Some("paranagua"), Some("santos")), "itajai")]
    #[case(candidates(None, Some("Paranagua"), Some("itajai")), "paranagua")]
    #[case(candidates(Some("   "), None, Some(" ITAJAI")), "itajai")]
    #[case(candidates(None, None, None), "santos")]
    #[case(candidates(Some("recife"), Some("itajai"), None), "santos")]
    #[case(candidates(Some("../etc"), None, None), "santos")]
    fn resolves_in_precedence_order(#[case] input: TenantCandidates<'_>, #[case] expected: &str) {
        let policy = TenantPolicy::standard();
        assert_eq!(policy.resolve(&input).as_str(), expected);
    }

    #[rstest]
    fn custom_policy_normalises_configuration() {
        let policy = TenantPolicy::new([" Recife", "natal "], "NATAL").expect("valid policy");
        assert_eq!(policy.default_tenant().as_str(), "natal");
        assert_eq!(policy.normalise("RECIFE").as_str(), "recife");
        assert_eq!(policy.normalise("santos").as_str(), "natal");
    }

    #[rstest]
    #[case(vec!["santos"], "itajai")]
    #[case(vec!["santos", "a/b"], "santos")]
    #[case(vec!["santos", ""], "santos")]
    fn rejects_invalid_configuration(#[case] allowed: Vec<&str>, #[case] default: &str) {
        assert!(TenantPolicy::new(allowed, default).is_err());
    }

    #[rstest]
    #[case(DELIVERIES, true)]
    #[case(DRIVERS, false)]
    fn only_deliveries_are_partitioned(#[case] collection: &str, #[case] expected: bool) {
        assert_eq!(is_tenant_partitioned(collection), expected);
    }
}
