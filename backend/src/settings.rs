//! Runtime configuration loaded via OrthoConfig.
//!
//! Every value comes from `PODTRACK_*` environment variables; the binaries
//! load with an empty argument list so their own CLI flags stay separate.

use std::env;
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{DEFAULT_TENANT, DEFAULT_TENANTS, TenantPolicy, TenantPolicyError};
use crate::outbound::BackendMode;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// Conventional variable consulted when `PODTRACK_DATABASE_URL` is unset.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The bind address does not parse as `host:port`.
    #[error("invalid bind address `{value}`: {message}")]
    InvalidBindAddr {
        /// Configured value.
        value: String,
        /// Parser message.
        message: String,
    },
    /// The tenant allow-list or default is unusable.
    #[error(transparent)]
    Tenants(#[from] TenantPolicyError),
}

/// Storage backend and tenant configuration.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PODTRACK")]
pub struct StorageSettings {
    /// PostgreSQL connection string for the document database.
    pub database_url: Option<String>,
    /// Keep every request on the file store even with a connection string.
    #[ortho_config(default = false)]
    pub disable_database: bool,
    /// Directory holding one JSON file per tenant.
    pub data_dir: Option<String>,
    /// Tenant used when a request names none, or an unknown one.
    pub default_tenant: Option<String>,
    /// Comma-separated tenant allow-list.
    pub tenants: Option<String>,
}

impl StorageSettings {
    /// Connection string, falling back to `DATABASE_URL`.
    pub fn database_url(&self) -> Option<String> {
        self.database_url
            .clone()
            .or_else(|| env::var(DATABASE_URL_ENV).ok())
            .filter(|url| !url.trim().is_empty())
    }

    /// Directory for the tenant files.
    pub fn data_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR))
    }

    /// Backend selection implied by the connection string and switch.
    pub fn backend_mode(&self) -> BackendMode {
        BackendMode::select(self.database_url().as_deref(), self.disable_database)
    }

    /// Tenant allow-list and default.
    ///
    /// Without an explicit default, a custom allow-list defaults to its
    /// first entry.
    ///
    /// # Errors
    /// Returns [`SettingsError::Tenants`] for unsafe names or a default
    /// outside the allow-list.
    pub fn tenant_policy(&self) -> Result<TenantPolicy, SettingsError> {
        let allowed: Vec<&str> = match self.tenants.as_deref() {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect(),
            None => DEFAULT_TENANTS.to_vec(),
        };
        if allowed.is_empty() {
            return Ok(TenantPolicy::standard());
        }
        let default = self
            .default_tenant
            .as_deref()
            .or_else(|| self.tenants.as_ref().and(allowed.first().copied()))
            .unwrap_or(DEFAULT_TENANT);
        Ok(TenantPolicy::new(allowed, default)?)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PODTRACK")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
}

impl ServerSettings {
    /// Parsed listener address.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidBindAddr`] for malformed values.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .trim()
            .parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
                message: err.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const STORAGE_VARS: [&str; 6] = [
        "PODTRACK_DATABASE_URL",
        "PODTRACK_DISABLE_DATABASE",
        "PODTRACK_DATA_DIR",
        "PODTRACK_DEFAULT_TENANT",
        "PODTRACK_TENANTS",
        DATABASE_URL_ENV,
    ];

    fn load_storage() -> StorageSettings {
        StorageSettings::load_from_iter([OsString::from("podtrack")]).expect("config should load")
    }

    fn cleared_except<'a>(
        overrides: &'a [(&'a str, &'a str)],
    ) -> Vec<(&'a str, Option<String>)> {
        STORAGE_VARS
            .iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(cleared_except(&[]));

        let settings = load_storage();
        assert!(settings.database_url().is_none());
        assert!(!settings.disable_database);
        assert_eq!(settings.data_dir(), Utf8PathBuf::from("data"));
        assert_eq!(settings.backend_mode().label(), "file");
        assert_eq!(
            settings.tenant_policy().expect("policy"),
            TenantPolicy::standard()
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(cleared_except(&[
            ("PODTRACK_DATABASE_URL", "postgres://db/podtrack"),
            ("PODTRACK_DISABLE_DATABASE", "true"),
            ("PODTRACK_DATA_DIR", "/var/lib/podtrack"),
            ("PODTRACK_TENANTS", "Joinville, itajai"),
        ]));

        let settings = load_storage();
        assert_eq!(
            settings.database_url().as_deref(),
            Some("postgres://db/podtrack")
        );
        assert_eq!(settings.backend_mode().label(), "file (database disabled)");
        assert_eq!(settings.data_dir(), Utf8PathBuf::from("/var/lib/podtrack"));

        let policy = settings.tenant_policy().expect("policy");
        assert_eq!(policy.default_tenant().as_str(), "joinville");
        assert_eq!(policy.normalise("SANTOS").as_str(), "joinville");
        assert_eq!(policy.normalise("itajai").as_str(), "itajai");
    }

    #[rstest]
    fn conventional_database_url_is_a_fallback() {
        let _guard = lock_env(cleared_except(&[(DATABASE_URL_ENV, "postgres://fallback/db")]));

        let settings = load_storage();
        assert_eq!(
            settings.database_url().as_deref(),
            Some("postgres://fallback/db")
        );
        assert_eq!(settings.backend_mode().label(), "database");
    }

    #[rstest]
    fn default_outside_the_allow_list_is_rejected() {
        let _guard = lock_env(cleared_except(&[
            ("PODTRACK_TENANTS", "santos,itajai"),
            ("PODTRACK_DEFAULT_TENANT", "curitiba"),
        ]));

        let err = load_storage().tenant_policy().expect_err("invalid default");
        assert_eq!(
            err,
            SettingsError::Tenants(TenantPolicyError::DefaultNotAllowed {
                name: "curitiba".to_owned()
            })
        );
    }

    #[rstest]
    #[case(None, Ok("0.0.0.0:8080"))]
    #[case(Some("127.0.0.1:9000"), Ok("127.0.0.1:9000"))]
    #[case(Some("localhost"), Err(()))]
    fn bind_address_parsing(#[case] raw: Option<&str>, #[case] expected: Result<&str, ()>) {
        let settings = ServerSettings {
            bind_addr: raw.map(str::to_owned),
        };
        match expected {
            Ok(addr) => assert_eq!(
                settings.bind_addr().expect("valid address").to_string(),
                addr
            ),
            Err(()) => assert!(matches!(
                settings.bind_addr(),
                Err(SettingsError::InvalidBindAddr { .. })
            )),
        }
    }
}
