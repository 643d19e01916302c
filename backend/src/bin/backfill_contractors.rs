//! Enforce the driver to contractor reference across tenant stores.
//!
//! # Examples
//! ```sh
//! cargo run --manifest-path backend/Cargo.toml --bin backfill-contractors -- --city santos
//! ```
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use podtrack::domain::ports::StoreProvider;
use podtrack::domain::{ContractorBackfill, Tenant};
use podtrack::outbound::{BackendMode, StoreRegistry};
use podtrack::settings::StorageSettings;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `backfill-contractors` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "backfill-contractors",
    about = "Normalise user roles and assign drivers and deliveries to contractors",
    version
)]
struct CliArgs {
    /// Tenant to process; repeat for several. Defaults to every allowed tenant.
    #[arg(long = "city", value_name = "name")]
    cities: Vec<String>,
    /// Database connection URL. Falls back to the configured settings.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
    /// Directory of tenant files. Falls back to the configured settings.
    #[arg(long = "data-dir", value_name = "path")]
    data_dir: Option<Utf8PathBuf>,
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = StorageSettings::load_from_iter([OsString::from("backfill-contractors")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    let policy = settings.tenant_policy().map_err(io::Error::other)?;

    let mode = match args.database_url.as_deref() {
        Some(url) => BackendMode::select(Some(url), settings.disable_database),
        None => settings.backend_mode(),
    };
    let data_dir = args.data_dir.unwrap_or_else(|| settings.data_dir());
    info!(backend = mode.label(), data_dir = %data_dir, "starting contractor backfill");
    let registry = StoreRegistry::new(mode, data_dir, Arc::new(DefaultClock));

    let tenants: Vec<Tenant> = if args.cities.is_empty() {
        policy.tenants().collect()
    } else {
        args.cities.iter().map(|city| policy.normalise(city)).collect()
    };

    for tenant in tenants {
        let store = registry.get_or_create(&tenant).map_err(io::Error::other)?;
        let report = ContractorBackfill::new(store)
            .run()
            .await
            .map_err(io::Error::other)?;
        let json = serde_json::to_string(&report).map_err(io::Error::other)?;
        println!("{tenant}: {json}");
    }
    Ok(())
}
