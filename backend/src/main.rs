//! Backend entry-point: loads settings, wires tenant stores and serves the
//! REST API.

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use podtrack::inbound::http::health::HealthState;
use podtrack::inbound::http::state::HttpState;
use podtrack::outbound::{LoggingBlobCleanup, StoreRegistry};
use podtrack::server::{ServerConfig, create_server};
use podtrack::settings::{ServerSettings, StorageSettings};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = [OsString::from("podtrack")];
    let storage = StorageSettings::load_from_iter(args.clone())
        .map_err(|e| io::Error::other(format!("load storage settings: {e}")))?;
    let server = ServerSettings::load_from_iter(args)
        .map_err(|e| io::Error::other(format!("load server settings: {e}")))?;

    let tenants = storage.tenant_policy().map_err(io::Error::other)?;
    let bind_addr = server.bind_addr().map_err(io::Error::other)?;
    let mode = storage.backend_mode();
    info!(
        backend = mode.label(),
        data_dir = %storage.data_dir(),
        default_tenant = %tenants.default_tenant(),
        %bind_addr,
        "starting server"
    );

    let clock = Arc::new(DefaultClock);
    let registry = StoreRegistry::new(mode, storage.data_dir(), clock.clone());
    let http_state = HttpState::new(
        Arc::new(registry),
        tenants,
        Arc::new(LoggingBlobCleanup),
        clock,
    );

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, ServerConfig::new(http_state, bind_addr))?;
    server.await
}
