//! Calendar REST API server.
//!
//! Wires the repository backend, the identity directory, and the axum
//! router together and serves the calendar API.
//!
//! Configuration comes from the environment:
//! - `HOST` / `PORT`: bind address (default `0.0.0.0:8006`)
//! - `DATABASE_URL`: selects the Postgres backend when compiled in
//! - `RUST_LOG`: log level (default `info`)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use calendary_rust::db;
use calendary_rust::http::{create_router, AppState};
use calendary_rust::services::directory::NullDirectory;

fn init_logging() {
    let level = env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO);
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

fn bind_address() -> anyhow::Result<SocketAddr> {
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8006);
    Ok(format!("{}:{}", host, port).parse()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!("Starting calendar server");

    db::init_repository()?;
    let repository = Arc::clone(db::get_repository()?);
    info!("Repository initialized");

    // The identity directory is wired to the students/groups services in
    // deployment; standalone runs fall back to blank display names.
    let state = AppState::new(repository, Arc::new(NullDirectory));
    let app = create_router(state);

    let addr = bind_address()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
