//! Persistence layer for the calendar stores.
//!
//! Services talk to the four store traits in [`repository`]; the concrete
//! backend behind them is chosen at build time (features) and at run time
//! (environment / `repository.toml`):
//!
//! ```text
//!   services/  ──►  repository traits  ──►  repositories::local
//!                                      └──►  repositories::postgres
//! ```
//!
//! - `repository`: trait definitions for the four stores
//! - `repositories::local`: HashMaps behind a lock, for tests and local runs
//! - `repositories::postgres`: Diesel + r2d2, feature `postgres-repo`
//! - `factory`: backend selection and construction
//! - `repo_config`: `repository.toml` parsing

// A build with neither backend cannot store anything.
#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

// The Postgres connection settings live next to the implementation; stubs
// keep the factory/config signatures feature-independent.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, ExceptionRepository, FullRepository, LessonRepository, RepositoryError,
    RepositoryResult, SessionRepository, WeeklyRuleRepository,
};

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};
#[cfg(feature = "postgres-repo")]
use tokio::runtime::Runtime;

/// Global repository instance initialized once per process.
static REPOSITORY: OnceLock<Arc<dyn FullRepository>> = OnceLock::new();

/// Initialize the global repository singleton for the compiled-in backend.
///
/// Postgres takes precedence when both backend features are enabled
/// (e.g. `--all-features`). Calling this twice is a no-op.
pub fn init_repository() -> Result<()> {
    if REPOSITORY.get().is_some() {
        return Ok(());
    }

    let _ = REPOSITORY.set(build_default_repository()?);
    Ok(())
}

#[cfg(feature = "postgres-repo")]
fn build_default_repository() -> Result<Arc<dyn FullRepository>> {
    let config = PostgresConfig::from_env().map_err(anyhow::Error::msg)?;
    let runtime = Runtime::new().context("Failed to create async runtime for repository init")?;
    let repo = runtime
        .block_on(RepositoryFactory::create_postgres(&config))
        .map_err(|e| anyhow::Error::msg(e.to_string()))?;
    Ok(repo as Arc<dyn FullRepository>)
}

#[cfg(all(feature = "local-repo", not(feature = "postgres-repo")))]
fn build_default_repository() -> Result<Arc<dyn FullRepository>> {
    Ok(RepositoryFactory::create_local())
}

/// Get a reference to the global repository instance, initializing it on
/// first use.
pub fn get_repository() -> Result<&'static Arc<dyn FullRepository>> {
    if REPOSITORY.get().is_none() {
        let _ = init_repository();
    }

    REPOSITORY
        .get()
        .context("Database not initialized. Call init_repository() first.")
}
