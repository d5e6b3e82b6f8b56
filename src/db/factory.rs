//! Store backend selection.
//!
//! The factory turns a [`RepositoryType`] (explicit, from the environment,
//! or from `repository.toml`) into a ready repository instance.

use std::str::FromStr;
use std::sync::Arc;

use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};
use super::PostgresConfig;

/// Selectable store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Diesel + r2d2 against Postgres
    Postgres,
    /// HashMaps behind a lock, for tests and local development
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" => Ok(Self::Local),
            other => Err(format!("Unknown repository type: {}", other)),
        }
    }
}

impl RepositoryType {
    /// Backend selection from the environment.
    ///
    /// An explicit `REPOSITORY_TYPE` wins; otherwise the presence of a
    /// database URL selects Postgres, and Local is the fallback.
    pub fn from_env() -> Self {
        match std::env::var("REPOSITORY_TYPE") {
            Ok(value) => value.parse().unwrap_or(Self::Local),
            Err(_) => {
                let has_url = ["DATABASE_URL", "PG_DATABASE_URL"]
                    .iter()
                    .any(|key| std::env::var(key).is_ok());
                if has_url {
                    Self::Postgres
                } else {
                    Self::Local
                }
            }
        }
    }
}

/// Factory for creating repository instances.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository of the given type.
    pub async fn create(
        repo_type: RepositoryType,
        postgres_config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        match repo_type {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => match postgres_config {
                Some(config) => Self::postgres(config).await,
                None => Err(RepositoryError::configuration(
                    "Postgres repository requires PostgresConfig",
                )),
            },
        }
    }

    /// Create a repository from environment configuration.
    pub async fn from_env() -> RepositoryResult<Arc<dyn FullRepository>> {
        match RepositoryType::from_env() {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config =
                        PostgresConfig::from_env().map_err(RepositoryError::configuration)?;
                    Self::postgres(&config).await
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    Err(RepositoryError::configuration(
                        "Postgres repository feature not enabled",
                    ))
                }
            }
        }
    }

    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create a Postgres repository, running pending migrations.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> RepositoryResult<Arc<PostgresRepository>> {
        Ok(Arc::new(PostgresRepository::new(config.clone())?))
    }

    #[cfg(feature = "postgres-repo")]
    async fn postgres(config: &PostgresConfig) -> RepositoryResult<Arc<dyn FullRepository>> {
        Ok(Self::create_postgres(config).await? as Arc<dyn FullRepository>)
    }

    #[cfg(not(feature = "postgres-repo"))]
    async fn postgres(_config: &PostgresConfig) -> RepositoryResult<Arc<dyn FullRepository>> {
        Err(RepositoryError::configuration(
            "Postgres repository feature not enabled",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_type_parsing() {
        assert_eq!(
            RepositoryType::from_str("postgres").unwrap(),
            RepositoryType::Postgres
        );
        assert_eq!(RepositoryType::from_str("pg").unwrap(), RepositoryType::Postgres);
        assert_eq!(
            RepositoryType::from_str("LOCAL").unwrap(),
            RepositoryType::Local
        );
        assert!(RepositoryType::from_str("mysql").is_err());
    }

    #[tokio::test]
    async fn test_create_local() {
        use crate::db::repository::WeeklyRuleRepository;

        let repo = RepositoryFactory::create_local();
        assert!(repo.health_check().await.unwrap());
    }
}
