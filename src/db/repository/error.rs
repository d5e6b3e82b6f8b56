//! Error types shared by every store backend.
//!
//! Each error carries an [`ErrorContext`] naming the operation, entity, and
//! id involved, so a failed booking or rule update can be traced from the
//! log line alone.

use std::fmt;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Where and on what an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Store operation, e.g. "create_session" or "update_rule".
    pub operation: Option<String>,
    /// Entity kind, e.g. "weekly_rule", "special_day", "session".
    pub entity: Option<String>,
    /// Surrogate id of the entity, when known.
    pub entity_id: Option<String>,
    /// Free-form extras, e.g. the id of a blocking session.
    pub details: Option<String>,
    /// Whether retrying the operation can succeed.
    pub retryable: bool,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        ErrorContext {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        write!(f, "(")?;
        for (key, value) in [
            ("operation", &self.operation),
            ("entity", &self.entity),
            ("id", &self.entity_id),
            ("details", &self.details),
        ] {
            if let Some(value) = value {
                write!(f, "{}{}={}", sep, key, value)?;
                sep = ", ";
            }
        }
        if self.retryable {
            write!(f, "{}retryable=true", sep)?;
        }
        write!(f, ")")
    }
}

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Pool or database connection failure, usually transient.
    #[error("Connection error: {message} {context}")]
    ConnectionError {
        message: String,
        context: ErrorContext,
    },

    /// Query execution failure.
    #[error("Query error: {message} {context}")]
    QueryError {
        message: String,
        context: ErrorContext,
    },

    /// The addressed rule, day, lesson, session, or participant is absent.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// A uniqueness or overlap constraint was violated: duplicate weekly
    /// rule, duplicate special day, duplicate enrollment, or a session
    /// overlapping an existing one for the same teacher.
    #[error("Conflict: {message} {context}")]
    Conflict {
        message: String,
        context: ErrorContext,
    },

    /// Input rejected before it reached the store.
    #[error("Data validation error: {message} {context}")]
    ValidationError {
        message: String,
        context: ErrorContext,
    },

    /// Backend selection or connection settings are unusable.
    #[error("Configuration error: {message} {context}")]
    ConfigurationError {
        message: String,
        context: ErrorContext,
    },

    /// Anything that should not happen with well-formed stored data.
    #[error("Internal error: {message} {context}")]
    InternalError {
        message: String,
        context: ErrorContext,
    },

    /// Timed out waiting for a connection or a query.
    #[error("Timeout error: {message} {context}")]
    TimeoutError {
        message: String,
        context: ErrorContext,
    },
}

/// Shorthand constructors: a bare-message form and a with-context form per
/// variant that call sites actually build by hand.
macro_rules! error_ctors {
    ($($plain:ident / $with_context:ident => $variant:ident),* $(,)?) => {
        impl RepositoryError {
            $(
                pub fn $plain(message: impl Into<String>) -> Self {
                    Self::$with_context(message, ErrorContext::default())
                }

                pub fn $with_context(
                    message: impl Into<String>,
                    context: ErrorContext,
                ) -> Self {
                    Self::$variant {
                        message: message.into(),
                        context,
                    }
                }
            )*
        }
    };
}

error_ctors!(
    query / query_with_context => QueryError,
    not_found / not_found_with_context => NotFound,
    conflict / conflict_with_context => Conflict,
    validation / validation_with_context => ValidationError,
    configuration / configuration_with_context => ConfigurationError,
    internal / internal_with_context => InternalError,
);

impl RepositoryError {
    /// Connection errors are retryable by default.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::connection_with_context(message, ErrorContext::default())
    }

    pub fn connection_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ConnectionError {
            message: message.into(),
            context: context.retryable(),
        }
    }

    /// Timeouts are retryable by default.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::TimeoutError {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Whether a retry has any chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        self.context().retryable
    }

    /// The structured context attached to this error.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ConnectionError { context, .. }
            | Self::QueryError { context, .. }
            | Self::NotFound { context, .. }
            | Self::Conflict { context, .. }
            | Self::ValidationError { context, .. }
            | Self::ConfigurationError { context, .. }
            | Self::InternalError { context, .. }
            | Self::TimeoutError { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::ConnectionError { context, .. }
            | Self::QueryError { context, .. }
            | Self::NotFound { context, .. }
            | Self::Conflict { context, .. }
            | Self::ValidationError { context, .. }
            | Self::ConfigurationError { context, .. }
            | Self::InternalError { context, .. }
            | Self::TimeoutError { context, .. } => context,
        }
    }

    /// Stamp the operation name onto the context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }
}

impl From<String> for RepositoryError {
    fn from(s: String) -> Self {
        RepositoryError::internal(s)
    }
}

impl From<&str> for RepositoryError {
    fn from(s: &str) -> Self {
        RepositoryError::internal(s.to_string())
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::NotFound => RepositoryError::not_found("Record not found"),
            Error::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                let context =
                    ErrorContext::default().with_details(format!("db_error_kind={:?}", kind));

                match kind {
                    DatabaseErrorKind::UniqueViolation => {
                        RepositoryError::conflict_with_context(message, context)
                    }
                    // Serialization failures can succeed on retry.
                    DatabaseErrorKind::SerializationFailure => {
                        RepositoryError::query_with_context(message, context.retryable())
                    }
                    _ => RepositoryError::query_with_context(message, context),
                }
            }
            Error::QueryBuilderError(e) => {
                RepositoryError::query(format!("Query builder error: {}", e))
            }
            Error::DeserializationError(e) => {
                RepositoryError::internal(format!("Deserialization error: {}", e))
            }
            Error::SerializationError(e) => {
                RepositoryError::internal(format!("Serialization error: {}", e))
            }
            other => RepositoryError::query(other.to_string()),
        }
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        RepositoryError::connection_with_context(
            err.to_string(),
            ErrorContext::default().with_details("pool_error"),
        )
    }
}
