use thiserror::Error;

use crate::git::BareRepoError;
use crate::metrics::Outcome;

/// Failure of a single create-repository request, classified by where it
/// originated.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Malformed or incomplete request body.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Connection, transaction, or statement failure.
    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The bare repository could not be created on disk.
    #[error("failed to create repository: {0}")]
    RepositoryInit(#[from] BareRepoError),
}

impl ProvisionError {
    pub fn database(context: &'static str, source: sqlx::Error) -> Self {
        Self::Database { context, source }
    }

    /// `true` when the caller can fix the request and retry.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Validation(_) => Outcome::ValidationError,
            Self::Database { .. } => Outcome::DatabaseError,
            Self::RepositoryInit(_) => Outcome::RepositoryInitError,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn database_display_carries_context() {
        let err = ProvisionError::database("failed to start transaction", sqlx::Error::PoolClosed);
        assert!(err
            .to_string()
            .starts_with("failed to start transaction: "));
        assert!(!err.is_client_error());
        assert_eq!(err.outcome(), Outcome::DatabaseError);
    }

    #[test]
    fn init_errors_are_server_side() {
        let err: ProvisionError = BareRepoError::AlreadyExists(PathBuf::from("/srv/git/a.git")).into();
        assert_eq!(
            err.to_string(),
            "failed to create repository: path already exists and is not empty: /srv/git/a.git"
        );
        assert!(!err.is_client_error());
        assert_eq!(err.outcome(), Outcome::RepositoryInitError);
    }

    #[test]
    fn validation_is_client_side() {
        let err = ProvisionError::Validation("name must not be empty".into());
        assert!(err.is_client_error());
        assert_eq!(err.outcome(), Outcome::ValidationError);
    }
}
