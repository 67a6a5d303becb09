//! The create-repository operation.
//!
//! A metadata row and a bare repository on disk must appear together.  The
//! row is inserted inside a transaction, the repository is initialised while
//! that transaction is still open, and the transaction commits only once the
//! repository exists.  Every other exit rolls the transaction back before
//! its pooled connection is released.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sqlx::{AnyConnection, AnyPool};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::error::ProvisionError;
use super::record::{CreateRepositoryRequest, RepositoryRecord};
use crate::config::RepositoriesConfig;
use crate::git;
use crate::store;

#[derive(Clone)]
pub struct Provisioner {
    pool: AnyPool,
    git_root: Arc<str>,
    init_timeout: Duration,
}

impl Provisioner {
    pub fn new(pool: AnyPool, config: &RepositoriesConfig) -> Self {
        Self {
            pool,
            git_root: Arc::from(config.git_root.as_str()),
            init_timeout: config.init_timeout(),
        }
    }

    pub fn git_root(&self) -> &str {
        &self.git_root
    }

    /// Provision a repository described by the JSON `body`.
    ///
    /// On success the returned record is committed and a bare repository
    /// exists at its `path`.  On failure no record is committed; if the
    /// failure is the commit itself, the repository on disk is left behind
    /// and logged.
    #[instrument(skip_all)]
    pub async fn create_repository(&self, body: &[u8]) -> Result<RepositoryRecord, ProvisionError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|source| ProvisionError::database("failed to start transaction", source))?;

        let record = match self.stage(&mut tx, body).await {
            Ok(record) => record,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                return Err(err);
            }
        };

        if let Err(source) = tx.commit().await {
            error!(
                id = %record.id,
                path = %record.path,
                error = %source,
                "commit failed after the bare repository was created; \
                 repository on disk has no metadata record"
            );
            return Err(ProvisionError::database(
                "failed to commit transaction",
                source,
            ));
        }

        info!(id = %record.id, path = %record.path, "repository created");
        Ok(record)
    }

    /// Everything between `BEGIN` and `COMMIT`.
    async fn stage(
        &self,
        conn: &mut AnyConnection,
        body: &[u8],
    ) -> Result<RepositoryRecord, ProvisionError> {
        let request = CreateRepositoryRequest::parse(body)?;
        let record = RepositoryRecord::new(request, Uuid::new_v4(), &self.git_root);
        info!(name = %record.name, path = %record.path, "creating repository");

        store::insert_repository(conn, &record)
            .await
            .map_err(|source| {
                ProvisionError::database("failed to insert repository into database", source)
            })?;

        git::init_bare_repo(Path::new(&record.path), self.init_timeout).await?;
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
