//! Bare Git repository initialisation.
//!
//! libgit2 is synchronous, so the work runs on Tokio's blocking pool and is
//! bounded by a caller-supplied timeout.  A timed-out initialisation keeps
//! running on its blocking thread; the caller only stops waiting for it.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BareRepoError {
    /// Something other than an empty directory already occupies the path.
    #[error("path already exists and is not empty: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("filesystem error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("git init --bare failed: {0}")]
    Git(#[from] git2::Error),

    #[error("bare repository initialisation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("bare repository initialisation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Initialise a new bare Git repository at `path`.
///
/// Missing parent directories are created.  Unlike `git init`, an existing
/// repository (or any other non-empty directory or file) at `path` is an
/// error rather than a re-initialisation.
#[instrument(fields(path = %path.display()))]
pub async fn init_bare_repo(path: &Path, timeout: Duration) -> Result<(), BareRepoError> {
    let target = path.to_path_buf();
    let task = tokio::task::spawn_blocking(move || init_bare_repo_sync(&target));

    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined?,
        Err(_) => Err(BareRepoError::TimedOut(timeout)),
    }
}

fn init_bare_repo_sync(path: &Path) -> Result<(), BareRepoError> {
    ensure_vacant(path)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| BareRepoError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let repo = git2::Repository::init_bare(path)?;
    debug!(git_dir = %repo.path().display(), "bare repo initialised");
    Ok(())
}

/// Succeeds when `path` does not exist or is an empty directory.
fn ensure_vacant(path: &Path) -> Result<(), BareRepoError> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(BareRepoError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if !meta.is_dir() {
        return Err(BareRepoError::AlreadyExists(path.to_path_buf()));
    }

    let mut entries = std::fs::read_dir(path).map_err(|source| BareRepoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if entries.next().is_some() {
        return Err(BareRepoError::AlreadyExists(path.to_path_buf()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
