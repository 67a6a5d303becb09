//! Bare Git repository creation on the local filesystem.
//!
//! Repositories are created through libgit2 (`git2`), which performs its
//! process-wide library initialisation exactly once behind a thread-safe
//! guard.  Nothing in this crate calls into libgit2's init/shutdown directly.

pub mod bare_repo;

pub use bare_repo::{init_bare_repo, BareRepoError};
