//! Repository provisioning: slug derivation, the persisted record, and the
//! transactional create operation that ties the database to the filesystem.

pub mod error;
pub mod provisioner;
pub mod record;
pub mod slug;

pub use error::ProvisionError;
pub use provisioner::Provisioner;
pub use record::RepositoryRecord;
