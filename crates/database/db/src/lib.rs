//! The storage of the sync committee progress: batches, fetch progress, proved state root and
//! proof tasks.

pub use error::DatabaseError;
mod error;

pub use memory::{InMemoryDatabase, StorageConfig, DEFAULT_MAX_BATCHES};
mod memory;

mod metrics;

pub use storage::BatchStorage;
mod storage;
