//! The codec of the sync committee: packing of batches into blobs of canonical field elements.

pub use batch::{decode_batch, encode_batch, PrunedBatch, PrunedBlock};
mod batch;

pub use blob::{BlobBuilder, USABLE_BYTES_PER_BLOB};
mod blob;

pub use error::{BlobError, CodecError};
mod error;
