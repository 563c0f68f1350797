/// An error occurring while packing data into blobs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    /// The data does not fit in the allowed number of blobs.
    #[error("data of {size} bytes exceeds blob capacity of {capacity} bytes")]
    TooLarge {
        /// The size of the data.
        size: usize,
        /// The capacity of the allowed blobs.
        capacity: usize,
    },
    /// A word of the blob is not a canonical field element.
    #[error("non canonical word {word} in blob {blob}")]
    NonCanonicalWord {
        /// The index of the blob.
        blob: usize,
        /// The index of the word in the blob.
        word: usize,
    },
}

/// An error occurring while decoding a pruned batch.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The blobs could not be unpacked.
    #[error(transparent)]
    Blob(#[from] BlobError),
    /// The payload is not a valid pruned batch.
    #[error(transparent)]
    Rlp(#[from] alloy_rlp::Error),
}
