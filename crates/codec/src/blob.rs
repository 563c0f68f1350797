use crate::BlobError;
use alloy_eips::eip4844::{Blob, FIELD_ELEMENTS_PER_BLOB};
use alloy_primitives::U256;

/// The size in bytes of a word of a blob.
const WORD_SIZE: usize = 32;

/// The number of data bits carried by a word. The two most significant bits of every word are
/// left unset so that the word is below the BLS modulus.
const BITS_PER_WORD: usize = 254;

/// The number of data bits carried by a blob.
const BITS_PER_BLOB: usize = BITS_PER_WORD * FIELD_ELEMENTS_PER_BLOB as usize;

/// The number of data bytes carried by a blob.
pub const USABLE_BYTES_PER_BLOB: usize = BITS_PER_BLOB / 8;

/// Packs a byte stream into blobs of canonical field elements.
///
/// The input is read as a continuous big-endian bit stream and written 254 bits at a time in the
/// low bits of each 32 bytes word. Since 254 is not a multiple of 8, the offset of a word within
/// its first input byte cycles through 0, 2, 4 and 6 bits. The last word is zero padded and only
/// the blobs holding data are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobBuilder {
    blob_limit: usize,
}

impl BlobBuilder {
    /// Returns a new [`BlobBuilder`] producing at most `blob_limit` blobs.
    pub const fn new(blob_limit: usize) -> Self {
        Self { blob_limit }
    }

    /// Returns the maximum number of blobs produced by the builder.
    pub const fn blob_limit(&self) -> usize {
        self.blob_limit
    }

    /// Returns the maximum number of input bytes the builder accepts.
    pub const fn capacity_bytes(&self) -> usize {
        self.blob_limit * USABLE_BYTES_PER_BLOB
    }

    /// Returns the number of blobs required to encode `size` bytes.
    pub const fn blobs_required(size: usize) -> usize {
        size.div_ceil(USABLE_BYTES_PER_BLOB)
    }

    /// Encodes the data into blobs. Returns an empty list for empty data and fails without
    /// producing any blob if the data exceeds the capacity of the builder.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Blob>, BlobError> {
        let capacity = self.capacity_bytes();
        if data.len() > capacity {
            return Err(BlobError::TooLarge { size: data.len(), capacity });
        }

        let words = (data.len() * 8).div_ceil(BITS_PER_WORD);
        let mut blobs = vec![Blob::ZERO; Self::blobs_required(data.len())];

        for word in 0..words {
            let value = read_word(data, word * BITS_PER_WORD);
            let blob = &mut blobs[word / FIELD_ELEMENTS_PER_BLOB as usize];
            let offset = (word % FIELD_ELEMENTS_PER_BLOB as usize) * WORD_SIZE;
            blob[offset..offset + WORD_SIZE].copy_from_slice(&value.to_be_bytes::<WORD_SIZE>());
        }

        Ok(blobs)
    }

    /// Recovers the bit stream packed in the blobs. The returned data keeps the zero padding of
    /// the last word and blob, it is up to the caller to know the length of the payload.
    pub fn decode(blobs: &[Blob]) -> Result<Vec<u8>, BlobError> {
        let mut data = vec![0u8; blobs.len() * USABLE_BYTES_PER_BLOB];

        for (blob_index, blob) in blobs.iter().enumerate() {
            for (word_index, word) in blob.chunks_exact(WORD_SIZE).enumerate() {
                if word[0] & 0b1100_0000 != 0 {
                    return Err(BlobError::NonCanonicalWord { blob: blob_index, word: word_index });
                }
                let bit = (blob_index * FIELD_ELEMENTS_PER_BLOB as usize + word_index) *
                    BITS_PER_WORD;
                write_word(&mut data, bit, U256::from_be_slice(word));
            }
        }

        Ok(data)
    }
}

/// Reads the 254 bits of `data` starting at `bit` into the low bits of a word. Bits past the end
/// of the data read as zero.
fn read_word(data: &[u8], bit: usize) -> U256 {
    let start = bit / 8;
    let shift = bit % 8;

    let mut window = [0u8; WORD_SIZE + 1];
    let available = data.len().saturating_sub(start).min(window.len());
    window[..available].copy_from_slice(&data[start..start + available]);

    let head = U256::from_be_slice(&window[..WORD_SIZE]) << shift;
    let tail = if shift == 0 { U256::ZERO } else { U256::from(window[WORD_SIZE] >> (8 - shift)) };
    (head | tail) >> 2usize
}

/// Writes the low 254 bits of `word` into `data` starting at `bit`. The target bits must be unset.
fn write_word(data: &mut [u8], bit: usize, word: U256) {
    let start = bit / 8;
    let shift = bit % 8;
    let aligned: U256 = word << 2usize;

    let shifted: U256 = aligned >> shift;
    let head = shifted.to_be_bytes::<WORD_SIZE>();
    for (target, byte) in data[start..].iter_mut().zip(head) {
        *target |= byte;
    }
    if shift != 0 {
        let spill = aligned.byte(0) << (8 - shift);
        if let Some(target) = data.get_mut(start + WORD_SIZE) {
            *target |= spill;
        }
    }
}
