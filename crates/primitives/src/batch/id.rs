use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The globally unique identifier of a [`BlockBatch`](super::BlockBatch).
///
/// The textual form is used as the key of the batch in storage and as the argument of the per
/// batch queries of the rollup contract.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct BatchId(Uuid);

impl BatchId {
    /// Returns a new random [`BatchId`].
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner [`Uuid`].
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the raw bytes of the identifier.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::str::FromStr for BatchId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(any(test, feature = "arbitrary"))]
impl<'a> arbitrary::Arbitrary<'a> for BatchId {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self(uuid::Builder::from_random_bytes(u.arbitrary()?).into_uuid()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_text_form() -> eyre::Result<()> {
        let id = BatchId::new();
        let parsed: BatchId = id.to_string().parse()?;

        assert_eq!(parsed, id);
        assert_ne!(BatchId::new(), id);
        Ok(())
    }
}
