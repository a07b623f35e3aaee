//! Error types for node record handling.

use thiserror::Error;

use crate::wire::WireError;

/// Errors produced while mutating, signing, encoding, or decoding a record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid signature on node record")]
    InvalidSignature,

    #[error("record key/value pairs are not sorted by key")]
    NotSorted,

    #[error("record contains duplicate key")]
    DuplicateKey,

    #[error("record contains incomplete k/v pair")]
    IncompletePair,

    #[error("record contains fewer than two list elements")]
    IncompleteHeader,

    #[error("record bigger than {} bytes", crate::record::SIZE_LIMIT)]
    SizeExceeded,

    #[error("can't encode unsigned record")]
    EncodeUnsigned,

    #[error("record wire format: {0}")]
    Wire(#[from] WireError),
}

/// The failure cause carried by a [`KeyError`].
#[derive(Debug, Error)]
pub enum KeyErrorKind {
    #[error("no such key in record")]
    NotFound,

    #[error("value decoding failed: {0}")]
    Decode(WireError),
}

/// Error returned by [`Record::get`](crate::Record::get).
///
/// Every lookup failure carries the offending key. Use [`KeyError::is_not_found`]
/// to distinguish a missing key from a present-but-undecodable value.
#[derive(Debug, Error)]
#[error("record key {key:?}: {kind}")]
pub struct KeyError {
    key: String,
    kind: KeyErrorKind,
}

impl KeyError {
    pub(crate) fn not_found(key: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: KeyErrorKind::NotFound,
        }
    }

    pub(crate) fn decode(key: &str, err: WireError) -> Self {
        Self {
            key: key.to_string(),
            kind: KeyErrorKind::Decode(err),
        }
    }

    /// The key the failed lookup was for.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying cause.
    pub fn kind(&self) -> &KeyErrorKind {
        &self.kind
    }

    /// True if the key was absent from the record.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, KeyErrorKind::NotFound)
    }

    /// True if the key was present but its value did not decode.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self.kind, KeyErrorKind::Decode(_))
    }
}
