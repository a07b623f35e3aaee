//! The node record: an ordered, signed key/value document.
//!
//! A record owns its pairs outright. Entries passed to [`Record::set`] are
//! copied into their encoded form; the record never retains a reference to
//! caller-owned values. The canonical encoding of the signed state is cached
//! and invalidated atomically with every mutation, so a stale signature can
//! never be observed.

use bytes::Bytes;

use crate::entries::{Entry, SchemeName};
use crate::error::{KeyError, RecordError};
use crate::scheme::IdentityScheme;
use crate::wire::{self, ListBuilder, Reader, WireError};

/// Maximum encoded size of a node record in bytes.
///
/// Records are rebroadcast by the gossip layer; bounding their size bounds
/// worst-case amplification and per-record memory. Enforced when signing and
/// again before any structural parse of incoming bytes.
pub const SIZE_LIMIT: usize = 300;

/// A key/value pair in a record. The value is kept in its encoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pair {
    key: String,
    value: Bytes,
}

/// A node record. The default value is an empty, unsigned record.
///
/// Records must be signed before transmitting them to another node.
///
/// Decoding a record doesn't check its signature. Code working with records
/// from an untrusted source must always verify two things: that the record
/// uses an identity scheme deemed secure, and that the signature is valid
/// according to the declared scheme.
///
/// When creating a record, set the entries you want and use a signing
/// function provided by the identity scheme to add the signature. Modifying
/// a record invalidates the signature.
#[derive(Debug, Clone, Default)]
pub struct Record {
    seq: u64,
    signature: Option<Bytes>,
    raw: Option<Bytes>,
    pairs: Vec<Pair>,
}

impl Record {
    /// Create an empty, unsigned record with sequence number 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Update the sequence number. This invalidates any signature on the
    /// record and does not apply the increment-on-mutate policy.
    ///
    /// Calling `set_seq` is usually not required because setting any key in
    /// a signed record increments the sequence number.
    pub fn set_seq(&mut self, seq: u64) {
        self.signature = None;
        self.raw = None;
        self.seq = seq;
    }

    /// The encoded size of the record.
    ///
    /// Signed records report the cached encoding's length; unsigned records
    /// report the length the encoding would have, without materializing it.
    pub fn size(&self) -> u64 {
        if let Some(raw) = &self.raw {
            return raw.len() as u64;
        }
        self.compute_size()
    }

    fn compute_size(&self) -> u64 {
        let sig_len = self.signature.as_ref().map_or(0, |s| s.len() as u64);
        let mut payload = wire::bytes_size(sig_len) + wire::uint_size(self.seq);
        for p in &self.pairs {
            payload += wire::text_size(p.key.len() as u64) + p.value.len() as u64;
        }
        wire::list_size(2 + 2 * self.pairs.len() as u64, payload)
    }

    /// Retrieve the entry stored under `E`'s key.
    ///
    /// Failures carry the key; use [`KeyError::is_not_found`] to distinguish
    /// a missing key from a present-but-undecodable value.
    pub fn get<E: Entry>(&self) -> Result<E, KeyError> {
        let key = E::key();
        match self.pairs.binary_search_by(|p| p.key.as_str().cmp(key)) {
            Ok(i) => {
                wire::decode_entry(&self.pairs[i].value).map_err(|err| KeyError::decode(key, err))
            }
            Err(_) => Err(KeyError::not_found(key)),
        }
    }

    /// Add or update the given entry in the record.
    ///
    /// If the record is signed, this increments the sequence number and
    /// invalidates the signature.
    ///
    /// # Panics
    ///
    /// Panics if the entry cannot be encoded. Every supported entry type is
    /// always encodable; a failure here is a caller bug, not a runtime
    /// condition.
    pub fn set<E: Entry>(&mut self, entry: &E) {
        let key = E::key();
        let value = match wire::encode_entry(entry) {
            Ok(blob) => Bytes::from(blob),
            Err(err) => panic!("mesh-record: can't encode entry {key:?}: {err}"),
        };
        self.invalidate();

        match self.pairs.binary_search_by(|p| p.key.as_str().cmp(key)) {
            Ok(i) => self.pairs[i].value = value,
            Err(i) => self.pairs.insert(
                i,
                Pair {
                    key: key.to_string(),
                    value,
                },
            ),
        }
    }

    fn invalidate(&mut self) {
        if self.signature.is_some() {
            // A signed record may already be in other nodes' hands; the
            // mutated copy must be recognizable as newer.
            self.seq = self.seq.saturating_add(1);
        }
        self.signature = None;
        self.raw = None;
    }

    /// The record's signature, if it is signed.
    ///
    /// Returns an immutable copy; the record's cached state cannot be
    /// reached through it.
    pub fn signature(&self) -> Option<Bytes> {
        self.signature.clone()
    }

    /// Install a signature that the given scheme accepts for this record.
    ///
    /// The signature is verified first, then the canonical encoding is
    /// recomputed with it and checked against [`SIZE_LIMIT`]. On any failure
    /// the record's prior signed or unsigned state is untouched.
    pub fn set_signature(
        &mut self,
        scheme: &dyn IdentityScheme,
        sig: &[u8],
    ) -> Result<(), RecordError> {
        scheme.verify(self, sig)?;
        let raw = self.encode_with(sig)?;
        self.signature = Some(Bytes::copy_from_slice(sig));
        self.raw = Some(raw);
        Ok(())
    }

    /// Remove the signature explicitly, leaving pairs and sequence intact.
    pub fn clear_signature(&mut self) {
        self.signature = None;
        self.raw = None;
    }

    /// The name of the identity scheme declared in the record, from the
    /// reserved `"id"` entry. Empty if the record does not declare one.
    pub fn identity_scheme_name(&self) -> String {
        self.get::<SchemeName>().map(|id| id.0).unwrap_or_default()
    }

    /// Check whether the record is signed using the given identity scheme.
    pub fn verify_signature(&self, scheme: &dyn IdentityScheme) -> Result<(), RecordError> {
        match &self.signature {
            Some(sig) => scheme.verify(self, sig),
            None => Err(RecordError::InvalidSignature),
        }
    }

    /// Append the sequence number and the sorted pairs to the given list:
    /// `[seq, key1, value1, key2, value2, ...]`.
    ///
    /// This is the element sequence both the signing payload and the full
    /// record encoding are built from.
    pub fn append_canonical_elements(&self, list: &mut ListBuilder) {
        list.push_uint(self.seq);
        for p in &self.pairs {
            list.push_text(&p.key);
            list.push_raw(&p.value);
        }
    }

    /// The canonical bytes identity schemes sign and verify: the element
    /// list above, wrapped as a single container.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut list = ListBuilder::new();
        self.append_canonical_elements(&mut list);
        list.finish()
    }

    fn encode_with(&self, sig: &[u8]) -> Result<Bytes, RecordError> {
        let mut list = ListBuilder::new();
        list.push_bytes(sig);
        self.append_canonical_elements(&mut list);
        let raw = list.finish();
        if raw.len() > SIZE_LIMIT {
            return Err(RecordError::SizeExceeded);
        }
        Ok(Bytes::from(raw))
    }

    /// The canonical encoding of the record. Fails if the record is
    /// unsigned: an unsigned record cannot be transmitted.
    pub fn to_bytes(&self) -> Result<Bytes, RecordError> {
        match &self.raw {
            Some(raw) => Ok(raw.clone()),
            None => Err(RecordError::EncodeUnsigned),
        }
    }

    /// Decode a record from canonical bytes. Decoding doesn't verify the
    /// signature.
    ///
    /// Validation happens in decode order: the size ceiling before any
    /// structural parse, then the container header, signature, and sequence,
    /// then the pairs with strict key ordering and uniqueness. On any
    /// failure nothing is returned; no partially decoded record escapes.
    pub fn from_bytes(input: &[u8]) -> Result<Self, RecordError> {
        if input.len() > SIZE_LIMIT {
            return Err(RecordError::SizeExceeded);
        }

        let mut r = Reader::new(input);
        let count = r.array_header()?;
        if count < 2 {
            return Err(RecordError::IncompleteHeader);
        }
        let signature = Bytes::copy_from_slice(r.bytes()?);
        let seq = r.uint()?;

        let rest = count - 2;
        if rest % 2 != 0 {
            return Err(RecordError::IncompletePair);
        }
        // Every element takes at least one byte; a count that outruns the
        // input is truncation, not an allocation request.
        if rest > r.remaining() as u64 {
            return Err(RecordError::Wire(WireError::UnexpectedEof));
        }

        let mut pairs: Vec<Pair> = Vec::with_capacity((rest / 2) as usize);
        for _ in 0..rest / 2 {
            let key = r.text()?;
            let value = r.raw_item()?;
            if let Some(prev) = pairs.last() {
                if key == prev.key {
                    return Err(RecordError::DuplicateKey);
                }
                if key < prev.key.as_str() {
                    return Err(RecordError::NotSorted);
                }
            }
            pairs.push(Pair {
                key: key.to_string(),
                value: Bytes::copy_from_slice(value),
            });
        }
        if !r.is_empty() {
            return Err(RecordError::Wire(WireError::TrailingBytes));
        }

        Ok(Self {
            seq,
            signature: Some(signature),
            raw: Some(Bytes::copy_from_slice(input)),
            pairs,
        })
    }
}

// Equality ignores the cached encoding: it is derived state.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq && self.signature == other.signature && self.pairs == other.pairs
    }
}

impl Eq for Record {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::{Ip4, Udp};
    use serde::{Deserialize, Serialize};
    use std::net::Ipv4Addr;

    /// Test scheme that accepts any signature.
    struct AcceptAll;

    impl IdentityScheme for AcceptAll {
        fn verify(&self, _record: &Record, _sig: &[u8]) -> Result<(), RecordError> {
            Ok(())
        }

        fn node_addr(&self, _record: &Record) -> Option<Vec<u8>> {
            None
        }
    }

    /// Test scheme that rejects everything.
    struct RejectAll;

    impl IdentityScheme for RejectAll {
        fn verify(&self, _record: &Record, _sig: &[u8]) -> Result<(), RecordError> {
            Err(RecordError::InvalidSignature)
        }

        fn node_addr(&self, _record: &Record) -> Option<Vec<u8>> {
            None
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct BigText(String);

    impl Entry for BigText {
        fn key() -> &'static str {
            "big"
        }
    }

    // Claims the "udp" slot but expects a string value.
    #[derive(Debug, Serialize, Deserialize)]
    struct UdpAsText(String);

    impl Entry for UdpAsText {
        fn key() -> &'static str {
            "udp"
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct FloatEntry(f64);

    impl Entry for FloatEntry {
        fn key() -> &'static str {
            "float"
        }
    }

    #[test]
    fn test_empty_record() {
        let r = Record::new();
        assert_eq!(r.seq(), 0);
        assert!(r.signature().is_none());
        assert_eq!(r.identity_scheme_name(), "");
    }

    #[test]
    fn test_pairs_stay_sorted() {
        let mut r = Record::new();
        r.set(&Udp(1));
        r.set(&Ip4(Ipv4Addr::new(10, 0, 0, 1)));
        r.set(&SchemeName::from("m1"));
        r.set(&Udp(2));

        let keys: Vec<&str> = r.pairs.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["id", "ip", "udp"]);
        assert_eq!(r.get::<Udp>().unwrap(), Udp(2));
    }

    #[test]
    fn test_set_on_unsigned_keeps_seq() {
        let mut r = Record::new();
        r.set(&Udp(1));
        r.set(&Udp(2));
        r.set(&Ip4(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(r.seq(), 0);
    }

    #[test]
    fn test_set_on_signed_increments_seq_and_unsigns() {
        let mut r = Record::new();
        r.set(&Udp(1));
        r.set_signature(&AcceptAll, b"sig").unwrap();
        assert!(r.signature().is_some());

        r.set(&Udp(2));
        assert_eq!(r.seq(), 1);
        assert!(r.signature().is_none());
        assert!(r.to_bytes().is_err());
    }

    #[test]
    fn test_set_seq_always_unsigns() {
        let mut r = Record::new();
        r.set(&Udp(1));
        r.set_signature(&AcceptAll, b"sig").unwrap();

        r.set_seq(7);
        assert_eq!(r.seq(), 7);
        assert!(r.signature().is_none());
    }

    #[test]
    fn test_signature_returns_copy() {
        let mut r = Record::new();
        r.set_signature(&AcceptAll, b"S1").unwrap();
        let sig = r.signature().unwrap();
        assert_eq!(&sig[..], b"S1");
    }

    #[test]
    fn test_set_signature_failure_leaves_record_untouched() {
        let mut r = Record::new();
        r.set(&Udp(1));
        let before = r.clone();

        assert!(matches!(
            r.set_signature(&RejectAll, b"sig"),
            Err(RecordError::InvalidSignature)
        ));
        assert_eq!(r, before);
        assert!(r.signature().is_none());
    }

    #[test]
    fn test_sign_rejects_oversized_record() {
        let mut r = Record::new();
        r.set(&BigText("x".repeat(SIZE_LIMIT)));

        let err = r.set_signature(&AcceptAll, b"sig").unwrap_err();
        assert!(matches!(err, RecordError::SizeExceeded));
        assert!(r.signature().is_none());
        assert_eq!(r.seq(), 0);
    }

    #[test]
    fn test_size_matches_encoding() {
        let mut r = Record::new();
        r.set(&SchemeName::from("m1"));
        r.set(&Ip4(Ipv4Addr::new(127, 0, 0, 1)));
        r.set(&Udp(30303));

        let computed = r.size();
        r.set_signature(&AcceptAll, b"0123456789").unwrap();
        let encoded = r.to_bytes().unwrap();
        assert_eq!(encoded.len() as u64, r.size());

        // The unsigned estimate used a 0-byte signature placeholder; the
        // 10-byte signature adds exactly its own bytes.
        assert_eq!(computed + 10, r.size());
    }

    #[test]
    fn test_get_not_found() {
        let r = Record::new();
        let err = r.get::<Udp>().unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.key(), "udp");
    }

    #[test]
    fn test_get_decode_failure_is_not_not_found() {
        let mut r = Record::new();
        r.set(&Udp(30303));

        let err = r.get::<UdpAsText>().unwrap_err();
        assert!(err.is_decode_failure());
        assert!(!err.is_not_found());
        assert_eq!(err.key(), "udp");
    }

    #[test]
    #[should_panic(expected = "can't encode entry")]
    fn test_set_unencodable_entry_panics() {
        let mut r = Record::new();
        r.set(&FloatEntry(1.5));
    }

    #[test]
    fn test_identity_scheme_name_is_plain_entry() {
        let mut r = Record::new();
        assert_eq!(r.identity_scheme_name(), "");
        r.set(&SchemeName::from("m1"));
        assert_eq!(r.identity_scheme_name(), "m1");
    }

    #[test]
    fn test_verify_signature_unsigned_fails() {
        let r = Record::new();
        assert!(matches!(
            r.verify_signature(&AcceptAll),
            Err(RecordError::InvalidSignature)
        ));
    }

    #[test]
    fn test_encode_unsigned_fails() {
        let mut r = Record::new();
        r.set(&Udp(1));
        assert!(matches!(r.to_bytes(), Err(RecordError::EncodeUnsigned)));
    }

    #[test]
    fn test_roundtrip() {
        let mut r = Record::new();
        r.set(&SchemeName::from("m1"));
        r.set(&Ip4(Ipv4Addr::new(192, 168, 1, 5)));
        r.set(&Udp(30303));
        r.set_seq(3);
        r.set_signature(&AcceptAll, b"signature").unwrap();

        let bytes = r.to_bytes().unwrap();
        let decoded = Record::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, r);
        assert_eq!(decoded.seq(), 3);
        assert_eq!(decoded.size(), r.size());
        assert_eq!(decoded.get::<Udp>().unwrap(), Udp(30303));
        // The decoded record re-encodes to the identical input.
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_oversized_input() {
        let input = vec![0u8; SIZE_LIMIT + 1];
        assert!(matches!(
            Record::from_bytes(&input),
            Err(RecordError::SizeExceeded)
        ));
    }

    #[test]
    fn test_decode_rejects_incomplete_header() {
        // [sig] alone: one element only.
        let mut list = ListBuilder::new();
        list.push_bytes(b"sig");
        let input = list.finish();
        assert!(matches!(
            Record::from_bytes(&input),
            Err(RecordError::IncompleteHeader)
        ));
    }

    #[test]
    fn test_decode_rejects_dangling_key() {
        // [sig, seq, "a"]: key without value.
        let mut list = ListBuilder::new();
        list.push_bytes(b"sig");
        list.push_uint(0);
        list.push_text("a");
        let input = list.finish();
        assert!(matches!(
            Record::from_bytes(&input),
            Err(RecordError::IncompletePair)
        ));
    }

    #[test]
    fn test_decode_rejects_unsorted_keys() {
        let mut list = ListBuilder::new();
        list.push_bytes(b"sig");
        list.push_uint(0);
        list.push_text("b");
        list.push_uint(1);
        list.push_text("a");
        list.push_uint(2);
        let input = list.finish();
        assert!(matches!(
            Record::from_bytes(&input),
            Err(RecordError::NotSorted)
        ));
    }

    #[test]
    fn test_decode_rejects_duplicate_keys() {
        let mut list = ListBuilder::new();
        list.push_bytes(b"sig");
        list.push_uint(0);
        list.push_text("a");
        list.push_uint(1);
        list.push_text("a");
        list.push_uint(2);
        let input = list.finish();
        assert!(matches!(
            Record::from_bytes(&input),
            Err(RecordError::DuplicateKey)
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut r = Record::new();
        r.set(&Udp(1));
        r.set_signature(&AcceptAll, b"sig").unwrap();
        let mut input = r.to_bytes().unwrap().to_vec();
        input.push(0x00);

        assert!(matches!(
            Record::from_bytes(&input),
            Err(RecordError::Wire(WireError::TrailingBytes))
        ));
    }

    #[test]
    fn test_decode_rejects_lying_count() {
        // Array header claims 200 elements on a short body.
        let mut input = vec![0x98, 200];
        input.extend_from_slice(&[0x41, b's', 0x00]);
        assert!(matches!(
            Record::from_bytes(&input),
            Err(RecordError::Wire(WireError::UnexpectedEof))
        ));
    }
}
