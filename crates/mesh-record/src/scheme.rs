//! Identity schemes: signature verification and node-address derivation.
//!
//! A record declares the scheme that authenticates it in its reserved `"id"`
//! entry. Consumers look the name up in a [`SchemeRegistry`] and must call
//! [`Record::verify_signature`](crate::Record::verify_signature) before
//! trusting anything else in the record.

use serde::de::{Error as DeError, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::entries::{Entry, SchemeName};
use crate::error::RecordError;
use crate::record::Record;

/// A capability that can verify record signatures and derive node addresses.
pub trait IdentityScheme {
    /// Check `sig` against the record's signing payload.
    fn verify(&self, record: &Record, sig: &[u8]) -> Result<(), RecordError>;

    /// Derive the node address advertised by the record, if possible.
    fn node_addr(&self, record: &Record) -> Option<Vec<u8>>;
}

/// A registry of named identity schemes.
///
/// Lookups use the scheme name the record itself declares. The two
/// operations fail differently on an unknown name: `verify` fails closed
/// with [`RecordError::InvalidSignature`], while `node_addr` fails open and
/// returns `None`. The asymmetry is part of the contract: verification is
/// security-critical, address derivation is best-effort.
///
/// Populate the registry before sharing it across threads; lookups after
/// that point are read-only.
#[derive(Default, Clone)]
pub struct SchemeRegistry {
    schemes: HashMap<String, Arc<dyn IdentityScheme + Send + Sync>>,
}

impl SchemeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the stock schemes registered.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        reg.register(Ed25519Scheme::NAME, Arc::new(Ed25519Scheme));
        reg
    }

    /// Register a scheme under the given name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        scheme: Arc<dyn IdentityScheme + Send + Sync>,
    ) {
        self.schemes.insert(name.into(), scheme);
    }

    fn lookup(&self, record: &Record) -> Option<&Arc<dyn IdentityScheme + Send + Sync>> {
        self.schemes.get(&record.identity_scheme_name())
    }
}

impl IdentityScheme for SchemeRegistry {
    fn verify(&self, record: &Record, sig: &[u8]) -> Result<(), RecordError> {
        match self.lookup(record) {
            Some(scheme) => scheme.verify(record, sig),
            None => Err(RecordError::InvalidSignature),
        }
    }

    fn node_addr(&self, record: &Record) -> Option<Vec<u8>> {
        self.lookup(record)?.node_addr(record)
    }
}

impl fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.schemes.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("SchemeRegistry").field("schemes", &names).finish()
    }
}

/// The record entry holding an Ed25519 public key, stored under
/// `"ed25519"` as a 32-byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Key(pub Ed25519PublicKey);

impl Entry for Ed25519Key {
    fn key() -> &'static str {
        "ed25519"
    }
}

impl Serialize for Ed25519Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0.as_bytes())
    }
}

impl<'de> Deserialize<'de> for Ed25519Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = [u8; 32];

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a 32-byte public key")
            }

            fn visit_bytes<E: DeError>(self, v: &[u8]) -> Result<Self::Value, E> {
                v.try_into().map_err(|_| E::invalid_length(v.len(), &self))
            }
        }

        let bytes = deserializer.deserialize_bytes(KeyVisitor)?;
        Ok(Self(Ed25519PublicKey::from_bytes(bytes)))
    }
}

/// The stock identity scheme: Ed25519 signatures over the signing payload,
/// node address derived as the Blake3 hash of the public key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Scheme;

impl Ed25519Scheme {
    /// The name this scheme is declared under in the `"id"` entry.
    pub const NAME: &'static str = "m1";

    /// Sign `record` with `keypair`.
    ///
    /// Sets the `"id"` and `"ed25519"` entries, signs the resulting payload,
    /// and installs the signature through the record's verify-then-cache
    /// path. Fails if the signed encoding would exceed the size limit.
    pub fn sign_record(&self, keypair: &Keypair, record: &mut Record) -> Result<(), RecordError> {
        record.set(&SchemeName::from(Self::NAME));
        record.set(&Ed25519Key(keypair.public_key()));
        let sig = keypair.sign(&record.signing_payload());
        record.set_signature(self, sig.as_bytes())
    }
}

impl IdentityScheme for Ed25519Scheme {
    fn verify(&self, record: &Record, sig: &[u8]) -> Result<(), RecordError> {
        let key = record
            .get::<Ed25519Key>()
            .map_err(|_| RecordError::InvalidSignature)?;
        let sig: [u8; 64] = sig.try_into().map_err(|_| RecordError::InvalidSignature)?;
        key.0
            .verify(&record.signing_payload(), &Ed25519Signature::from_bytes(sig))
    }

    fn node_addr(&self, record: &Record) -> Option<Vec<u8>> {
        let key = record.get::<Ed25519Key>().ok()?;
        Some(Blake3Hash::hash(key.0.as_bytes()).as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::Udp;

    fn signed_record(keypair: &Keypair) -> Record {
        let mut r = Record::new();
        r.set(&Udp(30303));
        Ed25519Scheme.sign_record(keypair, &mut r).unwrap();
        r
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let r = signed_record(&keypair);

        assert_eq!(r.identity_scheme_name(), "m1");
        assert!(r.verify_signature(&Ed25519Scheme).is_ok());
    }

    #[test]
    fn test_tampered_signature_fails() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let r = signed_record(&keypair);

        let mut sig = r.signature().unwrap().to_vec();
        sig[0] ^= 0xff;
        assert!(matches!(
            Ed25519Scheme.verify(&r, &sig),
            Err(RecordError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let other = Keypair::from_seed(&[0x43; 32]);
        let mut r = signed_record(&keypair);
        let sig = r.signature().unwrap();

        // Re-point the record at a different key; the old signature must die.
        r.set(&Ed25519Key(other.public_key()));
        assert!(matches!(
            Ed25519Scheme.verify(&r, &sig),
            Err(RecordError::InvalidSignature)
        ));
    }

    #[test]
    fn test_node_addr_is_key_hash() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let r = signed_record(&keypair);

        let addr = Ed25519Scheme.node_addr(&r).unwrap();
        let expected = Blake3Hash::hash(keypair.public_key().as_bytes());
        assert_eq!(addr, expected.as_bytes().to_vec());
    }

    #[test]
    fn test_registry_delegates() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let r = signed_record(&keypair);
        let reg = SchemeRegistry::standard();

        assert!(r.verify_signature(&reg).is_ok());
        assert!(reg.node_addr(&r).is_some());
    }

    #[test]
    fn test_registry_unknown_scheme_fails_closed_on_verify() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let r = signed_record(&keypair);
        let reg = SchemeRegistry::new();

        assert!(matches!(
            r.verify_signature(&reg),
            Err(RecordError::InvalidSignature)
        ));
    }

    #[test]
    fn test_registry_unknown_scheme_fails_open_on_node_addr() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let r = signed_record(&keypair);
        let reg = SchemeRegistry::new();

        assert_eq!(reg.node_addr(&r), None);
    }

    #[test]
    fn test_missing_key_entry_fails_verification() {
        let mut r = Record::new();
        r.set(&SchemeName::from(Ed25519Scheme::NAME));
        r.set(&Udp(1));

        assert!(matches!(
            Ed25519Scheme.verify(&r, &[0u8; 64]),
            Err(RecordError::InvalidSignature)
        ));
    }
}
