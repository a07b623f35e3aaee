//! # Mesh Record
//!
//! Signed node records: the compact key/value document a node gossips to
//! advertise its identity and connectivity. Information is stored in
//! key/value pairs; to store and retrieve values, use the [`Entry`] trait.
//!
//! ## Signature Handling
//!
//! Records must be signed before transmitting them to another node.
//!
//! Decoding a record doesn't check its signature. Code working with records
//! from an untrusted source must always verify two things: that the record
//! uses an identity scheme deemed secure, and that the signature is valid
//! according to the declared scheme.
//!
//! When creating a record, set the entries you want and use a signing
//! function provided by the identity scheme to add the signature. Modifying
//! a record invalidates the signature.
//!
//! This crate ships the `"m1"` (Ed25519 + Blake3) identity scheme; the
//! [`IdentityScheme`] trait and [`SchemeRegistry`] keep the set open.
//!
//! ## Key Types
//!
//! - [`Record`] - The ordered, signed key/value document
//! - [`Entry`] - Capability for values stored in a record
//! - [`IdentityScheme`] - Pluggable signature verification and address derivation
//! - [`SchemeRegistry`] - Name-keyed registry of identity schemes

pub mod crypto;
pub mod entries;
pub mod error;
pub mod record;
pub mod scheme;
pub mod wire;

pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use entries::{Entry, Ip4, Ip6, SchemeName, Tcp, Tcp6, Udp, Udp6};
pub use error::{KeyError, KeyErrorKind, RecordError};
pub use record::{Record, SIZE_LIMIT};
pub use scheme::{Ed25519Key, Ed25519Scheme, IdentityScheme, SchemeRegistry};
pub use wire::{ListBuilder, WireError};
