//! The Entry capability and the well-known record entries.
//!
//! An entry is any value with a stable key that can round-trip through the
//! canonical codec. Records store entries pre-encoded; the concrete type is
//! only needed again at lookup time.

use serde::de::{Error as DeError, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// A value that can be stored in a record.
///
/// The key must be stable for the type: two entries with the same key
/// occupy the same slot in a record.
pub trait Entry: Serialize + serde::de::DeserializeOwned {
    /// The record key this entry is stored under.
    fn key() -> &'static str;
}

/// The reserved entry naming the identity scheme, stored under `"id"`.
///
/// It is an ordinary entry: nothing in record storage special-cases it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeName(pub String);

impl Entry for SchemeName {
    fn key() -> &'static str {
        "id"
    }
}

impl From<&str> for SchemeName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// IPv4 address, stored under `"ip"` as a 4-byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ip4(pub Ipv4Addr);

impl Entry for Ip4 {
    fn key() -> &'static str {
        "ip"
    }
}

impl From<Ipv4Addr> for Ip4 {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

impl Serialize for Ip4 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0.octets())
    }
}

impl<'de> Deserialize<'de> for Ip4 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let octets: [u8; 4] = deserializer.deserialize_bytes(FixedBytesVisitor)?;
        Ok(Self(Ipv4Addr::from(octets)))
    }
}

/// IPv6 address, stored under `"ip6"` as a 16-byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ip6(pub Ipv6Addr);

impl Entry for Ip6 {
    fn key() -> &'static str {
        "ip6"
    }
}

impl From<Ipv6Addr> for Ip6 {
    fn from(addr: Ipv6Addr) -> Self {
        Self(addr)
    }
}

impl Serialize for Ip6 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0.octets())
    }
}

impl<'de> Deserialize<'de> for Ip6 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let octets: [u8; 16] = deserializer.deserialize_bytes(FixedBytesVisitor)?;
        Ok(Self(Ipv6Addr::from(octets)))
    }
}

/// UDP port, stored under `"udp"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Udp(pub u16);

impl Entry for Udp {
    fn key() -> &'static str {
        "udp"
    }
}

/// TCP port, stored under `"tcp"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tcp(pub u16);

impl Entry for Tcp {
    fn key() -> &'static str {
        "tcp"
    }
}

/// IPv6-specific UDP port, stored under `"udp6"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Udp6(pub u16);

impl Entry for Udp6 {
    fn key() -> &'static str {
        "udp6"
    }
}

/// IPv6-specific TCP port, stored under `"tcp6"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tcp6(pub u16);

impl Entry for Tcp6 {
    fn key() -> &'static str {
        "tcp6"
    }
}

/// Visitor for fixed-length byte-string entries.
struct FixedBytesVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for FixedBytesVisitor<N> {
    type Value = [u8; N];

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a byte string of length {N}")
    }

    fn visit_bytes<E: DeError>(self, v: &[u8]) -> Result<Self::Value, E> {
        v.try_into().map_err(|_| E::invalid_length(v.len(), &self))
    }
}
