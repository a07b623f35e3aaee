//! Deterministic record vectors for cross-implementation verification.
//!
//! Vectors are computed at runtime from seeded keypairs, so they stay valid
//! as long as signing is deterministic. `verify_all_vectors` rebuilds every
//! vector from its inputs and checks the derived outputs against the record
//! API end to end.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use mesh_record::{Ed25519Scheme, IdentityScheme, Ip4, Keypair, Record, Udp};

/// A single deterministic record vector.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordVector {
    pub name: String,
    pub description: String,

    // Inputs
    pub seed: String, // 32 bytes hex
    pub seq: u64,
    pub ip4: Option<[u8; 4]>,
    pub udp: Option<u16>,
    /// Mutate the signed record once and re-sign before deriving outputs.
    pub resign: bool,

    // Derived outputs (hex)
    pub signing_payload: String,
    pub signature: String,
    pub record_bytes: String,
    pub node_addr: String,
}

/// Rebuild the record a vector describes from its inputs alone.
pub fn record_from_vector(vector: &RecordVector) -> Record {
    let mut seed = [0u8; 32];
    hex::decode_to_slice(&vector.seed, &mut seed).expect("vector seed is 32 hex bytes");
    let keypair = Keypair::from_seed(&seed);

    let mut record = Record::new();
    record.set_seq(vector.seq);
    if let Some(ip) = vector.ip4 {
        record.set(&Ip4(Ipv4Addr::from(ip)));
    }
    if let Some(udp) = vector.udp {
        record.set(&Udp(udp));
    }
    Ed25519Scheme
        .sign_record(&keypair, &mut record)
        .expect("vector records fit the size limit");

    if vector.resign {
        // One mutation of the signed record, then a fresh signature.
        record.set(&Udp(vector.udp.unwrap_or(0) ^ 1));
        Ed25519Scheme
            .sign_record(&keypair, &mut record)
            .expect("re-signed vector records fit the size limit");
    }
    record
}

fn generate_vector(
    name: &str,
    description: &str,
    seed: [u8; 32],
    seq: u64,
    ip4: Option<[u8; 4]>,
    udp: Option<u16>,
    resign: bool,
) -> RecordVector {
    let mut vector = RecordVector {
        name: name.to_string(),
        description: description.to_string(),
        seed: hex::encode(seed),
        seq,
        ip4,
        udp,
        resign,
        signing_payload: String::new(),
        signature: String::new(),
        record_bytes: String::new(),
        node_addr: String::new(),
    };

    let record = record_from_vector(&vector);
    vector.signing_payload = hex::encode(record.signing_payload());
    vector.signature = hex::encode(record.signature().expect("vector records are signed"));
    vector.record_bytes = hex::encode(record.to_bytes().expect("vector records encode"));
    vector.node_addr = hex::encode(
        Ed25519Scheme
            .node_addr(&record)
            .expect("vector records carry a key"),
    );
    vector
}

/// Generate all vectors.
pub fn all_vectors() -> Vec<RecordVector> {
    vec![
        generate_vector(
            "minimal",
            "Only the scheme's own entries, sequence 0",
            [0x01; 32],
            0,
            None,
            None,
            false,
        ),
        generate_vector(
            "localhost_endpoint",
            "IPv4 loopback with a UDP port",
            [0x02; 32],
            0,
            Some([127, 0, 0, 1]),
            Some(30303),
            false,
        ),
        generate_vector(
            "high_sequence",
            "Sequence number needing the widest integer encoding",
            [0x03; 32],
            u64::from(u32::MAX) + 1,
            Some([10, 0, 0, 1]),
            Some(30303),
            false,
        ),
        generate_vector(
            "resigned",
            "Signed, mutated once, then signed again (sequence 1)",
            [0x04; 32],
            0,
            Some([192, 168, 0, 9]),
            Some(30303),
            true,
        ),
    ]
}

/// Rebuild every vector and check all derived outputs.
pub fn verify_all_vectors() {
    for vector in all_vectors() {
        let record = record_from_vector(&vector);

        assert_eq!(
            hex::encode(record.signing_payload()),
            vector.signing_payload,
            "signing_payload mismatch for {}",
            vector.name
        );
        assert_eq!(
            hex::encode(record.signature().unwrap()),
            vector.signature,
            "signature mismatch for {}",
            vector.name
        );
        let bytes = record.to_bytes().unwrap();
        assert_eq!(
            hex::encode(&bytes),
            vector.record_bytes,
            "record_bytes mismatch for {}",
            vector.name
        );

        // The wire image must round-trip and still verify.
        let decoded = Record::from_bytes(&bytes).expect("vector bytes decode");
        assert_eq!(decoded, record, "decode mismatch for {}", vector.name);
        decoded
            .verify_signature(&Ed25519Scheme)
            .expect("vector signature verifies");

        assert_eq!(
            hex::encode(Ed25519Scheme.node_addr(&decoded).unwrap()),
            vector.node_addr,
            "node_addr mismatch for {}",
            vector.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_deterministic() {
        let v1 = all_vectors();
        let v2 = all_vectors();

        for (a, b) in v1.iter().zip(v2.iter()) {
            assert_eq!(a.signature, b.signature, "signature mismatch for {}", a.name);
            assert_eq!(
                a.record_bytes, b.record_bytes,
                "record_bytes mismatch for {}",
                a.name
            );
            assert_eq!(a.node_addr, b.node_addr, "node_addr mismatch for {}", a.name);
        }
    }

    #[test]
    fn test_vectors_verify() {
        verify_all_vectors();
    }

    #[test]
    fn test_resigned_vector_advances_sequence() {
        let vectors = all_vectors();
        let resigned = vectors.iter().find(|v| v.resign).unwrap();
        let record = record_from_vector(resigned);
        assert_eq!(record.seq(), 1);
    }

    #[test]
    fn print_vectors_json() {
        let json = serde_json::to_string_pretty(&all_vectors()).unwrap();
        println!("{json}");
    }
}
