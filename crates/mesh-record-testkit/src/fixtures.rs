//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::net::{Ipv4Addr, Ipv6Addr};

use mesh_record::{
    Ed25519Scheme, Ip4, Ip6, Keypair, Record, RecordError, SchemeRegistry, Tcp, Udp,
};

/// A test fixture with a keypair and a standard scheme registry.
pub struct TestFixture {
    pub keypair: Keypair,
    pub registry: SchemeRegistry,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            registry: SchemeRegistry::standard(),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            registry: SchemeRegistry::standard(),
        }
    }

    /// Sign `record` with this fixture's keypair under the stock scheme.
    pub fn sign(&self, record: &mut Record) -> Result<(), RecordError> {
        Ed25519Scheme.sign_record(&self.keypair, record)
    }

    /// Create a signed record advertising an IPv4 UDP endpoint.
    pub fn make_endpoint_record(&self, ip: [u8; 4], udp: u16) -> Record {
        let mut record = Record::new();
        record.set(&Ip4(Ipv4Addr::from(ip)));
        record.set(&Udp(udp));
        self.sign(&mut record)
            .expect("endpoint record fits the size limit");
        record
    }

    /// Create a signed record advertising IPv4 and IPv6 endpoints.
    pub fn make_dual_stack_record(
        &self,
        ip: [u8; 4],
        ip6: [u8; 16],
        udp: u16,
        tcp: u16,
    ) -> Record {
        let mut record = Record::new();
        record.set(&Ip4(Ipv4Addr::from(ip)));
        record.set(&Ip6(Ipv6Addr::from(ip6)));
        record.set(&Udp(udp));
        record.set(&Tcp(tcp));
        self.sign(&mut record)
            .expect("dual-stack record fits the size limit");
        record
    }

    /// The node address the stock scheme derives for this fixture's key.
    pub fn node_addr(&self, record: &Record) -> Option<Vec<u8>> {
        use mesh_record::IdentityScheme;
        self.registry.node_addr(record)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[31] = 0x5a;
            TestFixture::with_seed(seed)
        })
        .collect()
}
