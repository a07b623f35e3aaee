//! Proptest generators for property-based testing.

use proptest::prelude::*;
use std::net::{Ipv4Addr, Ipv6Addr};

use mesh_record::{Ed25519Scheme, Ip4, Ip6, Keypair, Record, Tcp, Udp};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a sequence number, biased toward small values but covering the
/// multi-byte encodings.
pub fn seq() -> impl Strategy<Value = u64> {
    prop_oneof![
        4 => 0u64..=1000,
        1 => 1001u64..u64::MAX,
    ]
}

/// Generate a UDP/TCP port.
pub fn port() -> impl Strategy<Value = u16> {
    any::<u16>()
}

/// Generate an IPv4 address.
pub fn ip4() -> impl Strategy<Value = Ipv4Addr> {
    any::<[u8; 4]>().prop_map(Ipv4Addr::from)
}

/// Generate an IPv6 address.
pub fn ip6() -> impl Strategy<Value = Ipv6Addr> {
    any::<[u8; 16]>().prop_map(Ipv6Addr::from)
}

/// Parameters for generating a signed record.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub seed: [u8; 32],
    pub seq: u64,
    pub ip4: Option<Ipv4Addr>,
    pub ip6: Option<Ipv6Addr>,
    pub udp: Option<u16>,
    pub tcp: Option<u16>,
}

impl Arbitrary for RecordParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(),
            seq(),
            proptest::option::of(ip4()),
            proptest::option::of(ip6()),
            proptest::option::of(port()),
            proptest::option::of(port()),
        )
            .prop_map(|(seed, seq, ip4, ip6, udp, tcp)| RecordParams {
                seed,
                seq,
                ip4,
                ip6,
                udp,
                tcp,
            })
            .boxed()
    }
}

/// Generate a signed record from parameters.
///
/// Entries are inserted in a deliberately scrambled order; the record is
/// responsible for keeping its pairs sorted.
pub fn record_from_params(params: &RecordParams) -> Record {
    let keypair = Keypair::from_seed(&params.seed);
    let mut record = Record::new();
    record.set_seq(params.seq);

    if let Some(udp) = params.udp {
        record.set(&Udp(udp));
    }
    if let Some(ip6) = params.ip6 {
        record.set(&Ip6(ip6));
    }
    if let Some(tcp) = params.tcp {
        record.set(&Tcp(tcp));
    }
    if let Some(ip4) = params.ip4 {
        record.set(&Ip4(ip4));
    }

    Ed25519Scheme
        .sign_record(&keypair, &mut record)
        .expect("generated records fit the size limit");
    record
}
