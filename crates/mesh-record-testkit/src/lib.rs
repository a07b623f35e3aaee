//! # Mesh Record Testkit
//!
//! Testing utilities for mesh-record.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Helper structs for setting up signed-record scenarios
//! - **Generators**: Proptest strategies for property-based testing
//! - **Vectors**: Deterministic, self-verifying record vectors
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use mesh_record_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::with_seed([0x42; 32]);
//! let record = fixture.make_endpoint_record([127, 0, 0, 1], 30303);
//! assert!(record.verify_signature(&fixture.registry).is_ok());
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use mesh_record_testkit::generators::{record_from_params, RecordParams};
//!
//! proptest! {
//!     #[test]
//!     fn record_roundtrips(params: RecordParams) {
//!         let record = record_from_params(&params);
//!         let bytes = record.to_bytes().unwrap();
//!         prop_assert_eq!(mesh_record::Record::from_bytes(&bytes).unwrap(), record);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture};
pub use generators::{record_from_params, RecordParams};
pub use vectors::{all_vectors, verify_all_vectors, RecordVector};
