//! # bitrec
//!
//! A runtime codec for bit-level binary records described by declarative
//! schemas.
//!
//! Declare a record type as an ordered list of named fields, each fixed-width
//! or sized per instance by an already-decoded header field, and the crate
//! derives byte-exact decoding, encoding, in-place field mutation, and
//! recursive payload dispatch, with no hand-written shifting or masking.
//!
//! ## Example
//!
//! ```
//! use bitrec::field::scaled_width;
//! use bitrec::record::Record;
//! use bitrec::schema::Schema;
//!
//! let schema = Schema::builder("frame")
//!     .uint_default("kind", 4, 7)
//!     .uint("len", 4)
//!     .variable_bits("body", scaled_width("len", 8, 0))
//!     .build()
//!     .unwrap();
//!
//! let frame = Record::decode(&schema, &[0x72, 0xab, 0xcd]).unwrap();
//! assert_eq!(frame.uint("len").unwrap(), 2);
//! assert_eq!(frame.raw("body").unwrap().to_bytes(), vec![0xab, 0xcd]);
//! ```
//!
//! Ready-made Ethernet/IPv4/TCP declarations live in [proto].

pub mod bits;
pub mod checksum;
pub mod errors;
pub mod field;
pub mod layout;
pub mod options;
pub mod proto;
pub mod record;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
