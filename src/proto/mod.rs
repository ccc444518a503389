//! Example protocol definitions built on the record engine.
//!
//! These are consumers of the declaration API, not part of the core engine:
//! Ethernet II framing, IPv4, and TCP with its option sub-records. Each schema
//! is built once and shared.

pub mod ethernet;
pub mod ipv4;
pub mod tcp;
