//! Ethernet II frame header.

use std::sync::{Arc, LazyLock};

use crate::proto::ipv4::IPV4;
use crate::schema::{Dispatch, Schema};

pub const ETHERTYPE_IPV4: u64 = 0x0800;

pub static ETHERNET: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("ethernet")
        .bytes("dst_mac", 48)
        .bytes("src_mac", 48)
        .uint("ethertype", 16)
        .dispatch(|frame| {
            Ok(match frame.uint("ethertype")? {
                ETHERTYPE_IPV4 => Dispatch::Next(IPV4.clone()),
                _ => Dispatch::Opaque,
            })
        })
        .build()
        .expect("ethernet schema")
});
