//! IPv4 header with length-derived options and the header checksum hook.

use std::sync::{Arc, LazyLock};

use crate::checksum::ones_complement;
use crate::field::{Value, scaled_width};
use crate::proto::tcp::TCP;
use crate::schema::{Dispatch, Schema};

pub const PROTOCOL_TCP: u64 = 0x06;

pub static IPV4: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("ipv4")
        .uint_default("version", 4, 4)
        .uint_default("ihl", 4, 5)
        .uint("dscp", 6)
        .uint("ecn", 2)
        .uint("total_length", 16)
        .uint("identification", 16)
        .bits("flags", 3)
        .uint("fragment_offset", 13)
        .uint_default("ttl", 8, 64)
        .uint("protocol", 8)
        .uint("checksum", 16)
        .uint("src_ip", 32)
        .uint("dst_ip", 32)
        // Options occupy whatever the header length claims beyond 5 words.
        .variable_bits("options", scaled_width("ihl", 32, 5))
        .dispatch(|packet| {
            Ok(match packet.uint("protocol")? {
                PROTOCOL_TCP => Dispatch::Next(TCP.clone()),
                _ => Dispatch::Opaque,
            })
        })
        .checksum(|packet, _parent| {
            packet.set("checksum", Value::Uint(0))?;
            let sum = ones_complement(&packet.header_bytes());
            packet.set("checksum", Value::Uint(sum.into()))
        })
        .build()
        .expect("ipv4 schema")
});
