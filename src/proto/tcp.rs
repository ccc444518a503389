//! TCP header with keyed options and the pseudo-header checksum hook.
//!
//! The option sub-items are independent record types referenced from the
//! option table; the kind byte doubles as the table discriminator.

use std::sync::{Arc, LazyLock};

use crate::bits::Bits;
use crate::checksum::ones_complement;
use crate::errors::FieldError;
use crate::field::{Value, scaled_width};
use crate::options::{OptionEntry, OptionTable};
use crate::schema::Schema;

/// Maximum segment size: kind 2, fixed four bytes.
pub static MAX_SEGMENT_SIZE: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("tcp.max_segment_size")
        .uint_default("kind", 8, 2)
        .uint_default("length", 8, 4)
        .uint("value", 16)
        .build()
        .expect("max segment size schema")
});

/// Window scale: kind 3, fixed three bytes.
pub static WINDOW_SCALE: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("tcp.window_scale")
        .uint_default("kind", 8, 3)
        .uint_default("length", 8, 3)
        .uint("value", 8)
        .build()
        .expect("window scale schema")
});

/// SACK permitted: kind 4, fixed two bytes.
pub static SACK_PERMITTED: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("tcp.sack_permitted")
        .uint_default("kind", 8, 4)
        .uint_default("length", 8, 2)
        .build()
        .expect("sack permitted schema")
});

/// SACK blocks: kind 5, length byte sizes the block list.
pub static SACK: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("tcp.sack")
        .uint_default("kind", 8, 5)
        .uint("length", 8)
        .variable_bits("value", scaled_width("length", 8, 2))
        .build()
        .expect("sack schema")
});

/// Timestamps: kind 8, fixed ten bytes.
pub static TIMESTAMP: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("tcp.timestamp")
        .uint_default("kind", 8, 8)
        .uint_default("length", 8, 10)
        .uint("value", 64)
        .build()
        .expect("timestamp schema")
});

fn option_table() -> OptionTable {
    let echo = |byte: u8| {
        let bits = Bits::from_bytes(&[byte]);
        (bits.clone(), OptionEntry::Echo(bits))
    };
    let record = |byte: u8, schema: &Arc<Schema>| {
        (Bits::from_bytes(&[byte]), OptionEntry::Record(schema.clone()))
    };
    OptionTable::new([
        echo(0x00), // end of option list
        echo(0x01), // no-operation pad
        record(0x02, &MAX_SEGMENT_SIZE),
        record(0x03, &WINDOW_SCALE),
        record(0x04, &SACK_PERMITTED),
        record(0x05, &SACK),
        record(0x08, &TIMESTAMP),
    ])
    .expect("tcp option table")
}

pub static TCP: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("tcp")
        .uint("src_port", 16)
        .uint("dst_port", 16)
        .uint("seq_number", 32)
        .uint("ack_number", 32)
        .uint_default("data_offset", 4, 5)
        .bits("reserved", 3)
        .uint("ns", 1)
        .uint("cwr", 1)
        .uint("ece", 1)
        .uint("urg", 1)
        .uint("ack", 1)
        .uint("psh", 1)
        .uint("rst", 1)
        .uint("syn", 1)
        .uint("fin", 1)
        .uint("window_size", 16)
        .uint("checksum", 16)
        .uint("urgent_pointer", 16)
        .options("options", option_table(), scaled_width("data_offset", 32, 5))
        .checksum(|segment, parent| {
            let ip = parent.ok_or(FieldError::MissingParent)?;
            segment.set("checksum", Value::Uint(0))?;
            let bytes = segment.to_bytes();

            // Pseudo-header: src, dst, zero, protocol, TCP length.
            let mut span = Vec::with_capacity(12 + bytes.len());
            span.extend((ip.uint("src_ip")? as u32).to_be_bytes());
            span.extend((ip.uint("dst_ip")? as u32).to_be_bytes());
            span.extend([0x00, 0x06]);
            span.extend((bytes.len() as u16).to_be_bytes());
            span.extend(&bytes);

            segment.set("checksum", Value::Uint(ones_complement(&span).into()))
        })
        .build()
        .expect("tcp schema")
});
