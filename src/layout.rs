//! Static layout of the fixed region of a record type.
//!
//! Computed exactly once when a [crate::schema::Schema] is built; every
//! instance of the type shares the result.

use crate::field::{FieldSpec, Width};

/// Position of one fixed-width field within the fixed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLayout {
    /// Offset of the field's first bit from the start of the fixed region.
    pub bit_offset: usize,
    /// Index of the first byte the field touches.
    pub byte_start: usize,
    /// Exclusive index of the last byte the field touches.
    pub byte_end: usize,
    /// Bits of the first touched byte that belong to this field, MSB-first.
    ///
    /// The slice-based codec never consults this; it is part of the layout so
    /// byte-masked implementations agree with it.
    pub first_byte_mask: u8,
}

/// Mask covering bits `[head, head + width)` of a byte, clamped to the byte.
pub fn first_byte_mask(head: usize, width: usize) -> u8 {
    let end = (head + width).min(8);
    let mut mask = 0u8;
    for i in head..end {
        mask |= 0x80 >> i;
    }
    mask
}

/// Walks the fields in declaration order, assigning offsets to fixed fields
/// and skipping variable ones. Returns per-field layouts (`None` for variable
/// fields) and the total fixed bit length. Total: no field ordering can fail.
pub(crate) fn compute(fields: &[FieldSpec]) -> (Vec<Option<FixedLayout>>, usize) {
    let mut layouts = Vec::with_capacity(fields.len());
    let mut running = 0usize;

    for field in fields {
        match field.width {
            Width::Fixed(width) => {
                let byte_start = running / 8;
                let head = running - 8 * byte_start;
                layouts.push(Some(FixedLayout {
                    bit_offset: running,
                    byte_start,
                    byte_end: (running + width).div_ceil(8),
                    first_byte_mask: first_byte_mask(head, width),
                }));
                running += width;
            }
            Width::Computed(_) => layouts.push(None),
        }
    }

    (layouts, running)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldKind, FieldSpec};

    fn uint(name: &str, width: usize) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Uint,
            width: Width::Fixed(width),
            default: None,
        }
    }

    #[test]
    fn test_first_byte_mask() {
        assert_eq!(first_byte_mask(0, 8), 0xff);
        assert_eq!(first_byte_mask(0, 4), 0xf0);
        assert_eq!(first_byte_mask(4, 4), 0x0f);
        assert_eq!(first_byte_mask(3, 13), 0x1f);
        assert_eq!(first_byte_mask(6, 2), 0x03);
        assert_eq!(first_byte_mask(0, 0), 0x00);
    }

    #[test]
    fn test_compute_splits_bytes() {
        // The IPv4 head: 4+4 within one byte, then 6+2, then a 16-bit field.
        let fields = [
            uint("version", 4),
            uint("ihl", 4),
            uint("dscp", 6),
            uint("ecn", 2),
            uint("total_length", 16),
        ];
        let (layouts, total) = compute(&fields);
        assert_eq!(total, 32);

        let version = layouts[0].unwrap();
        assert_eq!(version.bit_offset, 0);
        assert_eq!(version.byte_start, 0);
        assert_eq!(version.byte_end, 1);
        assert_eq!(version.first_byte_mask, 0xf0);

        let ihl = layouts[1].unwrap();
        assert_eq!(ihl.bit_offset, 4);
        assert_eq!(ihl.first_byte_mask, 0x0f);

        let dscp = layouts[2].unwrap();
        assert_eq!(dscp.bit_offset, 8);
        assert_eq!(dscp.byte_start, 1);
        assert_eq!(dscp.first_byte_mask, 0xfc);

        let ecn = layouts[3].unwrap();
        assert_eq!(ecn.first_byte_mask, 0x03);

        let total_length = layouts[4].unwrap();
        assert_eq!(total_length.bit_offset, 16);
        assert_eq!(total_length.byte_start, 2);
        assert_eq!(total_length.byte_end, 4);
        assert_eq!(total_length.first_byte_mask, 0xff);
    }

    #[test]
    fn test_variable_fields_get_no_layout() {
        let mut fields = vec![uint("len", 8)];
        fields.push(FieldSpec {
            name: "body".to_string(),
            kind: FieldKind::Bits,
            width: Width::Computed(crate::field::scaled_width("len", 8, 0)),
            default: None,
        });
        fields.push(uint("crc", 16));

        let (layouts, total) = compute(&fields);
        assert!(layouts[1].is_none());
        // Fixed offsets skip over the variable field entirely.
        assert_eq!(layouts[2].unwrap().bit_offset, 8);
        assert_eq!(total, 24);
    }

    #[test]
    fn test_idempotent() {
        let fields = [uint("a", 3), uint("b", 13)];
        assert_eq!(compute(&fields), compute(&fields));
    }
}
