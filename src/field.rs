//! Field descriptors: named, typed accessors into a record's bit storage.
//!
//! A field knows its width (a constant, or a function of the owning record
//! evaluated at allocation time) and how to convert between raw bits and a
//! semantic [Value]. Field kinds differ only in that conversion.

use std::sync::Arc;

use crate::bits::Bits;
use crate::errors::{BitsError, FieldError};
use crate::options::{OptionItem, OptionTable};
use crate::record::Record;

/// Width function of a variable field, evaluated lazily against the owning
/// record once its fixed region is populated.
pub type WidthFn = Arc<dyn Fn(&Record) -> usize + Send + Sync>;

/// Bit width of a field: declaration-time constant, or computed per instance.
#[derive(Clone)]
pub enum Width {
    Fixed(usize),
    Computed(WidthFn),
}

impl Width {
    /// A field is variable iff its width is computed from instance state.
    pub fn is_variable(&self) -> bool {
        matches!(self, Width::Computed(_))
    }

    pub(crate) fn eval(&self, record: &Record) -> usize {
        match self {
            Width::Fixed(w) => *w,
            Width::Computed(f) => f(record),
        }
    }
}

impl std::fmt::Debug for Width {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Width::Fixed(w) => write!(f, "Fixed({w})"),
            Width::Computed(_) => write!(f, "Computed"),
        }
    }
}

/// The header-length width pattern: `unit_bits * max(0, field - bias)`.
///
/// Covers IPv4 `options` (32 * (ihl - 5)), TCP `options`
/// (32 * (data_offset - 5)) and SACK `value` (8 * (length - 2)). The
/// referenced field must be a fixed uint field of the same record; an
/// unreadable field yields width 0.
pub fn scaled_width(field: &str, unit_bits: usize, bias: u64) -> WidthFn {
    let field = field.to_string();
    Arc::new(move |record| {
        record
            .uint(&field)
            .map_or(0, |v| unit_bits * v.saturating_sub(bias) as usize)
    })
}

/// How a field's raw bits are interpreted.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Unsigned big-endian integer of the field's width (max 64 bits).
    Uint,
    /// Raw bytes. A width that is a multiple of 8 is the declarer's
    /// responsibility; it is not validated.
    Bytes,
    /// Raw bits, returned verbatim.
    Bits,
    /// Keyed variable list of discriminator-prefixed sub-items.
    Options(OptionTable),
}

/// A decoded or to-be-encoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uint(u64),
    Bytes(Vec<u8>),
    Bits(Bits),
    Options(Vec<OptionItem>),
}

/// A single named field of a record type.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Name used for all get/set access.
    pub name: String,
    /// Bits-to-value interpretation.
    pub kind: FieldKind,
    /// Constant width, or a function of the owning instance.
    pub width: Width,
    /// Written at construction when no value is supplied; `None` means
    /// all-zero bits.
    pub default: Option<Value>,
}

impl FieldSpec {
    /// Interprets raw field bits as a [Value].
    pub fn value_from_bits(&self, bits: Bits) -> Result<Value, FieldError> {
        match &self.kind {
            FieldKind::Uint => Ok(Value::Uint(bits.to_uint()?)),
            FieldKind::Bytes => Ok(Value::Bytes(bits.to_bytes())),
            FieldKind::Bits => Ok(Value::Bits(bits)),
            FieldKind::Options(table) => Ok(Value::Options(table.decode(&bits)?)),
        }
    }

    /// Converts a [Value] into exactly `width` bits, validating that the
    /// value is representable.
    pub fn bits_from_value(&self, value: &Value, width: usize) -> Result<Bits, FieldError> {
        match (&self.kind, value) {
            (FieldKind::Uint, Value::Uint(v)) => {
                Bits::from_int(*v, width).map_err(|err| match err {
                    BitsError::Overflow { value, width } => FieldError::Overflow {
                        field: self.name.clone(),
                        value,
                        width,
                    },
                    other => FieldError::Bits(other),
                })
            }
            (FieldKind::Uint, _) => Err(self.kind_mismatch("an unsigned integer")),
            (FieldKind::Bytes, Value::Bytes(b)) => {
                if b.len() * 8 != width {
                    return Err(FieldError::LengthMismatch {
                        field: self.name.clone(),
                        want: width,
                        got: b.len() * 8,
                    });
                }
                Ok(Bits::from_bytes(b))
            }
            (FieldKind::Bytes, _) => Err(self.kind_mismatch("bytes")),
            (FieldKind::Bits, Value::Bits(b)) => {
                if b.len() > width {
                    return Err(FieldError::LengthMismatch {
                        field: self.name.clone(),
                        want: width,
                        got: b.len(),
                    });
                }
                Ok(b.pad_left(width))
            }
            // Scalar 0/1 broadcast to fill the field.
            (FieldKind::Bits, Value::Uint(v)) if *v <= 1 => Ok(Bits::repeat(*v == 1, width)),
            (FieldKind::Bits, _) => Err(self.kind_mismatch("bits, or the scalar 0 or 1")),
            (FieldKind::Options(table), Value::Options(items)) => table.encode(items, width),
            (FieldKind::Options(_), _) => Err(self.kind_mismatch("an option list")),
        }
    }

    fn kind_mismatch(&self, expected: &'static str) -> FieldError {
        FieldError::KindMismatch {
            field: self.name.clone(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: FieldKind, width: usize) -> FieldSpec {
        FieldSpec {
            name: "f".to_string(),
            kind,
            width: Width::Fixed(width),
            default: None,
        }
    }

    #[test]
    fn test_uint_round_trip() {
        let field = spec(FieldKind::Uint, 13);
        let bits = field.bits_from_value(&Value::Uint(0x1234), 13).unwrap();
        assert_eq!(bits.len(), 13);
        assert_eq!(field.value_from_bits(bits).unwrap(), Value::Uint(0x1234));
    }

    #[test]
    fn test_uint_overflow() {
        let field = spec(FieldKind::Uint, 4);
        assert_eq!(
            field.bits_from_value(&Value::Uint(16), 4).unwrap_err(),
            FieldError::Overflow {
                field: "f".to_string(),
                value: 16,
                width: 4
            }
        );
    }

    #[test]
    fn test_uint_kind_mismatch() {
        let field = spec(FieldKind::Uint, 8);
        assert!(matches!(
            field.bits_from_value(&Value::Bytes(vec![1]), 8),
            Err(FieldError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_bytes_length_checked() {
        let field = spec(FieldKind::Bytes, 16);
        let bits = field
            .bits_from_value(&Value::Bytes(vec![0xab, 0xcd]), 16)
            .unwrap();
        assert_eq!(bits.to_bytes(), vec![0xab, 0xcd]);
        assert!(matches!(
            field.bits_from_value(&Value::Bytes(vec![0xab]), 16),
            Err(FieldError::LengthMismatch { want: 16, got: 8, .. })
        ));
    }

    #[test]
    fn test_bits_pad_and_broadcast() {
        let field = spec(FieldKind::Bits, 3);
        let short = Bits::from_int(0b1, 1).unwrap();
        assert_eq!(
            field.bits_from_value(&Value::Bits(short), 3).unwrap(),
            Bits::from_int(0b001, 3).unwrap()
        );
        assert_eq!(
            field.bits_from_value(&Value::Uint(1), 3).unwrap(),
            Bits::repeat(true, 3)
        );
        assert_eq!(
            field.bits_from_value(&Value::Uint(0), 3).unwrap(),
            Bits::zeros(3)
        );
        assert!(matches!(
            field.bits_from_value(&Value::Uint(2), 3),
            Err(FieldError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_bits_too_long() {
        let field = spec(FieldKind::Bits, 2);
        let long = Bits::from_int(0b101, 3).unwrap();
        assert!(matches!(
            field.bits_from_value(&Value::Bits(long), 2),
            Err(FieldError::LengthMismatch { .. })
        ));
    }
}
