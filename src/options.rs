//! Keyed variable list fields: sequences of heterogeneous sub-items
//! identified by a variable-width discriminator prefix (protocol "options").

use std::collections::HashMap;
use std::sync::Arc;

use crate::bits::Bits;
use crate::errors::{DecodeError, FieldError, SchemaError};
use crate::record::Record;
use crate::schema::Schema;

/// What a matched discriminator prefix decodes into.
#[derive(Debug, Clone)]
pub enum OptionEntry {
    /// A literal echoed into the item list verbatim (e.g. TCP NOP/EOL pads).
    Echo(Bits),
    /// A self-contained sub-record decoded at the match position.
    Record(Arc<Schema>),
}

/// One decoded item of a keyed option list.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionItem {
    Literal(Bits),
    Record(Record),
}

impl OptionItem {
    /// The item's on-wire bits.
    pub fn to_bits(&self) -> Bits {
        match self {
            OptionItem::Literal(bits) => bits.clone(),
            OptionItem::Record(record) => record.to_bits(),
        }
    }
}

/// Table mapping discriminator prefixes to item specs.
///
/// Keys may have different bit widths. Construction rejects tables where one
/// key is a bit-prefix of a longer key, since greedy shortest-width-first
/// matching could then never reach the longer key.
#[derive(Debug, Clone)]
pub struct OptionTable {
    entries: HashMap<Bits, OptionEntry>,
    /// Distinct key widths, ascending. Fixes the match order.
    widths: Vec<usize>,
}

impl OptionTable {
    pub fn new(
        entries: impl IntoIterator<Item = (Bits, OptionEntry)>,
    ) -> Result<Self, SchemaError> {
        let entries: HashMap<Bits, OptionEntry> = entries.into_iter().collect();

        for short in entries.keys() {
            for long in entries.keys() {
                if short.len() < long.len()
                    && long.slice(0, short.len()).as_ref() == Ok(short)
                {
                    return Err(SchemaError::AmbiguousOptionKey {
                        short: short.hex(),
                        long: long.hex(),
                    });
                }
            }
        }

        let mut widths: Vec<usize> = entries.keys().map(Bits::len).collect();
        widths.sort_unstable();
        widths.dedup();

        Ok(OptionTable { entries, widths })
    }

    /// Greedy left-to-right decode of a packed option region.
    ///
    /// At each position candidate key widths are tried in ascending order; the
    /// first table match wins. An `Echo` advances by the key width, a sub-
    /// record by its own total length (its payload dropped: the item is self-
    /// contained). The scan stops once fewer bits remain than the smallest
    /// key width. No match at a position fails the whole decode; no partial
    /// list is ever produced.
    pub fn decode(&self, bits: &Bits) -> Result<Vec<OptionItem>, DecodeError> {
        let mut items = Vec::new();
        let Some(&min_width) = self.widths.first() else {
            return Ok(items);
        };

        let mut at = 0;
        while at + min_width <= bits.len() {
            let mut matched = false;
            for &width in &self.widths {
                if at + width > bits.len() {
                    continue;
                }
                let Some(entry) = self.entries.get(&bits.slice(at, at + width)?) else {
                    continue;
                };

                match entry {
                    OptionEntry::Echo(literal) => {
                        items.push(OptionItem::Literal(literal.clone()));
                        at += width;
                    }
                    OptionEntry::Record(schema) => {
                        let tail = bits.slice(at, bits.len())?;
                        let record = Record::from_bits(schema, &tail, true)?;
                        at += record.bit_len();
                        items.push(OptionItem::Record(record));
                    }
                }
                matched = true;
                break;
            }

            if !matched {
                return Err(DecodeError::UndecodableOption { at });
            }
        }

        Ok(items)
    }

    /// Concatenates the items' bits in order and right-pads with zeros to
    /// exactly `total_bits`. Fails if the items exceed the declared width.
    pub fn encode(&self, items: &[OptionItem], total_bits: usize) -> Result<Bits, FieldError> {
        let mut out = Bits::new();
        for item in items {
            out.extend(&item.to_bits());
        }
        if out.len() > total_bits {
            return Err(FieldError::LengthMismatch {
                field: "options".to_string(),
                want: total_bits,
                got: out.len(),
            });
        }
        Ok(out.pad_right(total_bits))
    }
}
