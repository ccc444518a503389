//! Record instances: owned bit storage for one decodable/encodable protocol
//! unit, composed of a fixed region, a variable region, and a payload.
//!
//! A record is either constructed from field values (each field written with
//! its supplied value or default) or decoded from raw bytes (storage sliced
//! off the input, values interpreted lazily on read). Field mutation splices
//! directly into the stored bits; there is no separate re-serialization step.
//!
//! A record exclusively owns its storage and its payload. Concurrent mutation
//! of one instance is not supported; callers must serialize access.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bits::Bits;
use crate::errors::{DecodeError, FieldError};
use crate::field::{Value, Width};
use crate::options::OptionItem;
use crate::schema::{Dispatch, Schema};

/// Trailing bits of a record: opaque, or a nested decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bits(Bits),
    Record(Box<Record>),
}

impl Payload {
    /// On-wire bits of the payload.
    pub fn to_bits(&self) -> Bits {
        match self {
            Payload::Bits(bits) => bits.clone(),
            Payload::Record(record) => record.to_bits(),
        }
    }

    pub fn bit_len(&self) -> usize {
        match self {
            Payload::Bits(bits) => bits.len(),
            Payload::Record(record) => record.bit_len(),
        }
    }
}

enum Region {
    Fixed,
    Variable,
}

/// One instance of a declared record type.
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    fixed: Bits,
    variable: Bits,
    /// Per-instance `(offset, width)` of each variable field, in the
    /// schema's variable declaration order.
    var_spans: Vec<(usize, usize)>,
    payload: Payload,
}

impl Record {
    /// Fresh record with every field at its default (or zero) value.
    pub fn new(schema: &Arc<Schema>) -> Result<Record, FieldError> {
        Record::build(schema, [])
    }

    /// Fresh record with the supplied field values overriding defaults.
    /// A name not declared by the schema fails with [FieldError::Unknown].
    pub fn build<'a>(
        schema: &Arc<Schema>,
        values: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<Record, FieldError> {
        let mut supplied: HashMap<&str, Value> = HashMap::new();
        for (name, value) in values {
            if schema.index_of(name).is_none() {
                return Err(FieldError::Unknown(name.to_string()));
            }
            supplied.insert(name, value);
        }

        let mut record = Record {
            schema: schema.clone(),
            fixed: Bits::zeros(schema.fixed_bits()),
            variable: Bits::new(),
            var_spans: Vec::new(),
            payload: Payload::Bits(Bits::new()),
        };

        for &idx in &schema.fixed {
            record.write_initial(idx, &mut supplied)?;
        }
        record.allocate_variable();
        for &idx in &schema.variable {
            record.write_initial(idx, &mut supplied)?;
        }

        Ok(record)
    }

    fn write_initial(
        &mut self,
        idx: usize,
        supplied: &mut HashMap<&str, Value>,
    ) -> Result<(), FieldError> {
        let name = self.schema.field(idx).name.clone();
        match supplied.remove(name.as_str()) {
            Some(value) => self.set(&name, value),
            None => match self.schema.field(idx).default.clone() {
                Some(default) => self.set(&name, default),
                None => Ok(()),
            },
        }
    }

    /// Decodes a record from raw bytes, recursively resolving the payload.
    pub fn decode(schema: &Arc<Schema>, raw: &[u8]) -> Result<Record, DecodeError> {
        Record::from_bits(schema, &Bits::from_bytes(raw), false)
    }

    /// Decodes a record from a bit sequence.
    ///
    /// The first `fixed_bits` go to fixed storage, then the variable
    /// allocation pass (reading the just-populated fixed fields) sizes the
    /// variable region, and the remainder becomes the payload. With
    /// `drop_payload` the remainder is discarded instead: the record is a
    /// self-contained embedded item.
    pub fn from_bits(
        schema: &Arc<Schema>,
        bits: &Bits,
        drop_payload: bool,
    ) -> Result<Record, DecodeError> {
        if bits.len() < schema.fixed_bits() {
            return Err(DecodeError::Truncated {
                need: schema.fixed_bits(),
                have: bits.len(),
            });
        }

        let mut record = Record {
            schema: schema.clone(),
            fixed: bits.slice(0, schema.fixed_bits())?,
            variable: Bits::new(),
            var_spans: Vec::new(),
            payload: Payload::Bits(Bits::new()),
        };

        record.allocate_variable();
        let header_bits = schema.fixed_bits() + record.variable.len();
        if bits.len() < header_bits {
            return Err(DecodeError::Truncated {
                need: header_bits,
                have: bits.len(),
            });
        }
        record.variable = bits.slice(schema.fixed_bits(), header_bits)?;

        if drop_payload {
            return Ok(record);
        }

        let rest = bits.slice(header_bits, bits.len())?;
        record.payload = match &schema.dispatch {
            Some(select) => match select(&record)? {
                Dispatch::Next(next) => {
                    Payload::Record(Box::new(Record::from_bits(&next, &rest, false)?))
                }
                Dispatch::Opaque => Payload::Bits(rest),
            },
            None => Payload::Bits(rest),
        };

        Ok(record)
    }

    /// Runs every variable field's width function strictly in declaration
    /// order, recording each field's `(offset, width)` and growing the
    /// variable storage with zeros. Later widths may depend on earlier
    /// allocations; fixed fields are already readable.
    fn allocate_variable(&mut self) {
        self.var_spans.clear();
        self.variable = Bits::new();
        let schema = self.schema.clone();
        for &idx in &schema.variable {
            let width = schema.field(idx).width.eval(self);
            self.var_spans.push((self.variable.len(), width));
            self.variable.extend(&Bits::zeros(width));
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn locate(&self, idx: usize) -> (Region, usize, usize) {
        match &self.schema.field(idx).width {
            Width::Fixed(width) => {
                let offset = self
                    .schema
                    .layout_at(idx)
                    .map(|l| l.bit_offset)
                    .unwrap_or(0);
                (Region::Fixed, offset, *width)
            }
            Width::Computed(_) => {
                let pos = self
                    .schema
                    .variable
                    .iter()
                    .position(|&i| i == idx)
                    .unwrap_or(0);
                let (offset, width) = self.var_spans[pos];
                (Region::Variable, offset, width)
            }
        }
    }

    /// Raw stored bits of a field.
    pub fn raw(&self, name: &str) -> Result<Bits, FieldError> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| FieldError::Unknown(name.to_string()))?;
        let (region, offset, width) = self.locate(idx);
        let storage = match region {
            Region::Fixed => &self.fixed,
            Region::Variable => &self.variable,
        };
        Ok(storage.slice(offset, offset + width)?)
    }

    /// Reads a field, applying its kind's bits-to-value conversion.
    pub fn get(&self, name: &str) -> Result<Value, FieldError> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| FieldError::Unknown(name.to_string()))?;
        self.schema.field(idx).value_from_bits(self.raw(name)?)
    }

    /// Writes a field in place at its pre-computed (fixed) or per-instance
    /// (variable) offset. Fails if the value cannot be represented in the
    /// field's width; no other field is touched on failure.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), FieldError> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| FieldError::Unknown(name.to_string()))?;
        let (region, offset, width) = self.locate(idx);
        let bits = self.schema.field(idx).bits_from_value(&value, width)?;
        match region {
            Region::Fixed => self.fixed.splice(offset, &bits)?,
            Region::Variable => self.variable.splice(offset, &bits)?,
        }
        Ok(())
    }

    /// Clears a field to all-zero bits of its width.
    pub fn clear(&mut self, name: &str) -> Result<(), FieldError> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| FieldError::Unknown(name.to_string()))?;
        let (region, offset, width) = self.locate(idx);
        match region {
            Region::Fixed => self.fixed.splice(offset, &Bits::zeros(width))?,
            Region::Variable => self.variable.splice(offset, &Bits::zeros(width))?,
        }
        Ok(())
    }

    /// Reads an unsigned integer field.
    pub fn uint(&self, name: &str) -> Result<u64, FieldError> {
        match self.get(name)? {
            Value::Uint(v) => Ok(v),
            _ => Err(FieldError::KindMismatch {
                field: name.to_string(),
                expected: "an unsigned integer",
            }),
        }
    }

    /// Writes an unsigned integer field.
    pub fn set_uint(&mut self, name: &str, value: u64) -> Result<(), FieldError> {
        self.set(name, Value::Uint(value))
    }

    /// Reads a byte blob field.
    pub fn bytes_value(&self, name: &str) -> Result<Vec<u8>, FieldError> {
        match self.get(name)? {
            Value::Bytes(b) => Ok(b),
            _ => Err(FieldError::KindMismatch {
                field: name.to_string(),
                expected: "bytes",
            }),
        }
    }

    /// Reads a raw bits field.
    pub fn bits_value(&self, name: &str) -> Result<Bits, FieldError> {
        match self.get(name)? {
            Value::Bits(b) => Ok(b),
            _ => Err(FieldError::KindMismatch {
                field: name.to_string(),
                expected: "bits",
            }),
        }
    }

    /// Decodes a keyed options field into its item list.
    pub fn options(&self, name: &str) -> Result<Vec<OptionItem>, FieldError> {
        match self.get(name)? {
            Value::Options(items) => Ok(items),
            _ => Err(FieldError::KindMismatch {
                field: name.to_string(),
                expected: "an option list",
            }),
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The payload as a nested record, if it decoded as one.
    pub fn payload_record(&self) -> Option<&Record> {
        match &self.payload {
            Payload::Record(record) => Some(record),
            Payload::Bits(_) => None,
        }
    }

    pub fn payload_record_mut(&mut self) -> Option<&mut Record> {
        match &mut self.payload {
            Payload::Record(record) => Some(record),
            Payload::Bits(_) => None,
        }
    }

    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Full serialization: fixed ++ variable ++ payload.
    pub fn to_bits(&self) -> Bits {
        let mut out = self.fixed.clone();
        out.extend(&self.variable);
        out.extend(&self.payload.to_bits());
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_bits().to_bytes()
    }

    pub fn bit_len(&self) -> usize {
        self.fixed.len() + self.variable.len() + self.payload.bit_len()
    }

    pub fn byte_len(&self) -> usize {
        self.bit_len().div_ceil(8)
    }

    /// Fixed and variable regions without the payload; the span checksum
    /// hooks work over.
    pub fn header_bits(&self) -> Bits {
        self.fixed.concat(&self.variable)
    }

    pub fn header_bytes(&self) -> Vec<u8> {
        self.header_bits().to_bytes()
    }

    pub fn hex(&self) -> String {
        self.to_bits().hex()
    }

    /// Runs this record's checksum hook, if any. `parent` is the enclosing
    /// record for algorithms that span both (pseudo-headers).
    pub fn fill_checksum(&mut self, parent: Option<&Record>) -> Result<(), FieldError> {
        let hook = self.schema.checksum.clone();
        match hook {
            Some(f) => f(self, parent),
            None => Ok(()),
        }
    }

    /// Recomputes checksums over the whole payload tree, bottom-up. Each
    /// nested record sees its enclosing record's header as the parent.
    pub fn fill_checksums(&mut self) -> Result<(), FieldError> {
        self.fill_checksums_from(None)
    }

    fn fill_checksums_from(&mut self, parent: Option<&Record>) -> Result<(), FieldError> {
        if matches!(self.payload, Payload::Record(_)) {
            let own_header = self.header_snapshot();
            if let Payload::Record(child) = &mut self.payload {
                child.fill_checksums_from(Some(&own_header))?;
            }
        }
        self.fill_checksum(parent)
    }

    /// A copy of this record with its payload detached, for presenting the
    /// header to a child without aliasing the child itself.
    fn header_snapshot(&self) -> Record {
        Record {
            schema: self.schema.clone(),
            fixed: self.fixed.clone(),
            variable: self.variable.clone(),
            var_spans: self.var_spans.clone(),
            payload: Payload::Bits(Bits::new()),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.fixed == other.fixed
            && self.variable == other.variable
            && self.payload == other.payload
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("schema", &self.schema.name())
            .field("fixed", &self.fixed)
            .field("variable", &self.variable)
            .field("payload", &self.payload)
            .finish()
    }
}
