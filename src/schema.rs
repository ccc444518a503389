//! Record type declarations: an ordered, immutable set of field descriptors
//! plus the hooks a protocol definition may attach.
//!
//! A [Schema] is built once through [SchemaBuilder], which validates the
//! declaration and runs the layout calculator, and is then shared read-only
//! across any number of record instances (`Arc`).

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{FieldError, SchemaError};
use crate::field::{FieldKind, FieldSpec, Value, Width, WidthFn};
use crate::layout::{self, FixedLayout};
use crate::options::OptionTable;
use crate::record::Record;

/// How a record's trailing bits are interpreted.
#[derive(Clone)]
pub enum Dispatch {
    /// Payload stays opaque bits. The valid terminal case, not an error.
    Opaque,
    /// Payload is recursively decoded as this record type.
    Next(Arc<Schema>),
}

/// Selects the payload type from the already-decoded header fields.
pub type DispatchFn = Arc<dyn Fn(&Record) -> Result<Dispatch, FieldError> + Send + Sync>;

/// Recomputes a record's checksum field in place. Receives the enclosing
/// record when the algorithm spans both (e.g. a pseudo-header).
pub type ChecksumFn = Arc<dyn Fn(&mut Record, Option<&Record>) -> Result<(), FieldError> + Send + Sync>;

/// A declared record type: ordered fields, fixed/variable partition, layout.
pub struct Schema {
    name: String,
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
    /// Indices of fixed-width fields, in declaration order.
    pub(crate) fixed: Vec<usize>,
    /// Indices of variable-width fields, in declaration order.
    pub(crate) variable: Vec<usize>,
    /// Per-field layout; `None` for variable fields.
    layouts: Vec<Option<FixedLayout>>,
    fixed_bits: usize,
    pub(crate) dispatch: Option<DispatchFn>,
    pub(crate) checksum: Option<ChecksumFn>,
}

impl Schema {
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder {
            name: name.to_string(),
            fields: Vec::new(),
            dispatch: None,
            checksum: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total width of the fixed region in bits.
    pub fn fixed_bits(&self) -> usize {
        self.fixed_bits
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Static layout of a fixed field; `None` for variable or unknown names.
    pub fn layout(&self, name: &str) -> Option<&FixedLayout> {
        self.layouts[self.index_of(name)?].as_ref()
    }

    pub fn is_variable(&self, name: &str) -> Option<bool> {
        Some(self.fields[self.index_of(name)?].width.is_variable())
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn layout_at(&self, idx: usize) -> Option<&FixedLayout> {
        self.layouts[idx].as_ref()
    }

    pub(crate) fn field(&self, idx: usize) -> &FieldSpec {
        &self.fields[idx]
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("fixed_bits", &self.fixed_bits)
            .finish()
    }
}

/// Collects field declarations in order, then validates and compiles them
/// into an immutable [Schema].
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    dispatch: Option<DispatchFn>,
    checksum: Option<ChecksumFn>,
}

impl SchemaBuilder {
    /// Appends an explicitly constructed field.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Fixed-width unsigned integer field.
    pub fn uint(self, name: &str, width: usize) -> Self {
        self.field(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Uint,
            width: Width::Fixed(width),
            default: None,
        })
    }

    /// Fixed-width unsigned integer field with a construction default.
    pub fn uint_default(self, name: &str, width: usize, default: u64) -> Self {
        self.field(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Uint,
            width: Width::Fixed(width),
            default: Some(Value::Uint(default)),
        })
    }

    /// Fixed-width byte blob field. Width should be a multiple of 8.
    pub fn bytes(self, name: &str, width: usize) -> Self {
        self.field(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Bytes,
            width: Width::Fixed(width),
            default: None,
        })
    }

    /// Fixed-width raw bits field.
    pub fn bits(self, name: &str, width: usize) -> Self {
        self.field(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Bits,
            width: Width::Fixed(width),
            default: None,
        })
    }

    /// Raw bits field whose width is computed per instance.
    pub fn variable_bits(self, name: &str, width: WidthFn) -> Self {
        self.field(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Bits,
            width: Width::Computed(width),
            default: None,
        })
    }

    /// Keyed option list field whose width is computed per instance.
    pub fn options(self, name: &str, table: OptionTable, width: WidthFn) -> Self {
        self.field(FieldSpec {
            name: name.to_string(),
            kind: FieldKind::Options(table),
            width: Width::Computed(width),
            default: Some(Value::Options(Vec::new())),
        })
    }

    /// Installs the payload dispatch hook.
    pub fn dispatch(
        mut self,
        f: impl Fn(&Record) -> Result<Dispatch, FieldError> + Send + Sync + 'static,
    ) -> Self {
        self.dispatch = Some(Arc::new(f));
        self
    }

    /// Installs the checksum recomputation hook.
    pub fn checksum(
        mut self,
        f: impl Fn(&mut Record, Option<&Record>) -> Result<(), FieldError> + Send + Sync + 'static,
    ) -> Self {
        self.checksum = Some(Arc::new(f));
        self
    }

    /// Validates the declaration and computes the layout, exactly once.
    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        let mut index = HashMap::with_capacity(self.fields.len());
        let mut fixed = Vec::new();
        let mut variable = Vec::new();

        for (i, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if index.insert(field.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }

            if let (FieldKind::Uint, Width::Fixed(width)) = (&field.kind, &field.width) {
                if *width > 64 {
                    return Err(SchemaError::WidthTooLarge {
                        field: field.name.clone(),
                        width: *width,
                    });
                }
                if let Some(Value::Uint(default)) = &field.default {
                    if *width < 64 && default >> width != 0 {
                        return Err(SchemaError::BadDefault(field.name.clone()));
                    }
                }
            }

            if field.width.is_variable() {
                variable.push(i);
            } else {
                fixed.push(i);
            }
        }

        let (layouts, fixed_bits) = layout::compute(&self.fields);

        Ok(Arc::new(Schema {
            name: self.name,
            fields: self.fields,
            index,
            fixed,
            variable,
            layouts,
            fixed_bits,
            dispatch: self.dispatch,
            checksum: self.checksum,
        }))
    }
}
