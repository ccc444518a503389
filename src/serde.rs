//! JSON-deserializable schema definitions.
//!
//! These types describe the *shape* of a record type so it can ship as a
//! definition file (for example JSON alongside the application) and be
//! compiled into a [crate::schema::Schema] at startup. Widths are either
//! constants or the scaled header-length form; option tables, payload
//! dispatch and checksum hooks are code-level concerns and cannot appear in
//! a definition file.

use serde::{Deserialize, Serialize};

use crate::errors::SchemaError;
use crate::field::{FieldKind, FieldSpec, Value, Width, scaled_width};
use crate::schema::Schema;
use std::sync::Arc;

/// Top-level definition: a named record type and its ordered fields.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchemaDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// Description of a single field.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FieldDef {
    /// Name used for all get/set access.
    pub name: String,
    /// Interpretation of the field's raw bits; defaults to `Uint`.
    #[serde(default)]
    pub kind: FieldKindDef,
    /// Constant width, or a width derived from an earlier field.
    pub width: WidthDef,
    /// Construction default, only meaningful for `Uint` fields.
    #[serde(default)]
    pub default: Option<u64>,
}

/// Field kinds expressible in a definition file.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub enum FieldKindDef {
    #[default]
    Uint,
    Bytes,
    Bits,
}

/// Width of a field in a definition file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum WidthDef {
    /// Constant bit width.
    Fixed(usize),
    /// `unit_bits * max(0, field - bias)`: the header-length pattern.
    Scaled {
        field: String,
        unit_bits: usize,
        bias: u64,
    },
}

impl SchemaDef {
    /// Compiles the definition into an immutable schema.
    ///
    /// A scaled width must reference a field declared earlier in the list
    /// with a fixed width, since widths are resolved in declaration order.
    pub fn compile(&self) -> Result<Arc<Schema>, SchemaError> {
        let mut builder = Schema::builder(&self.name);

        for (i, field) in self.fields.iter().enumerate() {
            let width = match &field.width {
                WidthDef::Fixed(w) => Width::Fixed(*w),
                WidthDef::Scaled {
                    field: referenced,
                    unit_bits,
                    bias,
                } => {
                    let resolvable = self.fields[..i].iter().any(|earlier| {
                        earlier.name == *referenced
                            && matches!(earlier.width, WidthDef::Fixed(_))
                    });
                    if !resolvable {
                        return Err(SchemaError::UnknownWidthField {
                            field: field.name.clone(),
                            referenced: referenced.clone(),
                        });
                    }
                    Width::Computed(scaled_width(referenced, *unit_bits, *bias))
                }
            };

            if field.default.is_some() && field.kind != FieldKindDef::Uint {
                return Err(SchemaError::BadDefault(field.name.clone()));
            }

            builder = builder.field(FieldSpec {
                name: field.name.clone(),
                kind: match field.kind {
                    FieldKindDef::Uint => FieldKind::Uint,
                    FieldKindDef::Bytes => FieldKind::Bytes,
                    FieldKindDef::Bits => FieldKind::Bits,
                },
                width,
                default: field.default.map(Value::Uint),
            });
        }

        builder.build()
    }
}
