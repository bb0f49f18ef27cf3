//! Custom option recovery
//!
//! Custom options are extensions of the `google.protobuf.*Options`
//! messages. The descriptor mirror keeps every options message as raw
//! bytes, so the extension values survive only as unrecognized fields.
//! This module matches those fields against the extension declarations
//! and decodes their values.

use crate::wire::{self, UnknownField, WireType};
use prost_types::field_descriptor_proto::Label;
use prost_types::FieldDescriptorProto;
use rpcgen_common::{GeneratorError, Result};
use serde::Serialize;

/// Declaration of a custom option (an `extend` field)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDeclaration {
    pub name: String,
    pub number: u32,
    pub repeated: bool,
    /// Options message being extended, e.g. `.google.protobuf.MethodOptions`
    pub extendee: Option<String>,
}

impl OptionDeclaration {
    /// Build a declaration from an extension field descriptor
    pub fn from_field(field: &FieldDescriptorProto) -> Self {
        Self {
            name: field.name().to_string(),
            number: u32::try_from(field.number()).unwrap_or_default(),
            repeated: field.label == Some(Label::Repeated as i32),
            extendee: field.extendee.clone(),
        }
    }
}

/// A decoded custom option value
///
/// Booleans arrive as varints and decode to `Integer(0)` or `Integer(1)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Integer(u64),
    String(String),
    List(Vec<OptionValue>),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            OptionValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

/// Result of looking an option up on one entity
#[derive(Debug, Clone, PartialEq)]
pub struct OptionLookup<'a> {
    pub declaration: &'a OptionDeclaration,
    /// Every value set on the entity, in wire order
    pub values: Vec<OptionValue>,
}

impl OptionLookup<'_> {
    /// The option's value as seen by templates
    ///
    /// Repeated options yield all values as a list, singular options the
    /// first value. An option that is declared but not set yields `None`.
    pub fn value(&self) -> Option<OptionValue> {
        if self.values.is_empty() {
            None
        } else if self.declaration.repeated {
            Some(OptionValue::List(self.values.clone()))
        } else {
            self.values.first().cloned()
        }
    }
}

/// Look `option_name` up among `declarations` and decode its values from
/// `unknown_fields`
///
/// Returns `Ok(None)` when no declaration has that name. Entries whose
/// field number differs from the declaration's belong to other options and
/// are skipped.
pub fn lookup_option<'a>(
    option_name: &str,
    declarations: &'a [OptionDeclaration],
    unknown_fields: &[UnknownField],
) -> Result<Option<OptionLookup<'a>>> {
    let Some(declaration) = declarations.iter().find(|d| d.name == option_name) else {
        return Ok(None);
    };

    let mut values = Vec::new();
    for field in unknown_fields {
        let (number, wire_type) = field.decode_tag()?;
        if number != declaration.number {
            continue;
        }
        values.push(decode_value(&field.payload, wire_type).map_err(|e| {
            GeneratorError::Decode(format!("Option '{}' (field {}): {}", option_name, number, e))
        })?);
    }

    Ok(Some(OptionLookup {
        declaration,
        values,
    }))
}

/// Decode one option payload according to its wire type
pub fn decode_value(payload: &[u8], wire_type: WireType) -> Result<OptionValue> {
    match wire_type {
        WireType::Varint => {
            let (value, consumed) = wire::decode_varint(payload)?;
            if consumed != payload.len() {
                return Err(GeneratorError::Decode(format!(
                    "Varint payload has {} trailing bytes",
                    payload.len() - consumed
                )));
            }
            Ok(OptionValue::Integer(value))
        }
        WireType::LengthDelimited => {
            let body = wire::decode_length_delimited(payload)?;
            let text = String::from_utf8(body.to_vec())
                .map_err(|e| GeneratorError::Decode(format!("Option text is not UTF-8: {}", e)))?;
            Ok(OptionValue::String(text))
        }
        other => Err(GeneratorError::Decode(format!(
            "Unsupported wire type {:?} for a custom option",
            other
        ))),
    }
}

/// `FileOptions.cc_generic_services`
pub const CC_GENERIC_SERVICES_FIELD: u32 = 16;

/// Value of a standard boolean field in a raw options message
///
/// The last occurrence wins, as for any singular field. Absent means
/// `false`.
pub fn standard_flag(options: &[u8], number: u32) -> Result<bool> {
    let mut flag = false;
    for field in wire::split_fields(options)? {
        let (field_number, wire_type) = field.decode_tag()?;
        if field_number != number {
            continue;
        }
        let value = decode_value(&field.payload, wire_type)?;
        flag = value.as_integer().ok_or_else(|| {
            GeneratorError::Decode(format!("Standard option field {} is not a boolean", number))
        })? != 0;
    }
    Ok(flag)
}

/// Which standard options message an entity carries
///
/// Fields that `descriptor.proto` itself defines are recognized and never
/// reported as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsKind {
    File,
    Message,
    Service,
    Method,
}

impl OptionsKind {
    fn standard_fields(&self) -> &'static [u32] {
        match self {
            OptionsKind::File => &[
                1, 8, 9, 10, 11, 16, 17, 18, 20, 23, 27, 31, 36, 37, 39, 40, 41, 44, 45, 50, 999,
            ],
            OptionsKind::Message => &[1, 2, 3, 7, 11, 12, 999],
            OptionsKind::Service => &[33, 34, 999],
            OptionsKind::Method => &[33, 34, 35, 999],
        }
    }

    /// Split a raw options message into its unrecognized fields
    pub fn unknown_fields(&self, options: &[u8]) -> Result<Vec<UnknownField>> {
        let standard = self.standard_fields();
        let mut fields = Vec::new();
        for field in wire::split_fields(options)? {
            let (number, _) = field.decode_tag()?;
            if !standard.contains(&number) {
                fields.push(field);
            }
        }
        Ok(fields)
    }
}
