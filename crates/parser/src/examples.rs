//! Example-value table
//!
//! Maps protobuf field names to example values that templates print into
//! usage examples and tests. The table is a JSON (or YAML) object; the
//! optional `language_type_mappings` entry holds per-language literal
//! formats:
//!
//! ```json
//! {
//!   "amount": 1500,
//!   "currency": "USD",
//!   "card_type": "e:CardType.VISA",
//!   "language_type_mappings": {
//!     "objc": { "string_prefix": "@\"", "string_suffix": "\"",
//!               "true_value": "YES", "false_value": "NO",
//!               "array_prefix": "@[", "array_suffix": "]" }
//!   }
//! }
//! ```

use rpcgen_common::{GeneratorError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Key of the per-language literal formats inside the table
pub const LANGUAGE_MAPPINGS_KEY: &str = "language_type_mappings";

/// Prefix marking a string value as an enum reference
pub const ENUM_PREFIX: &str = "e:";

/// An example value, classified once when the table is loaded
#[derive(Debug, Clone, PartialEq)]
pub enum ExampleValue {
    String(String),
    /// `e:Type.VALUE`, printed as the quoted value name
    EnumRef(String),
    Bool(bool),
    List(Vec<ExampleValue>),
    /// Numbers and anything else, printed as JSON text
    Other(String),
}

impl ExampleValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => match s.strip_prefix(ENUM_PREFIX) {
                Some(reference) => ExampleValue::EnumRef(reference.to_string()),
                None => ExampleValue::String(s.clone()),
            },
            Value::Bool(b) => ExampleValue::Bool(*b),
            Value::Array(items) => {
                ExampleValue::List(items.iter().map(ExampleValue::from_json).collect())
            }
            other => ExampleValue::Other(other.to_string()),
        }
    }

    /// Render the value as a source literal
    pub fn format(&self, format: &LiteralFormat) -> String {
        match self {
            ExampleValue::String(s) => {
                format!("{}{}{}", format.string_prefix, s, format.string_suffix)
            }
            ExampleValue::EnumRef(reference) => {
                let value = reference.rsplit('.').next().unwrap_or(reference);
                format!("\"{}\"", value)
            }
            ExampleValue::Bool(true) => format.true_value.clone(),
            ExampleValue::Bool(false) => format.false_value.clone(),
            ExampleValue::List(items) => {
                let items: Vec<String> = items.iter().map(|item| item.format(format)).collect();
                format!(
                    "{}{}{}",
                    format.array_prefix,
                    items.join(", "),
                    format.array_suffix
                )
            }
            ExampleValue::Other(text) => text.clone(),
        }
    }
}

/// Literal tokens for one target language
///
/// Missing keys fall back to JavaScript-style literals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LiteralFormat {
    pub string_prefix: String,
    pub string_suffix: String,
    pub true_value: String,
    pub false_value: String,
    pub array_prefix: String,
    pub array_suffix: String,
}

impl Default for LiteralFormat {
    fn default() -> Self {
        Self {
            string_prefix: "\"".to_string(),
            string_suffix: "\"".to_string(),
            true_value: "true".to_string(),
            false_value: "false".to_string(),
            array_prefix: "[".to_string(),
            array_suffix: "]".to_string(),
        }
    }
}

/// Loaded example-value table
#[derive(Debug, Clone, Default)]
pub struct ExampleValues {
    values: HashMap<String, ExampleValue>,
    formats: HashMap<String, LiteralFormat>,
}

impl ExampleValues {
    /// Load a table from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Parse(format!(
                "Failed to read example values {}: {}",
                path.display(),
                e
            ))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let value: Value = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| {
                GeneratorError::Parse(format!(
                    "Failed to parse example values YAML from {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| {
                GeneratorError::Parse(format!(
                    "Failed to parse example values JSON from {}: {}",
                    path.display(),
                    e
                ))
            })?
        };

        Self::from_value(value)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(content)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut entries) = value else {
            return Err(GeneratorError::Parse(
                "Example values must be an object keyed by field name".to_string(),
            ));
        };

        let formats = match entries.remove(LANGUAGE_MAPPINGS_KEY) {
            Some(mappings) => serde_json::from_value(mappings)?,
            None => HashMap::new(),
        };
        let values = entries
            .iter()
            .map(|(field, raw)| (field.clone(), ExampleValue::from_json(raw)))
            .collect();

        Ok(Self { values, formats })
    }

    pub fn get(&self, field_name: &str) -> Option<&ExampleValue> {
        self.values.get(field_name)
    }

    /// Literal format registered for `language`, if any
    pub fn format_for(&self, language: &str) -> Option<&LiteralFormat> {
        self.formats.get(language)
    }

    /// Example literal for `field_name` in `language`
    ///
    /// An unknown field is an error: the template asks for a value the
    /// table does not carry.
    pub fn literal(&self, field_name: &str, language: &str) -> Result<String> {
        let value = self
            .get(field_name)
            .ok_or_else(|| GeneratorError::MissingExampleValue(field_name.to_string()))?;

        Ok(match self.format_for(language) {
            Some(format) => value.format(format),
            None => value.format(&LiteralFormat::default()),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
