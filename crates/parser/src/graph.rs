//! Read-only descriptor graph for one generation run
//!
//! The graph owns every file, message, service and method of the decoded
//! request. Nodes serialize into the template context; the raw option
//! entries stay inside the graph and are reached through a node's `key`.

use crate::options::{self, lookup_option, OptionDeclaration, OptionValue};
use crate::wire::UnknownField;
use rpcgen_common::{GeneratorError, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Repeated method option naming intermediate update responses
pub const UPDATE_RESPONSE_OPTION: &str = "update_response";

/// Method option naming the final completion response
pub const COMPLETION_RESPONSE_OPTION: &str = "completion_response";

/// File options carrying the API version
pub const API_MAJOR_VERSION_OPTION: &str = "api_major_version";
pub const API_MINOR_VERSION_OPTION: &str = "api_minor_version";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileNode {
    pub key: String,
    pub name: String,
    pub package: String,
    pub dependencies: Vec<String>,
    pub messages: Vec<MessageNode>,
    pub enums: Vec<EnumNode>,
    pub services: Vec<ServiceNode>,
    /// Custom options declared at file scope
    pub extensions: Vec<OptionDeclaration>,
    /// `option cc_generic_services = true;`
    pub cc_generic_services: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageNode {
    pub key: String,
    pub name: String,
    /// Fully-qualified name with a leading dot, e.g. `.payments.ChargeArgs`
    pub full_name: String,
    pub fields: Vec<FieldNode>,
    pub nested: Vec<MessageNode>,
    pub enums: Vec<EnumNode>,
    pub extensions: Vec<OptionDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldNode {
    pub name: String,
    pub number: i32,
    /// Scalar kind such as `string`, `int32`, `message`, `enum`
    #[serde(rename = "type")]
    pub field_type: String,
    /// Referenced message or enum for `message`/`enum` fields
    pub type_name: Option<String>,
    pub label: String,
    pub repeated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumNode {
    pub name: String,
    pub full_name: String,
    pub values: Vec<EnumValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueNode {
    pub name: String,
    pub number: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceNode {
    pub key: String,
    pub name: String,
    pub full_name: String,
    /// Name of the declaring file
    pub file: String,
    pub methods: Vec<MethodNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodNode {
    pub key: String,
    pub name: String,
    pub full_name: String,
    /// Name of the owning service
    pub service: String,
    pub input_type: String,
    pub output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseKind {
    Update,
    Completion,
}

/// A response a method emits, from its `update_response` and
/// `completion_response` options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodResponse {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    /// Message name without its package
    pub name: String,
}

/// The decoded request
#[derive(Debug, Clone)]
pub struct DescriptorGraph {
    files: Vec<FileNode>,
    files_to_generate: Vec<String>,
    parameter: Option<String>,
    options: HashMap<String, Vec<UnknownField>>,
}

impl DescriptorGraph {
    pub(crate) fn from_parts(
        files: Vec<FileNode>,
        files_to_generate: Vec<String>,
        parameter: Option<String>,
        options: HashMap<String, Vec<UnknownField>>,
    ) -> Self {
        Self {
            files,
            files_to_generate,
            parameter,
            options,
        }
    }

    pub fn files(&self) -> &[FileNode] {
        &self.files
    }

    pub fn files_to_generate(&self) -> &[String] {
        &self.files_to_generate
    }

    /// Plugin parameter passed through `--<plugin>_out=PARAM:DIR`
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// All services in declaration order across files
    pub fn services(&self) -> Vec<&ServiceNode> {
        self.files.iter().flat_map(|f| f.services.iter()).collect()
    }

    /// Service with the given node key
    pub fn service_by_key(&self, key: &str) -> Option<&ServiceNode> {
        self.services().into_iter().find(|s| s.key == key)
    }

    /// Method with the given node key
    pub fn method_by_key(&self, key: &str) -> Option<&MethodNode> {
        self.services()
            .into_iter()
            .flat_map(|s| s.methods.iter())
            .find(|m| m.key == key)
    }

    /// File that declares the named service
    pub fn service_file(&self, service_name: &str) -> Option<&FileNode> {
        self.files.iter().find(|file| {
            file.services
                .iter()
                .any(|s| s.name == service_name || s.full_name == service_name)
        })
    }

    /// Every message, nested ones included, in declaration order
    pub fn messages(&self) -> Vec<&MessageNode> {
        fn collect<'a>(messages: &'a [MessageNode], out: &mut Vec<&'a MessageNode>) {
            for message in messages {
                out.push(message);
                collect(&message.nested, out);
            }
        }

        let mut out = Vec::new();
        for file in &self.files {
            collect(&file.messages, &mut out);
        }
        out
    }

    /// Resolve a message by plain name or by `.package.Name`
    pub fn find_message(&self, name: &str) -> Option<&MessageNode> {
        let by_full_name = name.starts_with('.');
        self.messages().into_iter().find(|message| {
            if by_full_name {
                message.full_name == name
            } else {
                message.name == name
            }
        })
    }

    /// Argument message of a method, named `{Method}Args` by convention
    pub fn arguments_message(&self, method_name: &str) -> Option<&MessageNode> {
        self.find_message(&format!("{}Args", method_name))
    }

    /// Message carried by a response
    pub fn response_message(&self, response_name: &str) -> Option<&MessageNode> {
        self.find_message(response_name)
    }

    /// Unrecognized option entries of the node with `key`
    pub fn options_for(&self, key: &str) -> &[UnknownField] {
        self.options.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Extension lists in lookup order: per file, the file scope first and
    /// then its messages
    pub fn declaration_scopes(&self) -> Vec<&[OptionDeclaration]> {
        fn collect<'a>(messages: &'a [MessageNode], out: &mut Vec<&'a [OptionDeclaration]>) {
            for message in messages {
                out.push(message.extensions.as_slice());
                collect(&message.nested, out);
            }
        }

        let mut scopes = Vec::new();
        for file in &self.files {
            scopes.push(file.extensions.as_slice());
            collect(&file.messages, &mut scopes);
        }
        scopes
    }

    /// First declaration of `option_name` in any scope
    pub fn find_declaration(&self, option_name: &str) -> Option<&OptionDeclaration> {
        self.declaration_scopes()
            .into_iter()
            .flat_map(|scope| scope.iter())
            .find(|d| d.name == option_name)
    }

    /// Value of a custom option on the node with `key`
    ///
    /// The first declaring scope that yields values wins. A repeated
    /// option that is declared but unset resolves to an empty list; an
    /// unset singular option, or a name nothing declares, is `None`.
    pub fn option_values(&self, key: &str, option_name: &str) -> Result<Option<OptionValue>> {
        let fields = self.options_for(key);
        let mut declared: Option<&OptionDeclaration> = None;

        for scope in self.declaration_scopes() {
            if let Some(lookup) = lookup_option(option_name, scope, fields)? {
                if let Some(value) = lookup.value() {
                    return Ok(Some(value));
                }
                declared.get_or_insert(lookup.declaration);
            }
        }

        Ok(match declared {
            Some(declaration) if declaration.repeated => Some(OptionValue::List(Vec::new())),
            _ => None,
        })
    }

    /// Update and completion responses of a method, in option order
    pub fn method_responses(&self, method: &MethodNode) -> Result<Vec<MethodResponse>> {
        let update = self.find_declaration(UPDATE_RESPONSE_OPTION).map(|d| d.number);
        let completion = self
            .find_declaration(COMPLETION_RESPONSE_OPTION)
            .map(|d| d.number);

        let mut responses = Vec::new();
        for field in self.options_for(&method.key) {
            let (number, wire_type) = field.decode_tag()?;
            let kind = if Some(number) == update {
                ResponseKind::Update
            } else if Some(number) == completion {
                ResponseKind::Completion
            } else {
                continue;
            };

            let value = options::decode_value(&field.payload, wire_type)?;
            let type_name = value.as_str().ok_or_else(|| {
                GeneratorError::Decode(format!(
                    "Response option on {} is not a type name",
                    method.full_name
                ))
            })?;

            responses.push(MethodResponse {
                kind,
                name: short_name(type_name).to_string(),
            });
        }

        Ok(responses)
    }

    /// Sorted, deduplicated response names across a service
    pub fn unique_responses(&self, service: &ServiceNode) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for method in &service.methods {
            for response in self.method_responses(method)? {
                names.insert(response.name);
            }
        }
        Ok(names.into_iter().collect())
    }
}

/// Last segment of a dotted type name
pub fn short_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(short_name(".payments.ChargeCompleted"), "ChargeCompleted");
        assert_eq!(short_name("Charge"), "Charge");
        assert_eq!(short_name(""), "");
    }
}
