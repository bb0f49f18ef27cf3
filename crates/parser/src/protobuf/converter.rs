//! Converts the raw plugin request into the descriptor graph

use super::raw;
use crate::graph::{
    DescriptorGraph, EnumNode, EnumValueNode, FieldNode, FileNode, MessageNode, MethodNode,
    ServiceNode,
};
use crate::options::{self, OptionDeclaration, OptionsKind, CC_GENERIC_SERVICES_FIELD};
use crate::wire::UnknownField;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{EnumDescriptorProto, FieldDescriptorProto};
use rpcgen_common::{GeneratorError, Result};
use std::collections::HashMap;

/// Raw option entries collected while converting, keyed by node key
type OptionsIndex = HashMap<String, Vec<UnknownField>>;

/// Convert a decoded request into a `DescriptorGraph`
pub fn convert_request_to_graph(request: raw::CodeGeneratorRequest) -> Result<DescriptorGraph> {
    let mut index = OptionsIndex::new();
    let mut files = Vec::with_capacity(request.proto_file.len());

    for file in &request.proto_file {
        files.push(convert_file(file, &mut index)?);
    }

    Ok(DescriptorGraph::from_parts(
        files,
        request.file_to_generate,
        request.parameter,
        index,
    ))
}

fn convert_file(file: &raw::FileDescriptorProto, index: &mut OptionsIndex) -> Result<FileNode> {
    let name = file.name().to_string();
    let package = file.package().to_string();
    let key = format!("file:{}", name);
    record_options(index, &key, OptionsKind::File, file.options.as_deref())?;
    let cc_generic_services = match file.options.as_deref() {
        Some(bytes) => options::standard_flag(bytes, CC_GENERIC_SERVICES_FIELD)
            .map_err(|e| GeneratorError::Decode(format!("Options of {}: {}", key, e)))?,
        None => false,
    };

    let scope = qualify("", &package);
    let messages = file
        .message_type
        .iter()
        .map(|m| convert_message(m, &scope, index))
        .collect::<Result<Vec<_>>>()?;
    let services = file
        .service
        .iter()
        .map(|s| convert_service(s, &name, &scope, index))
        .collect::<Result<Vec<_>>>()?;

    Ok(FileNode {
        key,
        name,
        package,
        dependencies: file.dependency.clone(),
        messages,
        enums: file.enum_type.iter().map(|e| convert_enum(e, &scope)).collect(),
        services,
        extensions: file.extension.iter().map(OptionDeclaration::from_field).collect(),
        cc_generic_services,
    })
}

fn convert_message(
    message: &raw::DescriptorProto,
    scope: &str,
    index: &mut OptionsIndex,
) -> Result<MessageNode> {
    let name = message.name().to_string();
    let full_name = qualify(scope, &name);
    let key = format!("message:{}", full_name);
    record_options(index, &key, OptionsKind::Message, message.options.as_deref())?;

    let nested = message
        .nested_type
        .iter()
        .map(|m| convert_message(m, &full_name, index))
        .collect::<Result<Vec<_>>>()?;

    Ok(MessageNode {
        key,
        name,
        fields: message.field.iter().map(convert_field).collect(),
        nested,
        enums: message
            .enum_type
            .iter()
            .map(|e| convert_enum(e, &full_name))
            .collect(),
        extensions: message
            .extension
            .iter()
            .map(OptionDeclaration::from_field)
            .collect(),
        full_name,
    })
}

fn convert_field(field: &FieldDescriptorProto) -> FieldNode {
    let field_type = field
        .r#type
        .and_then(|t| Type::try_from(t).ok())
        .map(|t| strip_prefix_lower(t.as_str_name(), "TYPE_"))
        .unwrap_or_else(|| "message".to_string());
    let label = field
        .label
        .and_then(|l| Label::try_from(l).ok())
        .unwrap_or(Label::Optional);

    FieldNode {
        name: field.name().to_string(),
        number: field.number(),
        field_type,
        type_name: field.type_name.clone(),
        label: strip_prefix_lower(label.as_str_name(), "LABEL_"),
        repeated: label == Label::Repeated,
    }
}

fn convert_enum(enumeration: &EnumDescriptorProto, scope: &str) -> EnumNode {
    let name = enumeration.name().to_string();
    EnumNode {
        full_name: qualify(scope, &name),
        values: enumeration
            .value
            .iter()
            .map(|v| EnumValueNode {
                name: v.name().to_string(),
                number: v.number(),
            })
            .collect(),
        name,
    }
}

fn convert_service(
    service: &raw::ServiceDescriptorProto,
    file_name: &str,
    scope: &str,
    index: &mut OptionsIndex,
) -> Result<ServiceNode> {
    let name = service.name().to_string();
    let full_name = qualify(scope, &name);
    let key = format!("service:{}", full_name);
    record_options(index, &key, OptionsKind::Service, service.options.as_deref())?;

    let methods = service
        .method
        .iter()
        .map(|m| convert_method(m, &name, &full_name, index))
        .collect::<Result<Vec<_>>>()?;

    Ok(ServiceNode {
        key,
        name,
        full_name,
        file: file_name.to_string(),
        methods,
    })
}

fn convert_method(
    method: &raw::MethodDescriptorProto,
    service_name: &str,
    service_full_name: &str,
    index: &mut OptionsIndex,
) -> Result<MethodNode> {
    let name = method.name().to_string();
    let full_name = format!("{}.{}", service_full_name, name);
    let key = format!("method:{}", full_name);
    record_options(index, &key, OptionsKind::Method, method.options.as_deref())?;

    Ok(MethodNode {
        key,
        name,
        full_name,
        service: service_name.to_string(),
        input_type: method.input_type().to_string(),
        output_type: method.output_type().to_string(),
        client_streaming: method.client_streaming(),
        server_streaming: method.server_streaming(),
    })
}

/// Split an options blob and index its unrecognized entries under `key`
fn record_options(
    index: &mut OptionsIndex,
    key: &str,
    kind: OptionsKind,
    options: Option<&[u8]>,
) -> Result<()> {
    let Some(bytes) = options else {
        return Ok(());
    };

    let fields = kind
        .unknown_fields(bytes)
        .map_err(|e| GeneratorError::Decode(format!("Options of {}: {}", key, e)))?;
    if !fields.is_empty() {
        index.insert(key.to_string(), fields);
    }
    Ok(())
}

/// Fully-qualified name with a leading dot
fn qualify(scope: &str, name: &str) -> String {
    if name.is_empty() {
        scope.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

/// `TYPE_STRING` -> `string`
fn strip_prefix_lower(name: &str, prefix: &str) -> String {
    name.strip_prefix(prefix).unwrap_or(name).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("", "payments"), ".payments");
        assert_eq!(qualify("", ""), "");
        assert_eq!(qualify(".payments", "Charge"), ".payments.Charge");
        assert_eq!(qualify("", "Charge"), ".Charge");
    }

    #[test]
    fn test_strip_prefix_lower() {
        assert_eq!(strip_prefix_lower("TYPE_STRING", "TYPE_"), "string");
        assert_eq!(strip_prefix_lower("LABEL_REPEATED", "LABEL_"), "repeated");
    }

    #[test]
    fn test_convert_field_defaults() {
        let field = FieldDescriptorProto {
            name: Some("amount".to_string()),
            number: Some(2),
            r#type: Some(Type::Int64 as i32),
            ..Default::default()
        };
        let node = convert_field(&field);
        assert_eq!(node.field_type, "int64");
        assert_eq!(node.label, "optional");
        assert!(!node.repeated);
    }
}
