//! Lookup filters bound into Tera
//!
//! Templates receive graph nodes as plain values. Filters that need more
//! than the value itself (option entries, other messages, example values)
//! reach back into the run's [`LookupContext`], which every filter shares
//! through `Arc`.

use crate::naming::{lowercase_first_letter, remove_package};
use crate::profile::Recase;
use rpcgen_common::{GeneratorError, TargetLanguage};
use rpcgen_parser::{DescriptorGraph, ExampleValues};
use std::collections::HashMap;
use std::sync::Arc;
use tera::{Filter, Tera, Value};

/// Read-only state shared by all filters of one run
#[derive(Debug)]
pub struct LookupContext {
    pub graph: Arc<DescriptorGraph>,
    pub examples: Arc<ExampleValues>,
    pub language: TargetLanguage,
    pub recase: Recase,
}

/// Register every lookup filter on `tera`
pub fn register_filters(tera: &mut Tera, context: Arc<LookupContext>) {
    tera.register_filter("find_proto_by_name", FindProtoByName(context.clone()));
    tera.register_filter(
        "find_arguments_proto_by_method_name",
        FindArgumentsProto(context.clone()),
    );
    tera.register_filter(
        "find_response_args_proto_by_response_name",
        FindResponseProto(context.clone()),
    );
    tera.register_filter(
        "get_example_value_for_field",
        ExampleValueForField(context.clone()),
    );
    tera.register_filter("recase", RecaseFilter(context.recase));
    tera.register_filter("option_values", OptionValues(context.clone()));
    tera.register_filter("get_method_options", MethodOptions(context.clone()));
    tera.register_filter("unique_responses", UniqueResponses(context.clone()));
    tera.register_filter("service_file", ServiceFile(context));
    tera.register_filter("lowercase_first_letter", lowercase_first_letter_filter);
    tera.register_filter("remove_package", remove_package_filter);
}

struct FindProtoByName(Arc<LookupContext>);

impl Filter for FindProtoByName {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = expect_str(value, "find_proto_by_name")?;
        optional(self.0.graph.find_message(name))
    }
}

struct FindArgumentsProto(Arc<LookupContext>);

impl Filter for FindArgumentsProto {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let method = expect_str(value, "find_arguments_proto_by_method_name")?;
        optional(self.0.graph.arguments_message(method))
    }
}

struct FindResponseProto(Arc<LookupContext>);

impl Filter for FindResponseProto {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let response = expect_str(value, "find_response_args_proto_by_response_name")?;
        optional(self.0.graph.response_message(response))
    }
}

struct ExampleValueForField(Arc<LookupContext>);

impl Filter for ExampleValueForField {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let field = expect_str(value, "get_example_value_for_field")?;
        let literal = self
            .0
            .examples
            .literal(field, self.0.language.as_str())
            .map_err(|e| lookup_failed("get_example_value_for_field", e))?;
        Ok(Value::String(literal))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

struct RecaseFilter(Recase);

impl Filter for RecaseFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let identifier = expect_str(value, "recase")?;
        Ok(Value::String(self.0.apply(identifier)))
    }
}

/// `{{ method | option_values(name="update_response") }}`
///
/// Accepts a node (anything with a `key`) or a key string. Yields null when
/// the option is undeclared or an unset singular option.
struct OptionValues(Arc<LookupContext>);

impl Filter for OptionValues {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let key = node_key(value, "option_values")?;
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("option_values filter expects a `name` argument"))?;

        let values = self
            .0
            .graph
            .option_values(key, name)
            .map_err(|e| lookup_failed("option_values", e))?;
        optional(values.as_ref())
    }
}

struct MethodOptions(Arc<LookupContext>);

impl Filter for MethodOptions {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let key = node_key(value, "get_method_options")?;
        let method = self.0.graph.method_by_key(key).ok_or_else(|| {
            tera::Error::msg(format!("get_method_options: no method with key {}", key))
        })?;
        let responses = self
            .0
            .graph
            .method_responses(method)
            .map_err(|e| lookup_failed("get_method_options", e))?;
        Ok(tera::to_value(responses)?)
    }
}

struct UniqueResponses(Arc<LookupContext>);

impl Filter for UniqueResponses {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let key = node_key(value, "unique_responses")?;
        let service = self.0.graph.service_by_key(key).ok_or_else(|| {
            tera::Error::msg(format!("unique_responses: no service with key {}", key))
        })?;
        let names = self
            .0
            .graph
            .unique_responses(service)
            .map_err(|e| lookup_failed("unique_responses", e))?;
        Ok(tera::to_value(names)?)
    }
}

/// File node declaring a service; an unknown service is an input error
struct ServiceFile(Arc<LookupContext>);

impl Filter for ServiceFile {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let service = match value {
            Value::Object(node) => node.get("name").and_then(Value::as_str),
            other => other.as_str(),
        }
        .ok_or_else(|| tera::Error::msg("service_file filter expects a service or its name"))?;

        match self.0.graph.service_file(service) {
            Some(file) => Ok(tera::to_value(file)?),
            None => Err(lookup_failed(
                "service_file",
                GeneratorError::Input(format!("No file declares service {}", service)),
            )),
        }
    }
}

fn lowercase_first_letter_filter(
    value: &Value,
    _args: &HashMap<String, Value>,
) -> tera::Result<Value> {
    let s = expect_str(value, "lowercase_first_letter")?;
    Ok(Value::String(lowercase_first_letter(s)))
}

fn remove_package_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = expect_str(value, "remove_package")?;
    Ok(Value::String(remove_package(s).to_string()))
}

fn expect_str<'a>(value: &'a Value, filter: &str) -> tera::Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| tera::Error::msg(format!("{} filter expects a string", filter)))
}

/// Node key of a serialized graph node, or the value itself when it is
/// already a key
fn node_key<'a>(value: &'a Value, filter: &str) -> tera::Result<&'a str> {
    match value {
        Value::Object(node) => node.get("key").and_then(Value::as_str),
        other => other.as_str(),
    }
    .ok_or_else(|| tera::Error::msg(format!("{} filter expects a node or a node key", filter)))
}

fn optional<T: serde::Serialize>(found: Option<&T>) -> tera::Result<Value> {
    match found {
        Some(node) => Ok(tera::to_value(node)?),
        None => Ok(Value::Null),
    }
}

/// Wrap a generator error so that it survives Tera's error chain
fn lookup_failed(filter: &str, err: GeneratorError) -> tera::Error {
    tera::Error::chain(format!("{} lookup failed", filter), err)
}

/// Find the generator error a filter raised somewhere in a render error
pub fn generator_error(err: &tera::Error) -> Option<GeneratorError> {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        if let Some(found) = current.downcast_ref::<GeneratorError>() {
            return Some(match found {
                GeneratorError::MissingExampleValue(field) => {
                    GeneratorError::MissingExampleValue(field.clone())
                }
                GeneratorError::Decode(msg) => GeneratorError::Decode(msg.clone()),
                GeneratorError::Input(msg) => GeneratorError::Input(msg.clone()),
                other => GeneratorError::Generation(other.to_string()),
            });
        }
        source = current.source();
    }
    None
}
