//! Request decoding and descriptor access for rpcgen
//!
//! This crate turns the `CodeGeneratorRequest` that `protoc` hands a plugin
//! into a read-only [`DescriptorGraph`], and recovers the custom options
//! that the generic descriptor reader cannot see.
//!
//! ## Custom options
//!
//! Options such as `api_minor_version` or `update_response` are extensions
//! of the standard options messages. They reach the plugin only as
//! unrecognized fields, so they are decoded by hand:
//! - [`wire`] splits an options blob into `(tag, payload)` entries
//! - [`options`] matches entries to extension declarations by field number
//!   and decodes varint and length-delimited values

pub mod examples;
pub mod graph;
pub mod options;
pub mod protobuf;
pub mod wire;

pub use examples::{ExampleValue, ExampleValues, LiteralFormat};
pub use graph::{
    DescriptorGraph, EnumNode, FieldNode, FileNode, MessageNode, MethodNode, MethodResponse,
    ResponseKind, ServiceNode,
};
pub use options::{
    lookup_option, standard_flag, OptionDeclaration, OptionLookup, OptionValue, OptionsKind,
};
pub use protobuf::RequestParser;
pub use wire::{UnknownField, WireType};

use rpcgen_common::Result;

/// Decode a binary `CodeGeneratorRequest` into a descriptor graph
///
/// # Arguments
/// * `bytes` - The request exactly as `protoc` wrote it to stdin
///
/// # Returns
/// * `DescriptorGraph` - Files, messages, services and methods of the request
pub fn parse_request(bytes: &[u8]) -> Result<DescriptorGraph> {
    RequestParser::from_bytes(bytes)?.parse()
}
