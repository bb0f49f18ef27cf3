//! CodeGeneratorRequest parser

use super::raw::CodeGeneratorRequest;
use crate::graph::DescriptorGraph;
use prost::Message;
use rpcgen_common::{GeneratorError, Result};
use std::fs;
use std::path::Path;

/// Plugin request parser
///
/// Holds a decoded request until it is converted into a
/// [`DescriptorGraph`].
pub struct RequestParser {
    request: CodeGeneratorRequest,
}

impl RequestParser {
    /// Load a request previously cached to disk
    ///
    /// # Example
    /// ```rust,ignore
    /// let parser = RequestParser::from_file("/tmp/request.bin")?;
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref()).map_err(|e| {
            GeneratorError::Parse(format!(
                "Failed to read request file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_bytes(&bytes)
    }

    /// Decode a request from its binary encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let request = CodeGeneratorRequest::decode(bytes).map_err(|e| {
            GeneratorError::Parse(format!("Failed to decode CodeGeneratorRequest: {}", e))
        })?;

        Ok(Self { request })
    }

    /// Wrap an already-decoded request
    pub fn from_request(request: CodeGeneratorRequest) -> Self {
        Self { request }
    }

    /// Convert the request into the descriptor graph
    pub fn parse(self) -> Result<DescriptorGraph> {
        super::converter::convert_request_to_graph(self.request)
    }

    /// Get reference to the underlying request
    pub fn request(&self) -> &CodeGeneratorRequest {
        &self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_request() {
        let bytes = CodeGeneratorRequest::default().encode_to_vec();

        let graph = RequestParser::from_bytes(&bytes).unwrap().parse().unwrap();
        assert!(graph.files().is_empty());
        assert!(graph.services().is_empty());
    }

    #[test]
    fn test_parse_garbage_fails() {
        let result = RequestParser::from_bytes(&[0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(GeneratorError::Parse(_))));
    }
}
