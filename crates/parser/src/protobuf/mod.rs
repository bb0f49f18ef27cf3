//! `protoc` plugin request decoding
//!
//! Decodes a `CodeGeneratorRequest` into the descriptor graph.
//!
//! ## Custom options
//! `prost-types` drops extension fields when it decodes an options message,
//! which would lose every custom option. The request is therefore decoded
//! through the mirrors in [`raw`], which keep options as raw bytes.
//!
//! ## Example
//! ```rust,ignore
//! use rpcgen_parser::RequestParser;
//!
//! let graph = RequestParser::from_bytes(&stdin_bytes)?.parse()?;
//! for service in graph.services() {
//!     println!("{}", service.name);
//! }
//! ```

mod converter;
mod parser;
pub mod raw;

pub use parser::RequestParser;
