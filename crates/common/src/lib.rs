//! Common types and utilities for rpcgen
//!
//! This crate contains the shared error type, the artifact vocabulary
//! (target languages, artifact kinds, file roles) and the output file
//! record used across the parser, generator, and CLI components.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during generation
///
/// Every variant is fatal for the run: the plugin writes no response when
/// any of them surfaces. Lookups that are allowed to miss (an option name
/// that no file declares) are reported as `Ok(None)` instead.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing template for language '{language}', kind '{kind}', role '{role}'")]
    MissingTemplate {
        language: String,
        kind: String,
        role: String,
    },

    #[error("Could not find an example value for field: {0}")]
    MissingExampleValue(String),

    #[error("Markup error: {0}")]
    Markup(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Target language of a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    NodeJs,
    ObjC,
    Cpp,
}

impl TargetLanguage {
    /// All supported languages
    pub const ALL: [TargetLanguage; 3] =
        [TargetLanguage::NodeJs, TargetLanguage::ObjC, TargetLanguage::Cpp];

    /// Name used in template file names and example-value profiles
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLanguage::NodeJs => "nodejs",
            TargetLanguage::ObjC => "objc",
            TargetLanguage::Cpp => "cpp",
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetLanguage {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nodejs" | "node" | "js" => Ok(TargetLanguage::NodeJs),
            "objc" | "objective-c" => Ok(TargetLanguage::ObjC),
            "cpp" | "c++" => Ok(TargetLanguage::Cpp),
            other => Err(GeneratorError::Configuration(format!(
                "Unknown target language: {}",
                other
            ))),
        }
    }
}

/// Kind of generated artifact
///
/// The kind selects the template family and the output directory override
/// (`{KIND}_DIR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Api,
    Simulator,
    Examples,
    Tests,
    Standalone,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Api => "api",
            ArtifactKind::Simulator => "simulator",
            ArtifactKind::Examples => "examples",
            ArtifactKind::Tests => "tests",
            ArtifactKind::Standalone => "standalone",
        }
    }

    /// Environment variable holding the output directory for this kind
    pub fn dir_variable(&self) -> String {
        format!("{}_DIR", self.as_str().to_uppercase())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a file within an artifact kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Header,
    Source,
}

impl FileRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Header => "header",
            FileRole::Source => "source",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated file, ready to be placed in the plugin response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub name: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_round_trip() {
        for language in TargetLanguage::ALL {
            assert_eq!(language.as_str().parse::<TargetLanguage>().unwrap(), language);
        }
        assert!("cobol".parse::<TargetLanguage>().is_err());
    }

    #[test]
    fn test_dir_variable() {
        assert_eq!(ArtifactKind::Examples.dir_variable(), "EXAMPLES_DIR");
        assert_eq!(ArtifactKind::Standalone.dir_variable(), "STANDALONE_DIR");
    }

    #[test]
    fn test_missing_template_names_triple() {
        let err = GeneratorError::MissingTemplate {
            language: "nodejs".to_string(),
            kind: "api".to_string(),
            role: "header".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("nodejs") && msg.contains("api") && msg.contains("header"));
    }
}
