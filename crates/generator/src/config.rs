//! Run configuration: output directories and plugin parameters

use rpcgen_common::{ArtifactKind, GeneratorError, Result, TargetLanguage};
use std::collections::HashMap;

/// Output directory per artifact kind, relative to the `protoc` output dir
///
/// Configured through `SIMULATOR_DIR`, `EXAMPLES_DIR`, `TESTS_DIR` and
/// `STANDALONE_DIR`. Unset or `.` means no prefix. API files always land at
/// the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputDirs {
    dirs: HashMap<ArtifactKind, String>,
}

impl OutputDirs {
    const CONFIGURABLE: [ArtifactKind; 4] = [
        ArtifactKind::Simulator,
        ArtifactKind::Examples,
        ArtifactKind::Tests,
        ArtifactKind::Standalone,
    ];

    /// Build from the directory configured for each kind
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(ArtifactKind) -> Option<String>,
    {
        let dirs = Self::CONFIGURABLE
            .iter()
            .filter_map(|kind| {
                let dir = lookup(*kind)?;
                let dir = dir.trim_end_matches('/');
                if dir.is_empty() || dir == "." {
                    None
                } else {
                    Some((*kind, dir.to_string()))
                }
            })
            .collect();
        Self { dirs }
    }

    pub fn with_dir(mut self, kind: ArtifactKind, dir: impl Into<String>) -> Self {
        self.dirs.insert(kind, dir.into());
        self
    }

    /// Directory for `kind`; standalone files fall back to the examples
    /// directory
    pub fn dir_for(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Api => None,
            ArtifactKind::Standalone => self
                .dirs
                .get(&ArtifactKind::Standalone)
                .or_else(|| self.dirs.get(&ArtifactKind::Examples))
                .map(String::as_str),
            other => self.dirs.get(&other).map(String::as_str),
        }
    }

    /// Response file name for an artifact
    pub fn place(&self, kind: ArtifactKind, name: &str) -> String {
        match self.dir_for(kind) {
            Some(dir) => format!("{}/{}", dir, name),
            None => name.to_string(),
        }
    }
}

/// Options passed through `--ddprpc_out=key=value,...:OUT_DIR`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginParameters {
    pub language: Option<TargetLanguage>,
    /// Extra C++ namespace wrapped around the generated service classes
    pub services_namespace: Option<String>,
}

impl PluginParameters {
    pub fn parse(parameter: Option<&str>) -> Result<Self> {
        let mut params = Self::default();
        let Some(parameter) = parameter else {
            return Ok(params);
        };

        for entry in parameter.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                GeneratorError::Configuration(format!(
                    "Malformed parameter '{}', expected key=value",
                    entry
                ))
            })?;
            match key.trim() {
                "language" => params.language = Some(value.trim().parse()?),
                "services_namespace" => {
                    let value = value.trim();
                    if !value.is_empty() {
                        params.services_namespace = Some(value.to_string());
                    }
                }
                _ => {
                    return Err(GeneratorError::Configuration(format!(
                        "Unknown parameter: {}",
                        entry
                    )))
                }
            }
        }
        Ok(params)
    }
}

/// Pick the target language: explicit choice, then request parameter, then
/// Node.js
pub fn resolve_language(
    explicit: Option<TargetLanguage>,
    parameters: &PluginParameters,
) -> TargetLanguage {
    explicit
        .or(parameters.language)
        .unwrap_or(TargetLanguage::NodeJs)
}
