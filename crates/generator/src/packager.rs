//! Collects generated files into the plugin response

use crate::beautify::Beautify;
use crate::config::OutputDirs;
use prost_types::compiler::{code_generator_response, CodeGeneratorResponse};
use rpcgen_common::{ArtifactKind, GeneratorError, OutputFile, Result};
use std::collections::HashSet;

/// Places, beautifies and records every generated file
pub struct OutputPackager<'a> {
    dirs: &'a OutputDirs,
    beautifier: &'a dyn Beautify,
    files: Vec<OutputFile>,
    names: HashSet<String>,
}

impl<'a> OutputPackager<'a> {
    pub fn new(dirs: &'a OutputDirs, beautifier: &'a dyn Beautify) -> Self {
        Self {
            dirs,
            beautifier,
            files: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Beautify `content` and record it under the kind's output directory
    pub fn add(&mut self, kind: ArtifactKind, name: &str, content: &str) -> Result<()> {
        let content = self.beautifier.beautify(content)?;
        self.add_formatted(kind, name, content)
    }

    /// Record content that is already beautified
    pub fn add_formatted(&mut self, kind: ArtifactKind, name: &str, content: String) -> Result<()> {
        let name = self.dirs.place(kind, name);
        if !self.names.insert(name.clone()) {
            return Err(GeneratorError::Generation(format!(
                "Two artifacts map to the same file: {}",
                name
            )));
        }
        self.files.push(OutputFile { name, content });
        Ok(())
    }

    pub fn files(&self) -> &[OutputFile] {
        &self.files
    }

    pub fn into_files(self) -> Vec<OutputFile> {
        self.files
    }

    pub fn finish(self) -> CodeGeneratorResponse {
        to_response(self.files)
    }
}

/// Response carrying `files` in order
pub fn to_response(files: Vec<OutputFile>) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        file: files
            .into_iter()
            .map(|file| code_generator_response::File {
                name: Some(file.name),
                content: Some(file.content),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}
