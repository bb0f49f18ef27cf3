//! Artifact generation for rpcgen
//!
//! This crate renders the templates of a target language against a
//! [`DescriptorGraph`] and packages the results as a `protoc` plugin
//! response:
//! - API bindings, per service
//! - simulator, once for all services
//! - usage examples and tests, per method, split out of one rendered text
//!   by the markup assembler
//! - the reference document and its standalone extracts

pub mod assembler;
pub mod beautify;
pub mod config;
pub mod filters;
pub mod markup;
pub mod naming;
pub mod packager;
pub mod profile;
pub mod templates;

pub use assembler::{MarkupAssembler, ReferenceDocument, SinglesRegistry, Standalone};
pub use beautify::{Beautify, BeautifierConfig, ExternalFormatter, Normalize};
pub use config::{resolve_language, OutputDirs, PluginParameters};
pub use profile::{FileNames, LanguageProfile, Recase};

use filters::LookupContext;
use packager::OutputPackager;
use prost_types::compiler::CodeGeneratorResponse;
use rpcgen_common::{ArtifactKind, FileRole, GeneratorError, OutputFile, Result};
use rpcgen_parser::graph::{
    API_MAJOR_VERSION_OPTION, API_MINOR_VERSION_OPTION, COMPLETION_RESPONSE_OPTION,
};
use rpcgen_parser::{DescriptorGraph, ExampleValues, MethodNode, ServiceNode};
use std::path::PathBuf;
use std::sync::Arc;
use tera::{Context, Tera};

/// Base name of the reference document
pub const REFERENCE_NAME: &str = "reference";

/// Base name handed to the simulator file patterns
pub const SIMULATOR_NAME: &str = "simulator";

/// Everything a run needs besides the request itself
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub profile: LanguageProfile,
    /// Replaces the embedded templates when set
    pub templates_dir: Option<PathBuf>,
    pub examples: ExampleValues,
    pub output_dirs: OutputDirs,
    /// `services_namespace` plugin parameter, handed to templates
    pub services_namespace: Option<String>,
}

impl GeneratorOptions {
    /// Built-in profile for `language`, embedded templates, no example
    /// values and no output directories
    pub fn for_language(language: rpcgen_common::TargetLanguage) -> Self {
        Self {
            profile: LanguageProfile::for_language(language),
            templates_dir: None,
            examples: ExampleValues::default(),
            output_dirs: OutputDirs::default(),
            services_namespace: None,
        }
    }
}

/// Counts reported after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub services: usize,
    pub methods: usize,
    pub files: usize,
    pub standalones: usize,
}

/// RPC artifact generator
///
/// Owns the descriptor graph and the loaded templates for one run.
pub struct RpcGenerator {
    graph: Arc<DescriptorGraph>,
    profile: LanguageProfile,
    output_dirs: OutputDirs,
    services_namespace: Option<String>,
    beautifier: Box<dyn Beautify + Send + Sync>,
    tera: Tera,
}

impl RpcGenerator {
    /// Create a generator for `graph`, loading templates and binding the
    /// lookup filters
    pub fn new(graph: DescriptorGraph, options: GeneratorOptions) -> Result<Self> {
        let graph = Arc::new(graph);
        let GeneratorOptions {
            profile,
            templates_dir,
            examples,
            output_dirs,
            services_namespace,
        } = options;

        let context = Arc::new(LookupContext {
            graph: graph.clone(),
            examples: Arc::new(examples),
            language: profile.language,
            recase: profile.recase,
        });
        let tera = templates::load_templates(profile.language, templates_dir.as_deref(), context)?;
        let beautifier = profile.beautifier.build();

        Ok(Self {
            graph,
            profile,
            output_dirs,
            services_namespace,
            beautifier,
            tera,
        })
    }

    /// Replace the profile's beautifier
    pub fn with_beautifier(mut self, beautifier: Box<dyn Beautify + Send + Sync>) -> Self {
        self.beautifier = beautifier;
        self
    }

    pub fn profile(&self) -> &LanguageProfile {
        &self.profile
    }

    /// Generate every artifact of the run as a plugin response
    pub fn generate(&self) -> Result<CodeGeneratorResponse> {
        let (files, _) = self.generate_files()?;
        Ok(packager::to_response(files))
    }

    /// Generate every artifact of the run, in response order
    pub fn generate_files(&self) -> Result<(Vec<OutputFile>, GenerationSummary)> {
        let services = self.graph.services();
        if services.is_empty() {
            return Err(GeneratorError::Input(
                "No services found in the request".to_string(),
            ));
        }
        self.check_conformance(&services)?;

        let mut packager = OutputPackager::new(&self.output_dirs, self.beautifier.as_ref());
        let mut summary = GenerationSummary {
            services: services.len(),
            ..Default::default()
        };

        self.generate_api(&services, &mut packager)?;
        self.generate_simulator(&services, &mut packager)?;

        if self.profile.examples_name(REFERENCE_NAME).is_some() {
            let mut assembler = MarkupAssembler::new(self.profile.comment_leader.as_str());
            for service in &services {
                for method in &service.methods {
                    let mut context = self.service_context(&services, service)?;
                    context.insert("method", method);
                    self.generate_method(method, &context, &mut assembler, &mut packager)?;
                    summary.methods += 1;
                }
            }
            summary.standalones = self.generate_reference(assembler, &mut packager)?;
        }

        let files = packager.into_files();
        summary.files = files.len();
        Ok((files, summary))
    }

    /// Checks the profile asks for: file-level options first, then
    /// `completion_response` on every method
    fn check_conformance(&self, services: &[&ServiceNode]) -> Result<()> {
        let language = self.profile.language;
        for file in self.graph.files().iter().filter(|f| !f.services.is_empty()) {
            if self.profile.reject_generic_services && file.cc_generic_services {
                return Err(GeneratorError::Input(format!(
                    "File {} sets cc_generic_services = true, which {} does not support",
                    file.name, language
                )));
            }
            if !self.profile.require_api_version {
                continue;
            }
            for option in [API_MAJOR_VERSION_OPTION, API_MINOR_VERSION_OPTION] {
                if self.graph.option_values(&file.key, option)?.is_none() {
                    return Err(GeneratorError::Input(format!(
                        "File {} has no {} option, which {} requires",
                        file.name, option, language
                    )));
                }
            }
        }

        if !self.profile.require_completion_response {
            return Ok(());
        }

        for service in services {
            for method in &service.methods {
                let declared = self
                    .graph
                    .option_values(&method.key, COMPLETION_RESPONSE_OPTION)?
                    .is_some();
                if !declared {
                    return Err(GeneratorError::Input(format!(
                        "Method {} has no {} option, which {} requires",
                        method.full_name, COMPLETION_RESPONSE_OPTION, language
                    )));
                }
            }
        }
        Ok(())
    }

    /// API files: all headers, then all sources
    fn generate_api(
        &self,
        services: &[&ServiceNode],
        packager: &mut OutputPackager<'_>,
    ) -> Result<()> {
        for role in [FileRole::Header, FileRole::Source] {
            for service in services {
                let Some(name) = self.profile.file_name(ArtifactKind::Api, role, &service.name)
                else {
                    continue;
                };
                let context = self.service_context(services, service)?;
                let rendered = self.render(ArtifactKind::Api, role, &context)?;
                packager.add(ArtifactKind::Api, &name, &rendered)?;
            }
        }
        Ok(())
    }

    /// Simulator files, rendered once with every service in context
    fn generate_simulator(
        &self,
        services: &[&ServiceNode],
        packager: &mut OutputPackager<'_>,
    ) -> Result<()> {
        for role in [FileRole::Header, FileRole::Source] {
            let Some(name) = self
                .profile
                .file_name(ArtifactKind::Simulator, role, SIMULATOR_NAME)
            else {
                continue;
            };
            let context = self.base_context(services);
            let rendered = self.render(ArtifactKind::Simulator, role, &context)?;
            packager.add(ArtifactKind::Simulator, &name, &rendered)?;
        }
        Ok(())
    }

    /// Example and test files of one method; feeds the assembler
    fn generate_method(
        &self,
        method: &MethodNode,
        context: &Context,
        assembler: &mut MarkupAssembler,
        packager: &mut OutputPackager<'_>,
    ) -> Result<()> {
        let rendered = self.render(ArtifactKind::Examples, FileRole::Source, context)?;
        let artifacts = assembler.process(&rendered).map_err(|e| match e {
            GeneratorError::Markup(msg) => {
                GeneratorError::Markup(format!("{} example: {}", method.full_name, msg))
            }
            other => other,
        })?;

        if let Some(name) = self.profile.examples_name(&method.name) {
            packager.add(ArtifactKind::Examples, &name, &artifacts.example)?;
        }
        if let Some(name) = self
            .profile
            .file_name(ArtifactKind::Tests, FileRole::Source, &method.name)
        {
            packager.add(ArtifactKind::Tests, &name, &artifacts.test)?;
        }
        Ok(())
    }

    /// Reference document and its standalone extracts; returns the number
    /// of standalones
    fn generate_reference(
        &self,
        assembler: MarkupAssembler,
        packager: &mut OutputPackager<'_>,
    ) -> Result<usize> {
        let document = assembler.finish(self.beautifier.as_ref())?;

        if !document.content.trim().is_empty() {
            if let Some(name) = self.profile.examples_name(REFERENCE_NAME) {
                packager.add_formatted(ArtifactKind::Examples, &name, document.content)?;
            }
        }

        let count = document.standalones.len();
        for standalone in document.standalones {
            if let Some(name) = self.profile.examples_name(&standalone.id) {
                let name = format!("{}_{}", self.profile.language, name);
                packager.add_formatted(ArtifactKind::Standalone, &name, standalone.content)?;
            }
        }
        Ok(count)
    }

    fn render(&self, kind: ArtifactKind, role: FileRole, context: &Context) -> Result<String> {
        templates::render(&self.tera, self.profile.language, kind, role, context)
    }

    fn base_context(&self, services: &[&ServiceNode]) -> Context {
        let mut context = Context::new();
        context.insert("language", self.profile.language.as_str());
        context.insert("services", services);
        context.insert("services_namespace", &self.services_namespace);
        context
    }

    fn service_context(&self, services: &[&ServiceNode], service: &ServiceNode) -> Result<Context> {
        let file = self.graph.service_file(&service.full_name).ok_or_else(|| {
            GeneratorError::Input(format!("No file declares service {}", service.full_name))
        })?;

        let mut context = self.base_context(services);
        context.insert("service", service);
        context.insert("file", file);
        Ok(context)
    }
}

/// Generate the plugin response for `graph` (convenience function)
pub fn generate(graph: DescriptorGraph, options: GeneratorOptions) -> Result<CodeGeneratorResponse> {
    RpcGenerator::new(graph, options)?.generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;
    use prost_types::compiler::CodeGeneratorRequest;
    use rpcgen_common::TargetLanguage;

    fn empty_graph() -> DescriptorGraph {
        rpcgen_parser::parse_request(&CodeGeneratorRequest::default().encode_to_vec()).unwrap()
    }

    #[test]
    fn test_generator_creation() {
        for language in TargetLanguage::ALL {
            let result = RpcGenerator::new(empty_graph(), GeneratorOptions::for_language(language));
            assert!(result.is_ok());
        }
    }

    #[test]
    fn test_zero_services_is_an_input_error() {
        let generator = RpcGenerator::new(
            empty_graph(),
            GeneratorOptions::for_language(TargetLanguage::NodeJs),
        )
        .unwrap();
        assert!(matches!(generator.generate(), Err(GeneratorError::Input(_))));
    }
}
