//! rpcgen protoc plugin
//!
//! Reads a `CodeGeneratorRequest` from stdin and writes the generated
//! API bindings, simulators, examples and tests to stdout as a
//! `CodeGeneratorResponse`. Status output goes to stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use prost::Message;
use rpcgen_common::{ArtifactKind, TargetLanguage};
use rpcgen_generator::packager::to_response;
use rpcgen_generator::{
    resolve_language, GeneratorOptions, LanguageProfile, OutputDirs, PluginParameters,
    RpcGenerator,
};
use rpcgen_parser::{parse_request, ExampleValues};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "protoc-gen-ddprpc")]
#[command(version, about = "protoc plugin generating RPC bindings, simulators, examples and tests", long_about = None)]
#[command(after_help = "EXAMPLES:\n  \
    # Node.js bindings, examples into ./examples\n  \
    EXAMPLES_DIR=examples protoc --plugin=protoc-gen-ddprpc --ddprpc_out=./out payment.proto\n\n  \
    # Objective-C examples, language chosen through the plugin parameter\n  \
    protoc --plugin=protoc-gen-ddprpc --ddprpc_out=language=objc:./out payment.proto\n\n  \
    # Replay a cached request\n  \
    RPCGEN_DEBUG_MODE=1 RPCGEN_DATA_FILE=/tmp/request.bin protoc-gen-ddprpc > response.bin")]
struct Cli {
    /// Target language (overrides the `language` plugin parameter)
    #[arg(short, long, env = "RPCGEN_LANGUAGE", value_enum)]
    language: Option<Language>,

    /// Directory of `{language}.{kind}.{role}.tera` templates replacing the
    /// built-in ones
    #[arg(long, env = "RPCGEN_TEMPLATES_DIR")]
    templates: Option<PathBuf>,

    /// Example-value table (JSON, or YAML by extension)
    #[arg(long, env = "RPCGEN_EXAMPLE_VALUES")]
    example_values: Option<PathBuf>,

    /// Enable verbose output on stderr
    #[arg(short, long, env = "RPCGEN_VERBOSE")]
    verbose: bool,

    /// Read the request from the data file instead of stdin
    #[arg(long, env = "RPCGEN_DEBUG_MODE", hide = true)]
    debug_mode: bool,

    /// File the request is cached to, or replayed from in debug mode
    #[arg(long, env = "RPCGEN_DATA_FILE", hide = true)]
    data_file: Option<PathBuf>,

    /// Output directory of the simulator files
    #[arg(long, env = "SIMULATOR_DIR", hide = true)]
    simulator_dir: Option<String>,

    /// Output directory of the example files
    #[arg(long, env = "EXAMPLES_DIR", hide = true)]
    examples_dir: Option<String>,

    /// Output directory of the test files
    #[arg(long, env = "TESTS_DIR", hide = true)]
    tests_dir: Option<String>,

    /// Output directory of the standalone files (defaults to the examples
    /// directory)
    #[arg(long, env = "STANDALONE_DIR", hide = true)]
    standalone_dir: Option<String>,
}

impl Cli {
    fn output_dirs(&self) -> OutputDirs {
        OutputDirs::from_lookup(|kind| match kind {
            ArtifactKind::Simulator => self.simulator_dir.clone(),
            ArtifactKind::Examples => self.examples_dir.clone(),
            ArtifactKind::Tests => self.tests_dir.clone(),
            ArtifactKind::Standalone => self.standalone_dir.clone(),
            ArtifactKind::Api => None,
        })
    }
}

/// Target language
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Language {
    Nodejs,
    Objc,
    Cpp,
}

impl From<Language> for TargetLanguage {
    fn from(language: Language) -> Self {
        match language {
            Language::Nodejs => TargetLanguage::NodeJs,
            Language::Objc => TargetLanguage::ObjC,
            Language::Cpp => TargetLanguage::Cpp,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        eprintln!("{} Verbose mode enabled", "→".cyan());
    }

    let request = acquire_request(cli.debug_mode, cli.data_file.as_deref(), io::stdin().lock())?;
    if cli.verbose {
        eprintln!("{} Read request ({} bytes)", "→".cyan(), request.len());
    }

    let response = generate(&cli, &request)?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&response)
        .context("Failed to write the response to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;

    Ok(())
}

/// Request bytes from stdin, or from the data file in debug mode
///
/// Without debug mode the request read from `stdin` is also cached to the
/// data file, when one is configured.
fn acquire_request<R: Read>(
    debug_mode: bool,
    data_file: Option<&Path>,
    mut stdin: R,
) -> Result<Vec<u8>> {
    if debug_mode {
        let Some(path) = data_file else {
            bail!("RPCGEN_DEBUG_MODE requires RPCGEN_DATA_FILE to name the cached request");
        };
        return fs::read(path)
            .with_context(|| format!("Failed to read cached request {}", path.display()));
    }

    let mut bytes = Vec::new();
    stdin
        .read_to_end(&mut bytes)
        .context("Failed to read the request from stdin")?;

    if let Some(path) = data_file {
        fs::write(path, &bytes)
            .with_context(|| format!("Failed to cache request to {}", path.display()))?;
    }
    Ok(bytes)
}

/// Run the generator and encode its response
fn generate(cli: &Cli, request: &[u8]) -> Result<Vec<u8>> {
    let graph = parse_request(request).context("Failed to decode CodeGeneratorRequest")?;

    let parameters =
        PluginParameters::parse(graph.parameter()).context("Invalid plugin parameter")?;
    let language = resolve_language(cli.language.map(Into::into), &parameters);

    let examples = match &cli.example_values {
        Some(path) => ExampleValues::load(path)
            .with_context(|| format!("Failed to load example values {}", path.display()))?,
        None => ExampleValues::default(),
    };

    if cli.verbose {
        eprintln!("{} Language: {}", "→".cyan(), language.to_string().yellow());
        eprintln!("  Files: {}", graph.files().len());
        eprintln!("  Services: {}", graph.services().len());
        eprintln!("  Example values: {}", examples.len());
        if let Some(dir) = &cli.templates {
            eprintln!("  Templates: {}", dir.display());
        }
    }

    let options = GeneratorOptions {
        profile: LanguageProfile::for_language(language),
        templates_dir: cli.templates.clone(),
        examples,
        output_dirs: cli.output_dirs(),
        services_namespace: parameters.services_namespace.clone(),
    };
    let generator = RpcGenerator::new(graph, options).context("Failed to load templates")?;
    let (files, summary) = generator
        .generate_files()
        .with_context(|| format!("Failed to generate {} artifacts", language))?;

    if cli.verbose {
        for file in &files {
            eprintln!("  • {} ({} bytes)", file.name.cyan(), file.content.len());
        }
        eprintln!(
            "{} Generated {} files for {} services, {} methods ({} standalone)",
            "✓".green(),
            summary.files,
            summary.services,
            summary.methods,
            summary.standalones
        );
    }

    Ok(to_response(files).encode_to_vec())
}
