//! Template loading and rendering
//!
//! Templates are named `{language}.{kind}.{role}.tera`, e.g.
//! `nodejs.api.source.tera`. Each language ships embedded defaults; a
//! template directory replaces them wholesale.

use crate::filters::{self, LookupContext};
use rpcgen_common::{ArtifactKind, FileRole, GeneratorError, Result, TargetLanguage};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tera::{Context, Tera};

const NODEJS_TEMPLATES: &[(&str, &str)] = &[
    (
        "nodejs.api.source.tera",
        include_str!("../templates/nodejs.api.source.tera"),
    ),
    (
        "nodejs.simulator.source.tera",
        include_str!("../templates/nodejs.simulator.source.tera"),
    ),
    (
        "nodejs.examples.source.tera",
        include_str!("../templates/nodejs.examples.source.tera"),
    ),
];

const OBJC_TEMPLATES: &[(&str, &str)] = &[(
    "objc.examples.source.tera",
    include_str!("../templates/objc.examples.source.tera"),
)];

const CPP_TEMPLATES: &[(&str, &str)] = &[(
    "cpp.api.header.tera",
    include_str!("../templates/cpp.api.header.tera"),
)];

/// Template file name for a (language, kind, role) triple
pub fn template_name(language: TargetLanguage, kind: ArtifactKind, role: FileRole) -> String {
    format!("{}.{}.{}.tera", language, kind, role)
}

/// Load the embedded templates for `language`, or every `*.tera` file in
/// `dir` when given, and bind the lookup filters
pub fn load_templates(
    language: TargetLanguage,
    dir: Option<&Path>,
    context: Arc<LookupContext>,
) -> Result<Tera> {
    let mut tera = match dir {
        Some(dir) => load_dir(dir)?,
        None => load_embedded(language)?,
    };

    filters::register_filters(&mut tera, context);
    tera.autoescape_on(vec![]);

    Ok(tera)
}

fn load_embedded(language: TargetLanguage) -> Result<Tera> {
    let templates = match language {
        TargetLanguage::NodeJs => NODEJS_TEMPLATES,
        TargetLanguage::ObjC => OBJC_TEMPLATES,
        TargetLanguage::Cpp => CPP_TEMPLATES,
    };

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.iter().copied())
        .map_err(|e| {
            GeneratorError::Generation(format!(
                "Failed to load {} templates: {}",
                language,
                describe(&e)
            ))
        })?;
    Ok(tera)
}

/// Load every `*.tera` file directly inside `dir`
pub fn load_dir(dir: &Path) -> Result<Tera> {
    let entries = fs::read_dir(dir).map_err(|e| {
        GeneratorError::Configuration(format!(
            "Failed to read template directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut templates = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("tera") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        templates.push((name.to_string(), fs::read_to_string(&path)?));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates).map_err(|e| {
        GeneratorError::Generation(format!(
            "Failed to load templates from {}: {}",
            dir.display(),
            describe(&e)
        ))
    })?;
    Ok(tera)
}

/// Render the template for (language, kind, role)
///
/// Errors raised by lookup filters come back as their own variant, e.g.
/// `MissingExampleValue`; any other template failure is a generation error.
pub fn render(
    tera: &Tera,
    language: TargetLanguage,
    kind: ArtifactKind,
    role: FileRole,
    context: &Context,
) -> Result<String> {
    let name = template_name(language, kind, role);
    if !tera.get_template_names().any(|t| t == name) {
        return Err(GeneratorError::MissingTemplate {
            language: language.to_string(),
            kind: kind.to_string(),
            role: role.to_string(),
        });
    }

    tera.render(&name, context).map_err(|e| {
        filters::generator_error(&e).unwrap_or_else(|| {
            GeneratorError::Generation(format!("Template error in {}: {}", name, describe(&e)))
        })
    })
}

/// Tera error with its whole source chain
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
