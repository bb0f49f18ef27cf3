//! Per-language generation profiles
//!
//! A profile is plain data: how identifiers are recased, which beautifier
//! runs, and which file each (artifact kind, file role) pair lands in. A
//! `None` file pattern means the language has no such file and the render
//! is skipped.

use crate::beautify::BeautifierConfig;
use crate::naming::{to_camel_case, to_snake_case};
use rpcgen_common::{ArtifactKind, FileRole, TargetLanguage};

/// Identifier recasing rule for template `recase` calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recase {
    Camel,
    Snake,
}

impl Recase {
    pub fn apply(&self, identifier: &str) -> String {
        match self {
            Recase::Camel => to_camel_case(identifier),
            Recase::Snake => to_snake_case(identifier),
        }
    }
}

/// Output file patterns; `{name}`, `{name_lower}` and `{name_snake}` are
/// replaced by the service or method name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileNames {
    pub api_header: Option<String>,
    pub api_source: Option<String>,
    /// Simulator patterns are rendered once for all services
    pub simulator_header: Option<String>,
    pub simulator_source: Option<String>,
    pub examples_source: Option<String>,
    pub tests_source: Option<String>,
}

impl FileNames {
    pub fn pattern(&self, kind: ArtifactKind, role: FileRole) -> Option<&str> {
        let pattern = match (kind, role) {
            (ArtifactKind::Api, FileRole::Header) => &self.api_header,
            (ArtifactKind::Api, FileRole::Source) => &self.api_source,
            (ArtifactKind::Simulator, FileRole::Header) => &self.simulator_header,
            (ArtifactKind::Simulator, FileRole::Source) => &self.simulator_source,
            (ArtifactKind::Examples, FileRole::Source) => &self.examples_source,
            (ArtifactKind::Tests, FileRole::Source) => &self.tests_source,
            _ => return None,
        };
        pattern.as_deref()
    }
}

/// Everything that differs between target languages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageProfile {
    pub language: TargetLanguage,
    pub recase: Recase,
    pub beautifier: BeautifierConfig,
    pub file_names: FileNames,
    /// Prefix that may precede markup markers, e.g. `//`
    pub comment_leader: String,
    /// Reject methods without a `completion_response` option
    pub require_completion_response: bool,
    /// Reject files without `api_major_version` and `api_minor_version`
    pub require_api_version: bool,
    /// Reject files with `cc_generic_services = true`
    pub reject_generic_services: bool,
}

impl LanguageProfile {
    /// Built-in profile for a target language
    pub fn for_language(language: TargetLanguage) -> Self {
        match language {
            TargetLanguage::NodeJs => Self {
                language,
                recase: Recase::Camel,
                beautifier: BeautifierConfig::Normalize,
                file_names: FileNames {
                    api_source: Some("{name_lower}.js".to_string()),
                    simulator_source: Some("simulator.js".to_string()),
                    examples_source: Some("{name}.example.js".to_string()),
                    tests_source: Some("{name}.test.js".to_string()),
                    ..Default::default()
                },
                comment_leader: "//".to_string(),
                require_completion_response: false,
                require_api_version: false,
                reject_generic_services: false,
            },
            TargetLanguage::ObjC => Self {
                language,
                recase: Recase::Camel,
                beautifier: BeautifierConfig::External {
                    program: "uncrustify".to_string(),
                    args: vec!["-q".to_string(), "-l".to_string(), "oc".to_string()],
                    fix_inline_comments: true,
                },
                file_names: FileNames {
                    examples_source: Some("DDPExample.{name}.m".to_string()),
                    ..Default::default()
                },
                comment_leader: "//".to_string(),
                require_completion_response: false,
                require_api_version: false,
                reject_generic_services: false,
            },
            TargetLanguage::Cpp => Self {
                language,
                recase: Recase::Snake,
                beautifier: BeautifierConfig::Normalize,
                file_names: FileNames {
                    api_header: Some("{name_snake}.ddprpc.h".to_string()),
                    ..Default::default()
                },
                comment_leader: "//".to_string(),
                require_completion_response: true,
                require_api_version: true,
                reject_generic_services: true,
            },
        }
    }

    /// File name for `name` under the (kind, role) pattern, if the language
    /// produces that file
    pub fn file_name(&self, kind: ArtifactKind, role: FileRole, name: &str) -> Option<String> {
        self.file_names
            .pattern(kind, role)
            .map(|pattern| expand_pattern(pattern, name))
    }

    /// Name of an examples-derived file (reference document, standalones)
    pub fn examples_name(&self, name: &str) -> Option<String> {
        self.file_name(ArtifactKind::Examples, FileRole::Source, name)
    }
}

fn expand_pattern(pattern: &str, name: &str) -> String {
    pattern
        .replace("{name_lower}", &name.to_lowercase())
        .replace("{name_snake}", &to_snake_case(name))
        .replace("{name}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodejs_file_names() {
        let profile = LanguageProfile::for_language(TargetLanguage::NodeJs);
        assert_eq!(
            profile.file_name(ArtifactKind::Api, FileRole::Source, "Payment"),
            Some("payment.js".to_string())
        );
        assert_eq!(profile.file_name(ArtifactKind::Api, FileRole::Header, "Payment"), None);
        assert_eq!(
            profile.examples_name("Charge"),
            Some("Charge.example.js".to_string())
        );
        assert_eq!(
            profile.file_name(ArtifactKind::Tests, FileRole::Source, "Charge"),
            Some("Charge.test.js".to_string())
        );
    }

    #[test]
    fn test_cpp_file_names() {
        let profile = LanguageProfile::for_language(TargetLanguage::Cpp);
        assert_eq!(
            profile.file_name(ArtifactKind::Api, FileRole::Header, "CardReader"),
            Some("card_reader.ddprpc.h".to_string())
        );
        assert!(profile.require_completion_response);
        assert!(profile.require_api_version);
        assert!(profile.reject_generic_services);
        assert_eq!(profile.recase.apply("CardReader"), "card_reader");
    }

    #[test]
    fn test_objc_profile() {
        let profile = LanguageProfile::for_language(TargetLanguage::ObjC);
        assert_eq!(
            profile.examples_name("reference"),
            Some("DDPExample.reference.m".to_string())
        );
        assert_eq!(profile.recase.apply("card_reader_id"), "cardReaderId");
        assert!(matches!(
            profile.beautifier,
            BeautifierConfig::External { fix_inline_comments: true, .. }
        ));
    }

    #[test]
    fn test_standalone_has_no_pattern() {
        let names = FileNames {
            examples_source: Some("{name}.js".to_string()),
            ..Default::default()
        };
        assert_eq!(names.pattern(ArtifactKind::Standalone, FileRole::Source), None);
        assert_eq!(names.pattern(ArtifactKind::Examples, FileRole::Header), None);
    }
}
