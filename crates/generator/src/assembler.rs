//! Per-run assembly of example, test and reference output
//!
//! Every method's rendered example template goes through
//! [`MarkupAssembler::process`], in method declaration order. After the
//! last method, [`MarkupAssembler::finish`] builds the reference document
//! from the collected `@single` blocks and reference contributions, and
//! cuts the `@standalone` regions out of it.

use crate::beautify::Beautify;
use crate::markup::{self, Projection, RegionKind};
use rpcgen_common::Result;
use std::collections::{HashMap, HashSet};

/// Lines collected from `@single(ID)` regions across all methods
///
/// Lines are deduplicated per identifier by exact text, keeping the order
/// in which they were first seen; identifiers keep first-seen order too.
#[derive(Debug, Clone, Default)]
pub struct SinglesRegistry {
    order: Vec<String>,
    lines: HashMap<String, Vec<String>>,
    seen: HashMap<String, HashSet<String>>,
}

impl SinglesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `lines` into the block for `id`
    ///
    /// An empty `lines` leaves the registry untouched.
    pub fn record<I, S>(&mut self, id: &str, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let line = line.as_ref();
            if !self.lines.contains_key(id) {
                self.order.push(id.to_string());
                self.lines.insert(id.to_string(), Vec::new());
            }
            let seen = self.seen.entry(id.to_string()).or_default();
            if seen.insert(line.to_string()) {
                if let Some(block) = self.lines.get_mut(id) {
                    block.push(line.to_string());
                }
            }
        }
    }

    pub fn lines(&self, id: &str) -> Option<&[String]> {
        self.lines.get(id).map(Vec::as_slice)
    }

    /// Blocks in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.order
            .iter()
            .filter_map(|id| self.lines(id).map(|lines| (id.as_str(), lines)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Example and test text derived from one method's render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodArtifacts {
    pub example: String,
    pub test: String,
}

/// A `@standalone(ID)` region cut out of the reference document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standalone {
    pub id: String,
    pub content: String,
}

/// The finished reference document and its standalone extracts, both
/// beautified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDocument {
    pub content: String,
    pub standalones: Vec<Standalone>,
}

/// Run-scoped accumulator for markup assembly
#[derive(Debug, Clone)]
pub struct MarkupAssembler {
    leader: String,
    singles: SinglesRegistry,
    reference: String,
}

impl MarkupAssembler {
    /// `leader` is the language's comment leader, e.g. `//`
    pub fn new(leader: impl Into<String>) -> Self {
        Self {
            leader: leader.into().trim_end().to_string(),
            singles: SinglesRegistry::new(),
            reference: String::new(),
        }
    }

    /// Split one method's rendered text into its example and test text,
    /// and fold its reference contribution and `@single` blocks into the
    /// run state
    pub fn process(&mut self, rendered: &str) -> Result<MethodArtifacts> {
        let nodes = markup::parse(rendered, &self.leader)?;

        let contribution = markup::project(&nodes, &Projection::REFERENCE);
        self.reference.push_str(&contribution);
        if !contribution.is_empty() && !contribution.ends_with('\n') {
            self.reference.push('\n');
        }

        for single in markup::regions(&nodes, RegionKind::Single) {
            if let Some(id) = &single.id {
                self.singles.record(id, single.body().lines());
            }
        }

        Ok(MethodArtifacts {
            example: markup::project(&nodes, &Projection::EXAMPLE),
            test: markup::project(&nodes, &Projection::TEST),
        })
    }

    pub fn singles(&self) -> &SinglesRegistry {
        &self.singles
    }

    /// Reference contributions collected so far
    pub fn reference_buffer(&self) -> &str {
        &self.reference
    }

    /// Build the reference document and extract its standalone regions
    ///
    /// Each `@single` block is written back as a region opened by
    /// `@{ID}` and closed by `@{base}-end()`, where `base` is the
    /// identifier up to its first `(`. A single named
    /// `standalone(setup)` therefore becomes a standalone region here.
    pub fn finish(self, beautifier: &dyn Beautify) -> Result<ReferenceDocument> {
        let mut document = String::new();
        for (id, lines) in self.singles.iter() {
            let base = id.split('(').next().unwrap_or(id);
            document.push_str(&format!("{} @{}\n", self.leader, id));
            document.push_str(&lines.join("\n"));
            document.push_str(&format!("\n{} @{}-end()\n\n", self.leader, base));
        }
        document.push_str(&self.reference);

        let content = beautifier.beautify(&document)?;
        let nodes = markup::parse(&content, &self.leader)?;

        let mut standalones = Vec::new();
        for region in markup::regions(&nodes, RegionKind::Standalone) {
            if let Some(id) = &region.id {
                standalones.push(Standalone {
                    id: id.clone(),
                    content: beautifier.beautify(&region.body())?,
                });
            }
        }

        Ok(ReferenceDocument {
            content,
            standalones,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beautify::{MockBeautify, Normalize};

    #[test]
    fn test_registry_merges_in_order() {
        let mut registry = SinglesRegistry::new();
        registry.record("id", ["a", "b"]);
        registry.record("id", ["b", "c"]);
        assert_eq!(
            registry.lines("id").unwrap(),
            &["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_registry_is_idempotent() {
        let mut once = SinglesRegistry::new();
        once.record("id", ["x", "y"]);

        let mut twice = SinglesRegistry::new();
        twice.record("id", ["x", "y"]);
        twice.record("id", ["x", "y"]);

        assert_eq!(once.lines("id"), twice.lines("id"));
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn test_registry_identifier_order() {
        let mut registry = SinglesRegistry::new();
        registry.record("second", ["2"]);
        registry.record("first", ["1"]);
        registry.record("second", ["2b"]);
        registry.record("empty", Vec::<String>::new());

        let ids: Vec<&str> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["second", "first"]);
        assert!(registry.lines("empty").is_none());
    }

    #[test]
    fn test_process_splits_artifacts() {
        let mut assembler = MarkupAssembler::new("//");
        let artifacts = assembler
            .process("// @example\nrun();\n// @example-end()\n// @test\nassert(ok);\n// @test-end()\n")
            .unwrap();

        assert_eq!(artifacts.example, "run();\n");
        assert_eq!(artifacts.test, "assert(ok);\n");
        assert_eq!(
            assembler.reference_buffer(),
            "// @example\nrun();\n// @example-end()\n"
        );
    }

    #[test]
    fn test_reference_contribution_ends_with_newline() {
        let mut assembler = MarkupAssembler::new("//");
        assembler.process("@reference A @reference-end()").unwrap();
        assembler.process("@reference B @reference-end()").unwrap();
        assert_eq!(
            assembler.reference_buffer(),
            "@reference A @reference-end()\n@reference B @reference-end()\n"
        );
    }

    #[test]
    fn test_singles_become_standalone_regions() {
        let mut assembler = MarkupAssembler::new("//");
        assembler
            .process("// @single(standalone(setup)) var api = require(\"ddp\"); // @single-end()\n")
            .unwrap();
        assembler
            .process("// @single(standalone(setup))\nvar api = require(\"ddp\");\napi.connect();\n// @single-end()\n")
            .unwrap();

        let document = assembler.finish(&Normalize).unwrap();
        assert_eq!(
            document.content,
            "// @standalone(setup)\nvar api = require(\"ddp\");\napi.connect();\n// @standalone-end()\n"
        );
        assert_eq!(
            document.standalones,
            vec![Standalone {
                id: "setup".to_string(),
                content: "var api = require(\"ddp\");\napi.connect();\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_finish_beautifies_document_and_standalones() {
        let mut assembler = MarkupAssembler::new("//");
        assembler
            .process("@standalone(tour) step(); @standalone-end()\n")
            .unwrap();

        let mut beautifier = MockBeautify::new();
        beautifier
            .expect_beautify()
            .times(2)
            .returning(|code| Ok(code.to_string()));

        let document = assembler.finish(&beautifier).unwrap();
        assert_eq!(document.standalones.len(), 1);
        assert_eq!(document.standalones[0].id, "tour");
        assert_eq!(document.standalones[0].content, "step();");
    }

    #[test]
    fn test_markup_errors_propagate() {
        let mut assembler = MarkupAssembler::new("//");
        assert!(assembler.process("// @example\nnever closed\n").is_err());
    }
}
