//! Markup-region scanner and projections
//!
//! Example templates wrap parts of their output in markers that decide
//! which derived file each part lands in:
//!
//! ```text
//! // @example
//! reader.open();
//! // @example-end()
//! // @test
//! assert(reader.isOpen());
//! // @test-end()
//! // @single(standalone(setup)) var api = require("ddp"); // @single-end()
//! ```
//!
//! Start markers are `@example`, `@test`, `@reference` (optionally followed
//! by `()`), and `@single(ID)` / `@standalone(ID)`, whose identifier may
//! itself contain balanced parentheses. `@kind-end()` closes the innermost
//! open region of that kind. A marker begins at an `@` that starts the text
//! or follows whitespace, optionally preceded by the comment leader (`//`
//! plus at most one space). Any other `@name` after the leader is a bare
//! marker and covers the rest of its line; any other `@` is plain text.
//!
//! A marker alone on its line takes the whole line with it. Inline start
//! markers take the blanks after them; inline end markers take the blanks
//! before them and, at the end of a line, the newline.
//!
//! Text is parsed once into a tree of [`Node`]s; each derived file is a
//! [`Projection`] of that tree that drops, unwraps, or keeps each region
//! kind.

use rpcgen_common::{GeneratorError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Example,
    Test,
    Reference,
    Single,
    Standalone,
}

impl RegionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "example" => Some(RegionKind::Example),
            "test" => Some(RegionKind::Test),
            "reference" => Some(RegionKind::Reference),
            "single" => Some(RegionKind::Single),
            "standalone" => Some(RegionKind::Standalone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Example => "example",
            RegionKind::Test => "test",
            RegionKind::Reference => "reference",
            RegionKind::Single => "single",
            RegionKind::Standalone => "standalone",
        }
    }

    /// Whether the start marker carries an identifier
    pub fn takes_id(&self) -> bool {
        matches!(self, RegionKind::Single | RegionKind::Standalone)
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    /// Unknown `@name` after the comment leader, through the end of its line
    Bare {
        raw: String,
        /// The marker followed code on its line and took that line's newline
        restore_newline: bool,
    },
    Region(Region),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub id: Option<String>,
    /// 1-based line of the start marker
    pub line: usize,
    /// Raw start marker with everything it consumed
    pub open: String,
    /// Raw end marker with everything it consumed
    pub close: String,
    /// Leading blanks taken by an inline start marker that begins its line
    pub indent: String,
    /// Only blanks precede the start marker on its line
    pub open_bol: bool,
    /// Inline start marker at the end of a line took the newline
    pub open_newline: bool,
    /// The end marker took a newline
    pub close_newline: bool,
    /// The end marker was alone on its line
    pub close_alone: bool,
    pub children: Vec<Node>,
}

impl Region {
    /// Content with every nested wrapper stripped and bare markers removed
    pub fn body(&self) -> String {
        project(&self.children, &Projection::BODY)
    }
}

/// What a projection does with one region kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
    /// Remove markers and content
    Drop,
    /// Remove markers, keep content
    Unwrap,
    /// Keep markers and content verbatim
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub example: Treatment,
    pub test: Treatment,
    pub reference: Treatment,
    pub single: Treatment,
    pub standalone: Treatment,
    pub keep_bare: bool,
}

impl Projection {
    /// Usage example file
    pub const EXAMPLE: Projection = Projection {
        example: Treatment::Unwrap,
        test: Treatment::Drop,
        reference: Treatment::Drop,
        single: Treatment::Unwrap,
        standalone: Treatment::Unwrap,
        keep_bare: false,
    };

    /// Test file
    pub const TEST: Projection = Projection {
        example: Treatment::Drop,
        test: Treatment::Unwrap,
        reference: Treatment::Unwrap,
        single: Treatment::Unwrap,
        standalone: Treatment::Unwrap,
        keep_bare: false,
    };

    /// One method's contribution to the reference document
    pub const REFERENCE: Projection = Projection {
        example: Treatment::Keep,
        test: Treatment::Drop,
        reference: Treatment::Keep,
        single: Treatment::Drop,
        standalone: Treatment::Keep,
        keep_bare: true,
    };

    /// Region bodies: all wrappers stripped
    pub const BODY: Projection = Projection {
        example: Treatment::Unwrap,
        test: Treatment::Unwrap,
        reference: Treatment::Unwrap,
        single: Treatment::Unwrap,
        standalone: Treatment::Unwrap,
        keep_bare: false,
    };

    /// Reproduces the parsed text exactly
    pub const VERBATIM: Projection = Projection {
        example: Treatment::Keep,
        test: Treatment::Keep,
        reference: Treatment::Keep,
        single: Treatment::Keep,
        standalone: Treatment::Keep,
        keep_bare: true,
    };

    pub fn treatment(&self, kind: RegionKind) -> Treatment {
        match kind {
            RegionKind::Example => self.example,
            RegionKind::Test => self.test,
            RegionKind::Reference => self.reference,
            RegionKind::Single => self.single,
            RegionKind::Standalone => self.standalone,
        }
    }
}

/// Parse marked-up text into a node tree
///
/// `leader` is the comment leader markers may follow, e.g. `//`.
pub fn parse(text: &str, leader: &str) -> Result<Vec<Node>> {
    Scanner::new(text, leader.trim_end()).run()
}

/// Render a node tree under a projection
pub fn project(nodes: &[Node], projection: &Projection) -> String {
    let mut out = Output::default();
    render_into(nodes, projection, &mut out);
    out.text
}

/// Every region of `kind` in document order, nested ones included
pub fn regions(nodes: &[Node], kind: RegionKind) -> Vec<&Region> {
    fn collect<'a>(nodes: &'a [Node], kind: RegionKind, out: &mut Vec<&'a Region>) {
        for node in nodes {
            if let Node::Region(region) = node {
                if region.kind == kind {
                    out.push(region);
                }
                collect(&region.children, kind, out);
            }
        }
    }

    let mut out = Vec::new();
    collect(nodes, kind, &mut out);
    out
}

/// Projected text under construction
#[derive(Default)]
struct Output {
    text: String,
    /// Blanks left behind a dropped inline region; the next fragment sheds
    /// its leading blanks
    skip_blanks: bool,
}

impl Output {
    fn push(&mut self, fragment: &str) {
        let fragment = if self.skip_blanks {
            fragment.trim_start_matches([' ', '\t'])
        } else {
            fragment
        };
        if !fragment.is_empty() {
            self.skip_blanks = false;
            self.text.push_str(fragment);
        }
    }
}

fn render_into(nodes: &[Node], projection: &Projection, out: &mut Output) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push(text),
            Node::Bare {
                raw,
                restore_newline,
            } => {
                if projection.keep_bare {
                    out.push(raw);
                } else if *restore_newline {
                    out.push("\n");
                }
            }
            Node::Region(region) => match projection.treatment(region.kind) {
                Treatment::Keep => {
                    out.push(&region.open);
                    render_into(&region.children, projection, out);
                    out.push(&region.close);
                }
                Treatment::Unwrap => {
                    out.push(&region.indent);
                    if region.open_newline {
                        out.push("\n");
                    }
                    render_into(&region.children, projection, out);
                    if region.close_newline && !region.close_alone {
                        out.push("\n");
                    }
                }
                Treatment::Drop if region.close_newline => {
                    // code before the start marker still needs its line ended
                    if !region.open_bol {
                        out.push("\n");
                    }
                }
                Treatment::Drop => {
                    // the line goes on after the end marker
                    out.push(&region.indent);
                    out.skip_blanks = true;
                }
            },
        }
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

enum Tag {
    Start(RegionKind, Option<String>),
    End(RegionKind),
    Bare,
}

/// A recognized marker, before surrounding whitespace is assigned
struct Marker {
    start: usize,
    end: usize,
    tag: Tag,
}

struct Scanner<'a> {
    text: &'a str,
    leader: &'a str,
    /// Where the search for the next `@` resumes
    pos: usize,
    /// Start of text not yet emitted as a node
    seg_start: usize,
    stack: Vec<Region>,
    root: Vec<Node>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, leader: &'a str) -> Self {
        Self {
            text,
            leader,
            pos: 0,
            seg_start: 0,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Node>> {
        while let Some(offset) = self.text[self.pos..].find('@') {
            let at = self.pos + offset;
            match self.read_marker(at)? {
                Some(marker) => self.consume(marker)?,
                None => self.pos = at + 1,
            }
        }
        self.flush_text(self.text.len(), false);

        if let Some(open) = self.stack.last() {
            return Err(GeneratorError::Markup(format!(
                "Unterminated @{}{} opened on line {}",
                open.kind,
                open.id
                    .as_deref()
                    .map(|id| format!("({})", id))
                    .unwrap_or_default(),
                open.line
            )));
        }
        Ok(self.root)
    }

    /// Start of the marker whose `@` is at `at`, and whether the comment
    /// leader precedes it
    fn marker_start(&self, at: usize) -> Option<(usize, bool)> {
        let before = &self.text[..at];
        if !self.leader.is_empty() {
            let spaced = before
                .strip_suffix(' ')
                .and_then(|b| b.strip_suffix(self.leader));
            let tight = before.strip_suffix(self.leader);
            for prefix in [spaced, tight].into_iter().flatten() {
                if prefix.chars().next_back().map_or(true, char::is_whitespace) {
                    return Some((prefix.len(), true));
                }
            }
        }
        if before.chars().next_back().map_or(true, char::is_whitespace) {
            return Some((at, false));
        }
        None
    }

    fn read_marker(&self, at: usize) -> Result<Option<Marker>> {
        let Some((start, has_leader)) = self.marker_start(at) else {
            return Ok(None);
        };

        let rest = &self.text[at + 1..];
        let name_len = rest
            .find(|c: char| !is_name_char(c))
            .unwrap_or(rest.len());
        let name = &rest[..name_len];
        if name.is_empty() {
            return Ok(None);
        }
        let mut end = at + 1 + name_len;

        if let Some(kind) = name.strip_suffix("-end").and_then(RegionKind::from_name) {
            if !self.text[end..].starts_with("()") {
                return Err(self.error(start, format!("Expected `()` after @{}", name)));
            }
            return Ok(Some(Marker {
                start,
                end: end + 2,
                tag: Tag::End(kind),
            }));
        }

        if let Some(kind) = RegionKind::from_name(name) {
            let id = if kind.takes_id() {
                let (id, consumed) = self.read_identifier(start, end, kind)?;
                end += consumed;
                Some(id)
            } else {
                if self.text[end..].starts_with("()") {
                    end += 2;
                }
                None
            };
            return Ok(Some(Marker {
                start,
                end,
                tag: Tag::Start(kind, id),
            }));
        }

        Ok(has_leader.then_some(Marker {
            start,
            end,
            tag: Tag::Bare,
        }))
    }

    /// Read `(ID)` at `pos`; parentheses inside the identifier must balance
    fn read_identifier(
        &self,
        start: usize,
        pos: usize,
        kind: RegionKind,
    ) -> Result<(String, usize)> {
        let rest = &self.text[pos..];
        if !rest.starts_with('(') {
            return Err(self.error(start, format!("@{} requires an identifier", kind)));
        }

        let mut depth = 0usize;
        for (i, c) in rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let id = rest[1..i].trim();
                        if id.is_empty() {
                            return Err(
                                self.error(start, format!("@{} requires an identifier", kind))
                            );
                        }
                        return Ok((id.to_string(), i + 1));
                    }
                }
                '\n' => break,
                _ => {}
            }
        }
        Err(self.error(start, format!("Unclosed identifier after @{}", kind)))
    }

    fn consume(&mut self, marker: Marker) -> Result<()> {
        let text = self.text;
        let line_start = text[..marker.start].rfind('\n').map_or(0, |p| p + 1);
        let bol = text[line_start..marker.start].chars().all(is_blank);
        let line_end = text[marker.end..]
            .find('\n')
            .map_or(text.len(), |p| marker.end + p);
        let eol = text[marker.end..line_end].chars().all(is_blank);
        let has_newline = line_end < text.len();
        let through_newline = if has_newline { line_end + 1 } else { line_end };

        match marker.tag {
            Tag::Bare => {
                let indent = self.flush_text(marker.start, bol);
                self.push_node(Node::Bare {
                    raw: format!("{}{}", indent, &text[marker.start..through_newline]),
                    restore_newline: !bol && has_newline,
                });
                self.advance(through_newline);
            }
            Tag::Start(kind, id) => {
                let alone = bol && eol;
                let indent = self.flush_text(marker.start, bol);
                let end = if eol {
                    through_newline
                } else {
                    text[marker.end..line_end]
                        .find(|c: char| !is_blank(c))
                        .map_or(line_end, |p| marker.end + p)
                };
                self.stack.push(Region {
                    kind,
                    id,
                    line: text[..marker.start].matches('\n').count() + 1,
                    open: format!("{}{}", indent, &text[marker.start..end]),
                    close: String::new(),
                    indent: if alone { String::new() } else { indent },
                    open_bol: bol,
                    open_newline: !bol && eol && has_newline,
                    close_newline: false,
                    close_alone: false,
                    children: Vec::new(),
                });
                self.advance(end);
            }
            Tag::End(kind) => {
                match self.stack.last() {
                    None => {
                        return Err(self.error(
                            marker.start,
                            format!("Stray @{}-end() with no open region", kind),
                        ))
                    }
                    Some(open) if open.kind != kind => {
                        return Err(self.error(
                            marker.start,
                            format!(
                                "@{}-end() does not close @{} opened on line {}",
                                kind, open.kind, open.line
                            ),
                        ))
                    }
                    Some(_) => {}
                }

                let blanks = self.flush_text(marker.start, true);
                let end = if eol { through_newline } else { marker.end };
                if let Some(mut region) = self.stack.pop() {
                    region.close = format!("{}{}", blanks, &text[marker.start..end]);
                    region.close_newline = eol && has_newline;
                    region.close_alone = bol && eol;
                    self.push_node(Node::Region(region));
                }
                self.advance(end);
            }
        }
        Ok(())
    }

    /// Emit pending text up to `upto`; with `strip_blanks`, trailing blanks
    /// are held back and returned instead
    fn flush_text(&mut self, upto: usize, strip_blanks: bool) -> String {
        let pending = &self.text[self.seg_start..upto];
        let kept = if strip_blanks {
            pending.trim_end_matches([' ', '\t'])
        } else {
            pending
        };
        let held = pending[kept.len()..].to_string();
        if !kept.is_empty() {
            self.push_node(Node::Text(kept.to_string()));
        }
        held
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(region) => region.children.push(node),
            None => self.root.push(node),
        }
    }

    fn advance(&mut self, pos: usize) {
        self.pos = pos;
        self.seg_start = pos;
    }

    fn error(&self, at: usize, message: String) -> GeneratorError {
        let line = self.text[..at].matches('\n').count() + 1;
        GeneratorError::Markup(format!("line {}: {}", line, message))
    }
}
