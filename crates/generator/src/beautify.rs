//! Source beautifiers applied to every generated artifact

use regex::Regex;
use rpcgen_common::{GeneratorError, Result};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

/// Formats generated source text
#[cfg_attr(test, mockall::automock)]
pub trait Beautify {
    fn beautify(&self, code: &str) -> Result<String>;
}

/// Which beautifier a language profile asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeautifierConfig {
    /// Built-in whitespace normalization
    Normalize,
    /// Pipe the code through an external formatter
    External {
        program: String,
        args: Vec<String>,
        /// Restore the space between a statement and its trailing `//`
        /// comment, which uncrustify drops
        fix_inline_comments: bool,
    },
}

impl BeautifierConfig {
    pub fn build(&self) -> Box<dyn Beautify + Send + Sync> {
        match self {
            BeautifierConfig::Normalize => Box::new(Normalize),
            BeautifierConfig::External {
                program,
                args,
                fix_inline_comments,
            } => Box::new(ExternalFormatter {
                program: program.clone(),
                args: args.clone(),
                fix_inline_comments: *fix_inline_comments,
            }),
        }
    }
}

/// Trailing whitespace stripped, at most two consecutive blank lines, and
/// exactly one final newline
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalize;

impl Beautify for Normalize {
    fn beautify(&self, code: &str) -> Result<String> {
        let mut out = String::with_capacity(code.len() + 1);
        let mut blank_run = 0;

        for line in code.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 2 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            out.push_str(line);
            out.push('\n');
        }

        let trimmed_len = out.trim_end_matches('\n').len();
        if trimmed_len == 0 {
            return Ok(String::new());
        }
        out.truncate(trimmed_len);
        out.push('\n');
        Ok(out)
    }
}

/// Runs an external formatter with the code on stdin
#[derive(Debug, Clone)]
pub struct ExternalFormatter {
    pub program: String,
    pub args: Vec<String>,
    pub fix_inline_comments: bool,
}

impl Beautify for ExternalFormatter {
    fn beautify(&self, code: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => GeneratorError::Configuration(format!(
                    "Beautifier '{}' is not installed or not on PATH",
                    self.program
                )),
                _ => GeneratorError::Generation(format!(
                    "Failed to start beautifier '{}': {}",
                    self.program, e
                )),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = stdin
                .write_all(code.as_bytes())
                .and_then(|_| stdin.write_all(b"\n"));
            // an early exit closes stdin; the exit status is reported below
            if let Err(e) = written {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(GeneratorError::Generation(format!(
                "Beautifier '{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let formatted = String::from_utf8(output.stdout).map_err(|e| {
            GeneratorError::Generation(format!(
                "Beautifier '{}' produced non-UTF-8 output: {}",
                self.program, e
            ))
        })?;

        if self.fix_inline_comments {
            fix_inline_comments(&formatted)
        } else {
            Ok(formatted)
        }
    }
}

/// `x = 1;// note\n\n` -> `x = 1; // note\n`
pub fn fix_inline_comments(code: &str) -> Result<String> {
    let inline_comment = Regex::new(r"(.*;) *(//.*)(\n)(\n*)")
        .map_err(|e| GeneratorError::Generation(format!("Invalid comment pattern: {}", e)))?;
    Ok(inline_comment.replace_all(code, "${1} ${2}\n").into_owned())
}
