// src/exec/command.rs

//! Run requests and command-line construction.
//!
//! Arguments funnel through a single command-line string (that is how the
//! copy tool receives them on Windows), so quoting follows a literal rule
//! rather than platform escaping:
//!
//! - empty / whitespace-only arguments are left as-is,
//! - arguments already wrapped in `"` are left as-is,
//! - everything else is wrapped in `"`.

use std::path::{Path, PathBuf};

/// Wrap `arg` in double quotes unless it is blank or already quoted.
pub fn quote(arg: &str) -> String {
    if arg.trim().is_empty() || is_quoted(arg) {
        return arg.to_string();
    }
    format!("\"{arg}\"")
}

/// Turn one command-line token into a single argv entry.
///
/// Quotes only group text on the command line, so every `"` is dropped:
/// `"a b"` becomes `a b` and `/XF:"a b"` becomes `/XF:a b`.
pub fn argv_token(arg: &str) -> String {
    arg.chars().filter(|&c| c != '"').collect()
}

fn is_quoted(arg: &str) -> bool {
    arg.len() >= 2 && arg.starts_with('"') && arg.ends_with('"')
}

/// Split a caller-supplied option string into tokens.
///
/// Tokens are separated by whitespace; a double-quoted segment stays inside
/// its token (quotes included), so `/XD "Temp Files"` yields two tokens.
pub fn split_options(options: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in options.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Everything needed to start one child process.
///
/// Immutable once built; one request per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl RunRequest {
    /// Request for an arbitrary program. `args` are used verbatim.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
        }
    }

    /// Request for a copy tool: `[quote(source), quote(destination), options...]`.
    ///
    /// Paths are opaque here and not validated.
    pub fn copy(
        program: impl Into<String>,
        source: &str,
        destination: &str,
        options: &str,
    ) -> Self {
        let mut args = vec![quote(source), quote(destination)];
        args.extend(split_options(options));
        Self::new(program, args)
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Arguments joined with single spaces, as handed to the OS on Windows.
    ///
    /// Blank arguments are dropped so they do not produce double spaces.
    pub fn command_line(&self) -> String {
        self.args
            .iter()
            .filter(|a| !a.trim().is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Program followed by the command line, for logs and `--dry-run`.
    pub fn display(&self) -> String {
        let line = self.command_line();
        if line.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, line)
        }
    }
}
