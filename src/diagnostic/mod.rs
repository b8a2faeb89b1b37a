//! User-facing error reports.
//!
//! Compile and runtime errors are converted into a `Diagnostic`, which the
//! CLI renders either as a rustc-style snippet (`ansi`) or as one JSON
//! object per line (`json`). Every diagnostic carries a stable code that
//! `registry` can explain.

pub mod ansi;
pub mod json;
pub mod registry;
pub mod source_map;

pub use source_map::SourceMap;

use serde::Serialize;

use crate::compiler::{CompileError, CompileErrorKind, Location};
use crate::scanner::{ScanError, Span};
use crate::vm::{InterpretError, RuntimeError, RuntimeErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    /// Source line the error belongs to, when known.
    pub line: Option<u32>,
    pub label: Option<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            line: None,
            label: None,
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.label = Some(Label { span, message: label.into() });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self {
        let label = match &e.location {
            Location::End => "at end of input".to_string(),
            Location::Lexeme(lexeme) => format!("at '{lexeme}'"),
            Location::None => "here".to_string(),
        };
        let d = Diagnostic::error(e.kind.to_string())
            .with_code(e.code())
            .with_line(e.line)
            .with_span(e.span, label);
        match e.kind {
            CompileErrorKind::InvalidAssignmentTarget => {
                d.with_suggestion("only a variable name can be assigned to")
            }
            CompileErrorKind::DuplicateLocal => {
                d.with_suggestion("rename it, or declare it in a nested block to shadow")
            }
            CompileErrorKind::Scan(ScanError::UnterminatedString) => d.with_suggestion("add a closing '\"'"),
            _ => d,
        }
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(e: &RuntimeError) -> Self {
        let d = Diagnostic::error(e.kind.to_string())
            .with_code(e.code())
            .with_line(e.line)
            .with_note("in script");
        match &e.kind {
            RuntimeErrorKind::UndefinedVariable { name } => {
                d.with_suggestion(format!("declare it first with `var {name};`"))
            }
            _ => d,
        }
    }
}

/// One diagnostic per compile error, or one for a runtime error, each
/// carrying `source` for snippet rendering.
pub fn from_interpret_error(err: &InterpretError, source: &str) -> Vec<Diagnostic> {
    match err {
        InterpretError::Compile(errors) => errors
            .iter()
            .map(|e| Diagnostic::from(e).with_source(source))
            .collect(),
        InterpretError::Runtime(e) => vec![Diagnostic::from(e).with_source(source)],
    }
}
