//! miette diagnostics for record validation
//!
//! Turns a [`ValidationReport`] into a source-spanned diagnostic over the
//! JSON document it was loaded from, so `intake validate` can point at
//! the offending keys.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::core::errors::ValidationReport;

/// Validation failure for one record file, with source locations
#[derive(Debug, Error, Diagnostic)]
#[error("Record validation failed: {summary}")]
#[diagnostic(code(intake::schema::validation_error))]
pub struct RecordValidationError {
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    violations: Vec<FieldViolation>,
}

/// A single field violation
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct FieldViolation {
    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,
}

impl RecordValidationError {
    /// Build a diagnostic from a report, locating each violated path in
    /// the JSON source text
    pub fn from_report(filename: &str, source: &str, report: &ValidationReport) -> Self {
        let mut violations = Vec::new();
        for (path, messages) in report.flatten() {
            for message in messages {
                violations.push(FieldViolation {
                    span: find_path_span(source, &path),
                    hint: hint_for(message),
                    message: format!("{}: {}", path, message),
                });
            }
        }
        let summary = if violations.len() == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", violations.len())
        };
        Self {
            summary,
            src: NamedSource::new(filename, source.to_string()),
            violations,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }
}

/// Generate a short hint for the error label
fn hint_for(message: &str) -> String {
    if message.contains("required") {
        "required field missing".to_string()
    } else if message.contains("must be one of") {
        "invalid value".to_string()
    } else {
        "validation error".to_string()
    }
}

/// Find the span for a dotted field path in JSON content
fn find_path_span(content: &str, path: &str) -> SourceSpan {
    let parts: Vec<&str> = path.split('.').collect();

    // Prefer the last named segment; array indices fall back to the
    // enclosing key (the entry itself has no key in the source)
    for part in parts.iter().rev() {
        if part.parse::<usize>().is_ok() {
            continue;
        }
        if let Some(span) = find_key_span(content, part) {
            return span;
        }
    }

    // Fallback - highlight the first line
    let len = content.find('\n').unwrap_or(content.len()).max(1);
    (0, len).into()
}

/// Find the span of a quoted key in JSON content
fn find_key_span(content: &str, key: &str) -> Option<SourceSpan> {
    let needle = format!("\"{}\"", key);
    content.find(&needle).map(|offset| (offset, needle.len()).into())
}
