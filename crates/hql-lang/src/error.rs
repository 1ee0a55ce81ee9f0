//! Errors raised while lexing and parsing query text.

use crate::span::{line_and_column, Span};
use thiserror::Error;

/// A syntax error in an HQL string.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Error raised when the input ends while more tokens were required.
    pub fn unexpected_end(expected: &str, source: &str) -> Self {
        let end = source.len();
        Self::new(
            format!("unexpected end of query, expected {}", expected),
            Span::new(end, end),
        )
    }

    /// Render the error with the offending line and a caret under the span.
    pub fn format_with_source(&self, source: &str) -> String {
        let (line, column) = line_and_column(source, self.span.start);
        let mut out = format!("error: {}\n  --> line {}:{}\n", self.message, line, column);

        if let Some(text) = source.lines().nth(line - 1) {
            out.push_str(&format!("   |\n{:3}| {}\n   |", line, text));
            out.push_str(&" ".repeat(column));
            out.push('^');

            let available = text.len().saturating_sub(column - 1);
            let width = self.span.len().min(available);
            if width > 1 {
                out.push_str(&"~".repeat(width - 1));
            }
            out.push('\n');
        }

        if let Some(hint) = &self.hint {
            out.push_str(&format!("   = hint: {}\n", hint));
        }

        out
    }
}
