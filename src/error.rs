use std::ops::Range;

use thiserror::Error;

/// A failure to tokenize or parse a source block.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{}", .kind, span_suffix(.span))]
pub struct ParseError {
    pub kind: ErrorKind,
    pub span: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    /// Lexer encountered an unrecognized character/sequence.
    #[error("unrecognized token: {0}")]
    UnrecognizedToken(String),
    /// Parser expected one thing, got another.
    #[error("expected {expected}, got {got}")]
    UnexpectedToken { expected: String, got: String },
    /// Parser reached end of input unexpectedly.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
    /// General message.
    #[error("{0}")]
    Message(String),
}

fn span_suffix(span: &Option<Range<usize>>) -> String {
    match span {
        Some(span) => format!(" (at byte {}..{})", span.start, span.end),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Shorthand constructors.
impl ParseError {
    pub fn unrecognized(fragment: &str, span: Range<usize>) -> Self {
        Self {
            kind: ErrorKind::UnrecognizedToken(fragment.to_string()),
            span: Some(span),
        }
    }

    pub fn unexpected_token(expected: &str, got: &str, span: Range<usize>) -> Self {
        Self {
            kind: ErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                got: got.to_string(),
            },
            span: Some(span),
        }
    }

    pub fn unexpected_eof(expected: &str) -> Self {
        Self {
            kind: ErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            },
            span: None,
        }
    }

    pub fn message(msg: &str, span: Option<Range<usize>>) -> Self {
        Self {
            kind: ErrorKind::Message(msg.to_string()),
            span,
        }
    }
}

/// Everything the sync engine can report.
///
/// Only `Parse` is ever returned to a caller; the others are surfaced on the
/// panel's message channel and in the log.
#[derive(Debug, Error)]
pub enum TweakError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("evaluation failed: {0}")]
    Eval(String),
    #[error("editor text changed while a write-back was pending; {discarded} edit(s) discarded")]
    WriteBackConflict { discarded: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_span() {
        let err = ParseError::unexpected_token("')'", "','", 4..5);
        assert_eq!(err.to_string(), "expected ')', got ',' (at byte 4..5)");
    }

    #[test]
    fn display_without_span() {
        let err = ParseError::unexpected_eof("expression");
        assert_eq!(err.to_string(), "unexpected end of input, expected expression");
    }

    #[test]
    fn parse_error_converts_into_tweak_error() {
        let err: TweakError = ParseError::unrecognized("#", 0..1).into();
        assert!(matches!(err, TweakError::Parse(_)));
        assert!(err.to_string().starts_with("parse error: unrecognized token: #"));
    }
}
