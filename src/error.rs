// ABOUTME: Error types for lexing, parsing, and evaluation failures

use crate::span::Span;
use thiserror::Error;

/// The closed set of error kinds the runtime can raise. Every stage (lexer,
/// parser, evaluator) reports through this one type so the embedding surface
/// has a single structured shape to hand back to a host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PyrlError {
    #[error("LexError: {message} at {span}")]
    Lex { message: String, span: Span },

    #[error("ParseError: {message} at {span}")]
    Parse { message: String, span: Span },

    #[error("NameError: {message} at {span}")]
    Name { message: String, span: Span },

    #[error("TypeError: {message} at {span}")]
    Type { message: String, span: Span },

    #[error("IndexError: {message} at {span}")]
    Index { message: String, span: Span },

    #[error("KeyError: {message} at {span}")]
    Key { message: String, span: Span },

    #[error("ZeroDivisionError: {message} at {span}")]
    ZeroDivision { message: String, span: Span },

    #[error("RegexError: {message} at {span}")]
    Regex { message: String, span: Span },

    #[error("AssertionError: {message} at {span}")]
    Assertion { message: String, span: Span },
}

/// A flattened, serializable view of a `PyrlError`, for embedding surfaces
/// (`execute`'s `error` field) that want kind/message/location as separate
/// fields rather than a formatted string.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorInfo {
    pub kind: &'static str,
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl PyrlError {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PyrlError::Lex { .. } => "LexError",
            PyrlError::Parse { .. } => "ParseError",
            PyrlError::Name { .. } => "NameError",
            PyrlError::Type { .. } => "TypeError",
            PyrlError::Index { .. } => "IndexError",
            PyrlError::Key { .. } => "KeyError",
            PyrlError::ZeroDivision { .. } => "ZeroDivisionError",
            PyrlError::Regex { .. } => "RegexError",
            PyrlError::Assertion { .. } => "AssertionError",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            PyrlError::Lex { span, .. }
            | PyrlError::Parse { span, .. }
            | PyrlError::Name { span, .. }
            | PyrlError::Type { span, .. }
            | PyrlError::Index { span, .. }
            | PyrlError::Key { span, .. }
            | PyrlError::ZeroDivision { span, .. }
            | PyrlError::Regex { span, .. }
            | PyrlError::Assertion { span, .. } => *span,
        }
    }

    /// The bare cause text, without the `"<Kind>: ... at line L, column C"`
    /// wrapping `Display` adds — `to_info()` reports kind/line/col as their
    /// own fields, so its `message` should not repeat them.
    fn bare_message(&self) -> &str {
        match self {
            PyrlError::Lex { message, .. }
            | PyrlError::Parse { message, .. }
            | PyrlError::Name { message, .. }
            | PyrlError::Type { message, .. }
            | PyrlError::Index { message, .. }
            | PyrlError::Key { message, .. }
            | PyrlError::ZeroDivision { message, .. }
            | PyrlError::Regex { message, .. }
            | PyrlError::Assertion { message, .. } => message,
        }
    }

    pub fn to_info(&self) -> ErrorInfo {
        let span = self.span();
        ErrorInfo {
            kind: self.kind_name(),
            message: self.bare_message().to_string(),
            line: span.line,
            col: span.col,
        }
    }

    pub fn lex(message: impl Into<String>, span: Span) -> Self {
        PyrlError::Lex { message: message.into(), span }
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        PyrlError::Parse { message: message.into(), span }
    }

    /// The normative message for an unresolved reference (`spec` §7): the
    /// name is rendered exactly as written, sigil included where present.
    pub fn undefined_variable(as_written: impl Into<String>, span: Span) -> Self {
        PyrlError::Name {
            message: format!("Undefined variable: {}", as_written.into()),
            span,
        }
    }

    pub fn name_error(message: impl Into<String>, span: Span) -> Self {
        PyrlError::Name { message: message.into(), span }
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        PyrlError::Type { message: message.into(), span }
    }

    pub fn arity_error(
        function: &str,
        expected: impl Into<String>,
        actual: usize,
        span: Span,
    ) -> Self {
        PyrlError::Type {
            message: format!(
                "{}: expected {} argument(s), got {}",
                function,
                expected.into(),
                actual
            ),
            span,
        }
    }

    /// The normative message for indexing a value that cannot be indexed,
    /// or indexing with a key of the wrong kind (`spec` §7).
    pub fn bad_index(key: impl std::fmt::Display, type_name: &str, span: Span) -> Self {
        PyrlError::Index {
            message: format!("Cannot access index '{}' on {}", key, type_name),
            span,
        }
    }

    pub fn index_error(message: impl Into<String>, span: Span) -> Self {
        PyrlError::Index { message: message.into(), span }
    }

    pub fn key_error(key: impl std::fmt::Display, span: Span) -> Self {
        PyrlError::Key { message: format!("missing key '{}'", key), span }
    }

    pub fn zero_division(message: impl Into<String>, span: Span) -> Self {
        PyrlError::ZeroDivision { message: message.into(), span }
    }

    pub fn regex_error(message: impl Into<String>, span: Span) -> Self {
        PyrlError::Regex { message: message.into(), span }
    }

    pub fn assertion(message: impl Into<String>, span: Span) -> Self {
        PyrlError::Assertion { message: message.into(), span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_variable_message() {
        let e = PyrlError::undefined_variable("$len", Span::new(1, 1));
        assert_eq!(e.to_string(), "NameError: Undefined variable: $len at line 1, column 1");
    }

    #[test]
    fn test_bad_index_message() {
        let e = PyrlError::bad_index("x", "Int", Span::new(2, 4));
        assert_eq!(
            e.to_string(),
            "IndexError: Cannot access index 'x' on Int at line 2, column 4"
        );
    }

    #[test]
    fn test_kind_name_and_info() {
        let e = PyrlError::zero_division("division by zero", Span::new(5, 2));
        let info = e.to_info();
        assert_eq!(info.kind, "ZeroDivisionError");
        assert_eq!(info.line, 5);
        assert_eq!(info.col, 2);
    }
}
