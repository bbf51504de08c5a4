use phrase_ast::Span;
use phrase_lexer::TokenKind;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found}")]
    Expected {
        expected: String,
        found: TokenKind,
        span: Span,
    },

    #[error("expected expression")]
    ExpectedExpression { span: Span },

    #[error("expected statement")]
    ExpectedStatement { span: Span },

    #[error("expected {expected} after {after}")]
    ExpectedAfter {
        expected: String,
        after: String,
        span: Span,
    },

    #[error("unclosed {delimiter} opened at {opened_at:?}")]
    UnclosedDelimiter {
        delimiter: String,
        opened_at: Span,
        span: Span,
    },

    #[error("invalid assignment target")]
    InvalidAssignmentTarget { span: Span },

    #[error("{message}")]
    Forbidden { message: String, span: Span },

    #[error("{message}")]
    Lex { message: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Expected { span, .. }
            | ParseError::ExpectedExpression { span }
            | ParseError::ExpectedStatement { span }
            | ParseError::ExpectedAfter { span, .. }
            | ParseError::UnclosedDelimiter { span, .. }
            | ParseError::InvalidAssignmentTarget { span }
            | ParseError::Forbidden { span, .. }
            | ParseError::Lex { span, .. } => *span,
        }
    }
}
