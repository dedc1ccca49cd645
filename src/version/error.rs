use thiserror::Error;

use crate::module::ModuleName;

/// Errors from the restricted version-line evaluator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("string interpolation is not supported")]
    Interpolation,

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected trailing input")]
    TrailingInput,

    #[error("'{0}' is not numeric")]
    NotNumeric(String),

    #[error("division by zero")]
    DivisionByZero,
}

/// Malformed output from a subprocess worker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("worker produced no output")]
    NoOutput,

    #[error("worker output is not newline-terminated: {0:?}")]
    Unterminated(String),

    #[error("malformed worker output: {0:?}")]
    Malformed(String),
}

/// Errors a strategy cannot downgrade to a "(failed)" outcome
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("protocol violation while probing {module}: {source}")]
    Protocol {
        module: ModuleName,
        source: ProtocolError,
    },

    #[error("failed to run worker for {module}: {source}")]
    Worker {
        module: ModuleName,
        source: std::io::Error,
    },
}
