//! Error types raised by the solving engine

use crate::model::{ArithmeticOperator, RelationalOperator};
use thiserror::Error;

pub type SolverResult<T> = Result<T, SolverError>;

/// Fatal conditions that abort a solve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("unsupported construct: {0}")]
    Unsupported(#[from] UnsupportedConstruct),
    #[error("variable `{0}` is not registered with the solver")]
    UnknownVariable(String),
    #[error("variable `{0}` is registered twice")]
    DuplicateVariable(String),
    #[error("aggregate `{aggregate}` has no element at index {index}")]
    IndexOutOfRange { aggregate: String, index: i64 },
    #[error("domain of `{variable}` cannot be evaluated: {reason}")]
    InvalidDomain { variable: String, reason: String },
    #[error("solve was cancelled")]
    Cancelled,
}

/// Model or expression shapes the engine does not implement
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedConstruct {
    #[error("arithmetic operator `{0}` in an expression side")]
    ArithmeticOperator(ArithmeticOperator),
    #[error("operator `{0}` in a ternary constraint (only `=` and `!=` are supported)")]
    TernaryOperator(RelationalOperator),
    #[error("loop-relative operand `{0}` outside a repeated constraint")]
    RelativeOperand(String),
    #[error("{0}")]
    Expression(String),
}
