//! Evaluation of expression sides against candidate values

use crate::error::{SolverResult, UnsupportedConstruct};
use crate::model::{ArithmeticOperator, Infix, RelationalOperator};
use std::fmt;

/// Evaluate one side of a relation for a candidate value
///
/// A bare operand yields the candidate unchanged; `+k` and `-k` shift it. Any
/// other arithmetic infix is rejected. Results are widened to `i128`, so a
/// shift of any `i64` by any `i64` is exact.
pub fn evaluate(infix: Option<&Infix>, candidate: i64) -> SolverResult<i128> {
    let candidate = i128::from(candidate);
    let Some(infix) = infix else {
        return Ok(candidate);
    };

    match infix.operator {
        ArithmeticOperator::Add => Ok(candidate + i128::from(infix.literal)),
        ArithmeticOperator::Subtract => Ok(candidate - i128::from(infix.literal)),
        other => Err(UnsupportedConstruct::ArithmeticOperator(other).into()),
    }
}

/// The relational expression connecting the two nodes of an arc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    pub operator: RelationalOperator,
    pub left: Option<Infix>,
    pub right: Option<Infix>,
}

impl Connector {
    /// Bare relation with no offsets on either side
    pub fn new(operator: RelationalOperator) -> Self {
        Self {
            operator,
            left: None,
            right: None,
        }
    }

    /// Plain equality, used to channel real variables into encapsulated tuples
    pub fn equality() -> Self {
        Self::new(RelationalOperator::Equal)
    }

    /// Relation with optional `+k`/`-k` offsets
    pub fn with_infixes(operator: RelationalOperator, left: Option<Infix>, right: Option<Infix>) -> Self {
        Self { operator, left, right }
    }

    /// Apply the left side's infix to a candidate
    pub fn evaluate_left(&self, candidate: i64) -> SolverResult<i128> {
        evaluate(self.left.as_ref(), candidate)
    }

    /// Apply the right side's infix to a candidate
    pub fn evaluate_right(&self, candidate: i64) -> SolverResult<i128> {
        evaluate(self.right.as_ref(), candidate)
    }

    /// Whether raw values `left` and `right` satisfy the relation
    pub fn admits(&self, left: i64, right: i64) -> SolverResult<bool> {
        Ok(self.operator.holds(self.evaluate_left(left)?, self.evaluate_right(right)?))
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(infix) = &self.left {
            write!(f, "{} {} ", infix.operator, infix.literal)?;
        }
        write!(f, "{}", self.operator)?;
        if let Some(infix) = &self.right {
            write!(f, " ({} {})", infix.operator, infix.literal)?;
        }
        Ok(())
    }
}
