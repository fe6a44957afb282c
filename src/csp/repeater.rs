//! Instantiation of repeated constraints over an aggregate's indices

use crate::error::{SolverError, SolverResult};
use crate::model::{ConstraintExpression, ExpressionSide, Operand};

/// Expands `repeated` constraints into one concrete expression per index
pub struct ConstraintRepeater<F>
where
    F: Fn(&str) -> Option<usize>,
{
    aggregate_size: F,
}

impl<F> ConstraintRepeater<F>
where
    F: Fn(&str) -> Option<usize>,
{
    /// `aggregate_size` resolves an aggregate name to its element count
    pub fn new(aggregate_size: F) -> Self {
        Self { aggregate_size }
    }

    /// Instantiate `expression` for every index of `aggregate`
    ///
    /// Indices for which some relative operand falls outside its aggregate are
    /// skipped, so `s[i] < s[i+1]` over four elements yields three relations.
    pub fn expand(&self, aggregate: &str, expression: &ConstraintExpression) -> SolverResult<Vec<ConstraintExpression>> {
        let size = self.size_of(aggregate)?;
        let mut instances = Vec::with_capacity(size);

        for index in 0..size {
            let left = self.instantiate(&expression.left, index)?;
            let right = self.instantiate(&expression.right, index)?;
            if let (Some(left), Some(right)) = (left, right) {
                instances.push(ConstraintExpression {
                    left,
                    operator: expression.operator,
                    right,
                });
            }
        }

        Ok(instances)
    }

    fn size_of(&self, aggregate: &str) -> SolverResult<usize> {
        (self.aggregate_size)(aggregate).ok_or_else(|| SolverError::UnknownVariable(aggregate.to_string()))
    }

    /// `None` when a relative operand lands outside its aggregate
    fn instantiate(&self, side: &ExpressionSide, index: usize) -> SolverResult<Option<ExpressionSide>> {
        let Operand::Relative { aggregate, offset } = &side.operand else {
            return Ok(Some(side.clone()));
        };

        let size = self.size_of(aggregate)?;
        let target = i64::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(*offset))
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i < size);

        Ok(target.map(|element| ExpressionSide {
            operand: Operand::element(aggregate.clone(), element),
            infix: side.infix,
        }))
    }
}
