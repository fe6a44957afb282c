//! Binarization of ternary relations through encapsulated pair variables

use super::expression::evaluate;
use super::variables::ValueSet;
use crate::error::{SolverResult, UnsupportedConstruct};
use crate::model::{Infix, RelationalOperator};
use itertools::iproduct;

/// Which tuple position an arc endpoint on an encapsulated variable reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncapsulatedSelector {
    First,
    Second,
}

impl EncapsulatedSelector {
    /// Tuple index this selector reads
    pub fn position(self) -> usize {
        match self {
            EncapsulatedSelector::First => 0,
            EncapsulatedSelector::Second => 1,
        }
    }

    /// Project a pair onto this position
    pub fn select(self, tuple: &ValueSet) -> i64 {
        let [first, second] = *tuple.values();
        match self {
            EncapsulatedSelector::First => first,
            EncapsulatedSelector::Second => second,
        }
    }
}

/// Computes the admissible pairs forming an encapsulated variable's domain
pub struct EncapsulatedVariablePermutationCalculator;

impl EncapsulatedVariablePermutationCalculator {
    /// Cross product of both domains, filtered by `operator`
    ///
    /// Side infixes are applied before the comparison. Only equality and
    /// inequality are implemented for ternary relations.
    pub fn compute(
        left: &[i64],
        left_infix: Option<&Infix>,
        operator: RelationalOperator,
        right: &[i64],
        right_infix: Option<&Infix>,
    ) -> SolverResult<Vec<ValueSet>> {
        if !matches!(operator, RelationalOperator::Equal | RelationalOperator::NotEqual) {
            return Err(UnsupportedConstruct::TernaryOperator(operator).into());
        }

        let mut tuples = Vec::new();
        for (&a, &b) in iproduct!(left, right) {
            let lhs = evaluate(left_infix, a)?;
            let rhs = evaluate(right_infix, b)?;
            let admissible = match operator {
                RelationalOperator::Equal => lhs == rhs,
                _ => lhs != rhs,
            };
            if admissible {
                tuples.push(ValueSet::pair(a, b));
            }
        }

        Ok(tuples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;
    use crate::model::ArithmeticOperator;

    #[test]
    fn test_equality_pairs() {
        let tuples = EncapsulatedVariablePermutationCalculator::compute(
            &[1, 2, 3],
            None,
            RelationalOperator::Equal,
            &[2, 3, 4],
            None,
        )
        .unwrap();
        assert_eq!(tuples, vec![ValueSet::pair(2, 2), ValueSet::pair(3, 3)]);
    }

    #[test]
    fn test_inequality_pairs_are_sound_and_complete() {
        let left = [1, 2, 3];
        let right = [1, 2];
        let tuples = EncapsulatedVariablePermutationCalculator::compute(
            &left,
            None,
            RelationalOperator::NotEqual,
            &right,
            None,
        )
        .unwrap();

        assert!(tuples.iter().all(|t| t.get(0) != t.get(1)));
        let expected = left.len() * right.len() - 2;
        assert_eq!(tuples.len(), expected);
    }

    #[test]
    fn test_infix_applied_before_comparison() {
        let shift = Infix {
            operator: ArithmeticOperator::Add,
            literal: 1,
        };
        let tuples = EncapsulatedVariablePermutationCalculator::compute(
            &[1, 2],
            Some(&shift),
            RelationalOperator::Equal,
            &[2, 3],
            None,
        )
        .unwrap();
        assert_eq!(tuples, vec![ValueSet::pair(1, 2), ValueSet::pair(2, 3)]);
    }

    #[test]
    fn test_ordering_operator_unsupported() {
        let result = EncapsulatedVariablePermutationCalculator::compute(
            &[1],
            None,
            RelationalOperator::Less,
            &[2],
            None,
        );
        assert_eq!(
            result,
            Err(SolverError::Unsupported(UnsupportedConstruct::TernaryOperator(
                RelationalOperator::Less
            )))
        );
    }

    #[test]
    fn test_selector() {
        let tuple = ValueSet::pair(4, 9);
        assert_eq!(EncapsulatedSelector::First.select(&tuple), 4);
        assert_eq!(EncapsulatedSelector::Second.select(&tuple), 9);
        assert_eq!(tuple.get(EncapsulatedSelector::Second.position()), Some(9));
        assert_eq!(tuple.get(2), None);
    }
}
