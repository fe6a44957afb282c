//! Arc-consistency propagation (AC-1: every arc is revised on every pass)

use super::cancel::CancellationToken;
use super::network::{Arc, ConstraintNetwork, Node};
use crate::error::SolverResult;
use log::{debug, trace};
use serde::Serialize;
use std::fmt;

/// Result of running propagation to a fixpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationOutcome {
    /// Fixpoint reached with no empty domain
    Consistent,
    /// A domain emptied or a global check failed
    Inconsistent,
}

/// Counters collected while propagating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropagationStatistics {
    pub passes: usize,
    pub arc_revisions: usize,
    pub values_removed: usize,
}

impl fmt::Display for PropagationStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Propagation Statistics:")?;
        writeln!(f, "  Passes: {}", self.passes)?;
        writeln!(f, "  Arc revisions: {}", self.arc_revisions)?;
        writeln!(f, "  Values removed: {}", self.values_removed)?;
        Ok(())
    }
}

/// Revises every arc of a network until no domain changes
pub struct ArcRevisionEngine {
    cancellation: CancellationToken,
    statistics: PropagationStatistics,
    conflict: bool,
}

impl ArcRevisionEngine {
    /// Engine that checks `cancellation` once per pass
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            statistics: PropagationStatistics::default(),
            conflict: false,
        }
    }

    /// Run revision passes until a fixpoint or an inconsistency
    pub fn propagate(&mut self, network: &mut ConstraintNetwork) -> SolverResult<PropagationOutcome> {
        if !network.is_solved() {
            return Ok(PropagationOutcome::Inconsistent);
        }

        loop {
            self.cancellation.check()?;
            let changed = self.revise_network(network)?;

            if self.conflict || !network.is_solved() {
                debug!("Propagation found an inconsistency after {} passes", self.statistics.passes);
                return Ok(PropagationOutcome::Inconsistent);
            }
            if !changed {
                break;
            }
        }

        debug!(
            "Propagation reached a fixpoint after {} passes ({} values removed)",
            self.statistics.passes, self.statistics.values_removed
        );
        Ok(PropagationOutcome::Consistent)
    }

    /// One full pass over every arc and all-different group
    ///
    /// Returns whether any value was removed.
    pub fn revise_network(&mut self, network: &mut ConstraintNetwork) -> SolverResult<bool> {
        self.statistics.passes += 1;
        let mut removed = 0;

        for index in 0..network.arcs().len() {
            let arc = network.arcs()[index].clone();
            removed += self.revise_arc(network, &arc)?;

            if network.node_is_empty(&arc.left) || network.node_is_empty(&arc.right) {
                trace!("Domain emptied while revising {}", network.describe_arc(&arc));
                self.statistics.values_removed += removed;
                return Ok(true);
            }
        }

        for index in 0..network.all_different_groups().len() {
            let group = network.all_different_groups()[index].clone();
            let revision = group.revise(network.variables_mut());
            removed += revision.removed;
            if !revision.consistent {
                trace!("All-different group #{} cannot be satisfied", index);
                self.conflict = true;
                break;
            }
        }

        self.statistics.values_removed += removed;
        Ok(removed > 0)
    }

    /// Revise both endpoints of one arc, the right one against the updated left
    fn revise_arc(&mut self, network: &mut ConstraintNetwork, arc: &Arc) -> SolverResult<usize> {
        self.statistics.arc_revisions += 1;
        let mut removed = 0;

        if arc.left.is_revisable() {
            let left_values = network.node_values(&arc.left);
            let right_values = network.node_values(&arc.right);
            let targets = right_values
                .iter()
                .map(|&r| arc.connector.evaluate_right(r))
                .collect::<SolverResult<Vec<_>>>()?;

            let mut supported = Vec::with_capacity(left_values.len());
            for &value in &left_values {
                let evaluated = arc.connector.evaluate_left(value)?;
                supported.push(targets.iter().any(|&t| arc.connector.operator.holds(evaluated, t)));
            }
            removed += Self::apply(network, &arc.left, &supported);
        }

        if arc.right.is_revisable() {
            let left_values = network.node_values(&arc.left);
            let right_values = network.node_values(&arc.right);
            let sources = left_values
                .iter()
                .map(|&l| arc.connector.evaluate_left(l))
                .collect::<SolverResult<Vec<_>>>()?;

            let mut supported = Vec::with_capacity(right_values.len());
            for &value in &right_values {
                let evaluated = arc.connector.evaluate_right(value)?;
                supported.push(sources.iter().any(|&s| arc.connector.operator.holds(s, evaluated)));
            }
            removed += Self::apply(network, &arc.right, &supported);
        }

        if removed > 0 {
            trace!("{} value(s) removed revising {}", removed, network.describe_arc(arc));
        }
        Ok(removed)
    }

    fn apply(network: &mut ConstraintNetwork, node: &Node, supported: &[bool]) -> usize {
        if supported.iter().all(|&keep| keep) {
            return 0;
        }
        network.retain_supported(node, supported)
    }

    /// Counters accumulated so far
    pub fn statistics(&self) -> PropagationStatistics {
        self.statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::all_different::AllDifferentGroup;
    use crate::csp::expression::Connector;
    use crate::csp::ternary::{EncapsulatedSelector, EncapsulatedVariablePermutationCalculator};
    use crate::csp::variables::VariableManager;
    use crate::error::SolverError;
    use crate::model::{ArithmeticOperator, Infix, RelationalOperator};

    fn network_with(domains: &[(&str, &[i64])]) -> ConstraintNetwork {
        let mut vm = VariableManager::new();
        for (name, values) in domains {
            vm.add_singleton(name, values).unwrap();
        }
        ConstraintNetwork::new(vm)
    }

    fn var(network: &ConstraintNetwork, name: &str) -> Node {
        Node::Variable(network.variables().lookup(name).unwrap())
    }

    fn engine() -> ArcRevisionEngine {
        ArcRevisionEngine::new(CancellationToken::new())
    }

    #[test]
    fn test_less_than_prunes_both_sides() {
        let mut network = network_with(&[("X", &[1, 2, 3]), ("Y", &[1, 2, 3])]);
        let arc = Arc::new(var(&network, "X"), var(&network, "Y"), Connector::new(RelationalOperator::Less));
        network.add_arc(arc);

        let outcome = engine().propagate(&mut network).unwrap();
        assert_eq!(outcome, PropagationOutcome::Consistent);
        assert_eq!(network.domain_of("X"), Some(vec![1, 2]));
        assert_eq!(network.domain_of("Y"), Some(vec![2, 3]));
    }

    #[test]
    fn test_offset_equality_keeps_feasible_pairs() {
        let mut network = network_with(&[("X", &[1, 2, 3]), ("Y", &[3, 4, 5])]);
        let connector = Connector::with_infixes(
            RelationalOperator::Equal,
            Some(Infix {
                operator: ArithmeticOperator::Add,
                literal: 2,
            }),
            None,
        );
        let arc = Arc::new(var(&network, "X"), var(&network, "Y"), connector);
        network.add_arc(arc);

        assert_eq!(engine().propagate(&mut network).unwrap(), PropagationOutcome::Consistent);
        assert_eq!(network.domain_of("X"), Some(vec![1, 2, 3]));
        assert_eq!(network.domain_of("Y"), Some(vec![3, 4, 5]));
    }

    #[test]
    fn test_unsatisfiable_empties_domain() {
        let mut network = network_with(&[("X", &[5]), ("Y", &[1, 2, 3])]);
        let arc = Arc::new(var(&network, "X"), var(&network, "Y"), Connector::new(RelationalOperator::Less));
        network.add_arc(arc);

        assert_eq!(engine().propagate(&mut network).unwrap(), PropagationOutcome::Inconsistent);
        assert_eq!(network.domain_of("X"), Some(vec![]));
        assert!(!network.is_solved());
    }

    #[test]
    fn test_literal_right_side() {
        let mut network = network_with(&[("X", &[1, 2, 3, 4])]);
        let arc = Arc::new(var(&network, "X"), Node::Literal(3), Connector::new(RelationalOperator::GreaterOrEqual));
        network.add_arc(arc);

        engine().propagate(&mut network).unwrap();
        assert_eq!(network.domain_of("X"), Some(vec![3, 4]));
    }

    #[test]
    fn test_fixpoint_is_idempotent() {
        let mut network = network_with(&[("A", &[1, 2, 3, 4]), ("B", &[1, 2, 3, 4]), ("C", &[1, 2, 3, 4])]);
        let less = Connector::new(RelationalOperator::Less);
        let arc_ab = Arc::new(var(&network, "A"), var(&network, "B"), less.clone());
        let arc_bc = Arc::new(var(&network, "B"), var(&network, "C"), less);
        network.add_arc(arc_ab);
        network.add_arc(arc_bc);

        let mut engine = engine();
        engine.propagate(&mut network).unwrap();
        assert!(!engine.revise_network(&mut network).unwrap());
        assert!(!engine.revise_network(&mut network).unwrap());
        assert_eq!(network.domain_of("A"), Some(vec![1, 2]));
        assert_eq!(network.domain_of("B"), Some(vec![2, 3]));
        assert_eq!(network.domain_of("C"), Some(vec![3, 4]));
    }

    #[test]
    fn test_local_consistency_and_monotonic_shrink() {
        let mut network = network_with(&[("A", &[1, 2, 3, 4, 5]), ("B", &[2, 4, 6]), ("C", &[1, 3, 5])]);
        let arcs = vec![
            Arc::new(var(&network, "A"), var(&network, "B"), Connector::new(RelationalOperator::Greater)),
            Arc::new(var(&network, "B"), var(&network, "C"), Connector::new(RelationalOperator::NotEqual)),
            Arc::new(
                var(&network, "C"),
                var(&network, "A"),
                Connector::with_infixes(
                    RelationalOperator::LessOrEqual,
                    Some(Infix {
                        operator: ArithmeticOperator::Subtract,
                        literal: 1,
                    }),
                    None,
                ),
            ),
        ];
        for arc in arcs {
            network.add_arc(arc);
        }

        let mut engine = engine();
        let mut sizes: Vec<usize> = ["A", "B", "C"].iter().map(|n| network.domain_of(n).unwrap().len()).collect();
        loop {
            let changed = engine.revise_network(&mut network).unwrap();
            let now: Vec<usize> = ["A", "B", "C"].iter().map(|n| network.domain_of(n).unwrap().len()).collect();
            assert!(now.iter().zip(&sizes).all(|(after, before)| after <= before));
            sizes = now;
            if !changed {
                break;
            }
        }

        for arc in network.arcs() {
            let left = network.node_values(&arc.left);
            let right = network.node_values(&arc.right);
            for &l in &left {
                assert!(right.iter().any(|&r| arc.connector.admits(l, r).unwrap()));
            }
            for &r in &right {
                assert!(left.iter().any(|&l| arc.connector.admits(l, r).unwrap()));
            }
        }
    }

    #[test]
    fn test_encapsulated_channels_prune_real_variables() {
        let mut network = network_with(&[("L", &[1, 2, 3]), ("R", &[2, 3, 4])]);
        let l = network.variables().lookup("L").unwrap();
        let r = network.variables().lookup("R").unwrap();
        let tuples = EncapsulatedVariablePermutationCalculator::compute(
            &[1, 2, 3],
            None,
            RelationalOperator::Equal,
            &[2, 3, 4],
            None,
        )
        .unwrap();
        let e = network.variables_mut().add_encapsulated([l, r], tuples);
        network.add_arc(Arc::new(
            Node::Variable(l),
            Node::Encapsulated {
                variable: e,
                selector: EncapsulatedSelector::First,
            },
            Connector::equality(),
        ));
        network.add_arc(Arc::new(
            Node::Encapsulated {
                variable: e,
                selector: EncapsulatedSelector::Second,
            },
            Node::Variable(r),
            Connector::equality(),
        ));

        assert_eq!(engine().propagate(&mut network).unwrap(), PropagationOutcome::Consistent);
        assert_eq!(network.domain_of("L"), Some(vec![2, 3]));
        assert_eq!(network.domain_of("R"), Some(vec![2, 3]));
    }

    #[test]
    fn test_all_different_pigeonhole_is_inconsistent() {
        let mut network = network_with(&[("A", &[1, 2]), ("B", &[1, 2]), ("C", &[1, 2])]);
        let members = ["A", "B", "C"]
            .iter()
            .map(|n| network.variables().lookup(n).unwrap())
            .collect();
        network.add_all_different(AllDifferentGroup::new(members));

        assert_eq!(engine().propagate(&mut network).unwrap(), PropagationOutcome::Inconsistent);
    }

    #[test]
    fn test_cancelled_propagation() {
        let mut network = network_with(&[("X", &[1, 2])]);
        let token = CancellationToken::new();
        token.cancel();

        let result = ArcRevisionEngine::new(token).propagate(&mut network);
        assert_eq!(result, Err(SolverError::Cancelled));
    }

    #[test]
    fn test_statistics_are_collected() {
        let mut network = network_with(&[("X", &[1, 2, 3]), ("Y", &[1, 2, 3])]);
        let arc = Arc::new(var(&network, "X"), var(&network, "Y"), Connector::new(RelationalOperator::Less));
        network.add_arc(arc);

        let mut engine = engine();
        engine.propagate(&mut network).unwrap();
        let stats = engine.statistics();
        assert_eq!(stats.values_removed, 2);
        assert_eq!(stats.passes, 2);
        assert!(stats.to_string().contains("Values removed: 2"));
    }
}
