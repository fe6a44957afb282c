//! Chronological backtracking used to complete an assignment after propagation

use super::cancel::CancellationToken;
use super::network::{ConstraintNetwork, Node};
use super::variables::{EncapsulatedId, Value, VariableId};
use crate::error::SolverResult;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Committed bindings of one search, undone in reverse order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentTable {
    values: HashMap<VariableId, i64>,
    trail: Vec<VariableId>,
}

impl AssignmentTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value.variable`; rebinding an assigned variable is refused
    pub fn assign(&mut self, value: Value) -> bool {
        if self.values.contains_key(&value.variable) {
            return false;
        }
        self.values.insert(value.variable, value.content);
        self.trail.push(value.variable);
        true
    }

    /// Value bound to `variable`, if any
    pub fn value(&self, variable: VariableId) -> Option<i64> {
        self.values.get(&variable).copied()
    }

    /// Whether `variable` is bound
    pub fn is_assigned(&self, variable: VariableId) -> bool {
        self.values.contains_key(&variable)
    }

    /// Current trail position, to undo back to later
    pub fn mark(&self) -> usize {
        self.trail.len()
    }

    /// Remove every binding made after `mark`
    pub fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(variable) = self.trail.pop() {
                self.values.remove(&variable);
            }
        }
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    /// Bindings in the order they were made
    pub fn bindings(&self) -> impl Iterator<Item = Value> + '_ {
        self.trail.iter().map(|&variable| Value {
            variable,
            content: self.values[&variable],
        })
    }
}

/// One decision level of the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchUnit {
    Variable(VariableId),
    Encapsulated(EncapsulatedId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Solution(AssignmentTable),
    Exhausted,
    /// The configured node limit was hit before a verdict
    LimitReached,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStatistics {
    pub nodes: u64,
    pub backtracks: u64,
}

impl fmt::Display for SearchStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Search Statistics:")?;
        writeln!(f, "  Nodes: {}", self.nodes)?;
        writeln!(f, "  Backtracks: {}", self.backtracks)?;
        Ok(())
    }
}

/// One open level of the search: which unit, the next candidate to try and
/// the trail position to restore before each attempt
struct Frame {
    unit: SearchUnit,
    cursor: usize,
    mark: usize,
}

enum Opened {
    Complete,
    LimitReached,
    Frame(Frame),
}

/// Depth-first search over plain variables, then encapsulated variables
pub struct BacktrackingSearch<'a> {
    network: &'a ConstraintNetwork,
    cancellation: CancellationToken,
    node_limit: Option<u64>,
    units: Vec<SearchUnit>,
    arcs_by_variable: HashMap<VariableId, Vec<usize>>,
    groups_by_variable: HashMap<VariableId, Vec<usize>>,
    table: AssignmentTable,
    statistics: SearchStatistics,
}

impl<'a> BacktrackingSearch<'a> {
    /// Prepare a search over `network`, indexing arcs and groups by variable
    pub fn new(network: &'a ConstraintNetwork, cancellation: CancellationToken) -> Self {
        let variables = network.variables();
        let units = variables
            .variables()
            .map(|(id, _)| SearchUnit::Variable(id))
            .chain(
                variables
                    .encapsulated_variables()
                    .map(|(id, _)| SearchUnit::Encapsulated(id)),
            )
            .collect();

        let mut arcs_by_variable: HashMap<VariableId, Vec<usize>> = HashMap::new();
        for (index, arc) in network.arcs().iter().enumerate() {
            for node in [arc.left, arc.right] {
                if let Node::Variable(id) = node {
                    let entry = arcs_by_variable.entry(id).or_default();
                    if entry.last() != Some(&index) {
                        entry.push(index);
                    }
                }
            }
        }

        let mut groups_by_variable: HashMap<VariableId, Vec<usize>> = HashMap::new();
        for (index, group) in network.all_different_groups().iter().enumerate() {
            for &member in &group.members {
                groups_by_variable.entry(member).or_default().push(index);
            }
        }

        Self {
            network,
            cancellation,
            node_limit: None,
            units,
            arcs_by_variable,
            groups_by_variable,
            table: AssignmentTable::new(),
            statistics: SearchStatistics::default(),
        }
    }

    /// Stop with [`SearchOutcome::LimitReached`] after `limit` nodes
    pub fn with_node_limit(mut self, limit: Option<u64>) -> Self {
        self.node_limit = limit;
        self
    }

    /// Search for the first complete consistent assignment
    ///
    /// Fails with [`SolverError::Cancelled`](crate::error::SolverError::Cancelled) when the token fires.
    pub fn run(&mut self) -> SolverResult<SearchOutcome> {
        self.table = AssignmentTable::new();
        self.statistics = SearchStatistics::default();

        let outcome = self.search()?;

        debug!(
            "Backtracking finished after {} nodes and {} backtracks",
            self.statistics.nodes, self.statistics.backtracks
        );
        Ok(outcome)
    }

    /// Counters of the last run
    pub fn statistics(&self) -> SearchStatistics {
        self.statistics
    }

    /// Depth-first search driven by an explicit stack of frames
    ///
    /// Depth equals the number of search units, which can far exceed what the
    /// call stack of a worker thread allows.
    fn search(&mut self) -> SolverResult<SearchOutcome> {
        let mut stack = match self.open(0)? {
            Opened::Complete => return Ok(SearchOutcome::Solution(std::mem::take(&mut self.table))),
            Opened::LimitReached => return Ok(SearchOutcome::LimitReached),
            Opened::Frame(frame) => vec![frame],
        };

        while let Some(frame) = stack.last_mut() {
            self.table.undo_to(frame.mark);
            let Some(bindings) = self.candidate(frame.unit, frame.cursor) else {
                stack.pop();
                self.statistics.backtracks += 1;
                continue;
            };
            frame.cursor += 1;

            if !self.bind(&bindings)? {
                continue;
            }
            match self.open(stack.len())? {
                Opened::Complete => return Ok(SearchOutcome::Solution(std::mem::take(&mut self.table))),
                Opened::LimitReached => return Ok(SearchOutcome::LimitReached),
                Opened::Frame(next) => stack.push(next),
            }
        }

        Ok(SearchOutcome::Exhausted)
    }

    /// Enter level `depth`, counting it as a search node
    fn open(&mut self, depth: usize) -> SolverResult<Opened> {
        let Some(&unit) = self.units.get(depth) else {
            return Ok(Opened::Complete);
        };

        self.cancellation.check()?;
        if self.node_limit.is_some_and(|limit| self.statistics.nodes >= limit) {
            return Ok(Opened::LimitReached);
        }
        self.statistics.nodes += 1;

        Ok(Opened::Frame(Frame {
            unit,
            cursor: 0,
            mark: self.table.mark(),
        }))
    }

    /// Bindings of the `index`-th candidate of a unit, in domain order
    fn candidate(&self, unit: SearchUnit, index: usize) -> Option<Vec<Value>> {
        let variables = self.network.variables();
        match unit {
            SearchUnit::Variable(variable) => variables
                .variable(variable)
                .domain
                .get(index)
                .map(|&content| vec![Value { variable, content }]),
            SearchUnit::Encapsulated(id) => {
                let encapsulated = variables.encapsulated(id);
                encapsulated.domain.get(index).map(|tuple| encapsulated.bindings(tuple))
            }
        }
    }

    /// Commit `bindings` if each target is unassigned or already holds the value
    ///
    /// Partial commits are left for the caller to undo.
    fn bind(&mut self, bindings: &[Value]) -> SolverResult<bool> {
        for value in bindings {
            match self.table.value(value.variable) {
                Some(existing) if existing != value.content => return Ok(false),
                Some(_) => {}
                None => {
                    if !self.admits(*value)? {
                        return Ok(false);
                    }
                    self.table.assign(*value);
                }
            }
        }
        Ok(true)
    }

    /// Arcs and all-different groups over bound variables accept `value`
    fn admits(&self, value: Value) -> SolverResult<bool> {
        let bound = |id: VariableId| {
            if id == value.variable {
                Some(value.content)
            } else {
                self.table.value(id)
            }
        };

        if let Some(arcs) = self.arcs_by_variable.get(&value.variable) {
            for &index in arcs {
                let arc = &self.network.arcs()[index];
                let left = node_value(&arc.left, &bound);
                let right = node_value(&arc.right, &bound);
                if let (Some(l), Some(r)) = (left, right) {
                    if !arc.connector.admits(l, r)? {
                        return Ok(false);
                    }
                }
            }
        }

        if let Some(groups) = self.groups_by_variable.get(&value.variable) {
            let all_different = self.network.all_different_groups();
            if groups
                .iter()
                .any(|&index| all_different[index].conflicts(value.variable, value.content, |id| self.table.value(id)))
            {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

fn node_value(node: &Node, bound: &impl Fn(VariableId) -> Option<i64>) -> Option<i64> {
    match node {
        Node::Variable(id) => bound(*id),
        Node::Literal(value) => Some(*value),
        Node::Encapsulated { .. } => None,
    }
}

/// Whether a complete assignment satisfies every constraint of the network
pub fn assignment_satisfies(network: &ConstraintNetwork, table: &AssignmentTable) -> SolverResult<bool> {
    Ok(assignment_violations(network, table)?.is_empty())
}

/// Describe every constraint a complete assignment breaks
///
/// Arcs on plain variables are evaluated directly. Encapsulated variables are
/// satisfied when some remaining tuple agrees with the bound sources.
pub fn assignment_violations(network: &ConstraintNetwork, table: &AssignmentTable) -> SolverResult<Vec<String>> {
    let bound = |id: VariableId| table.value(id);
    let mut violations = Vec::new();

    for arc in network.arcs() {
        if let (Some(l), Some(r)) = (node_value(&arc.left, &bound), node_value(&arc.right, &bound)) {
            if !arc.connector.admits(l, r)? {
                violations.push(format!("{} is violated by {} and {}", network.describe_arc(arc), l, r));
            }
        }
    }

    for group in network.all_different_groups() {
        let mut seen: Vec<(i64, VariableId)> = Vec::with_capacity(group.members.len());
        for &member in &group.members {
            let Some(value) = table.value(member) else {
                continue;
            };
            if let Some(&(_, other)) = seen.iter().find(|(v, _)| *v == value) {
                let variables = network.variables();
                violations.push(format!(
                    "all-different: {} and {} both take {}",
                    variables.variable(other).name,
                    variables.variable(member).name,
                    value
                ));
            }
            seen.push((value, member));
        }
    }

    for (_, encapsulated) in network.variables().encapsulated_variables() {
        let supported = encapsulated.domain.iter().any(|tuple| {
            encapsulated
                .bindings(tuple)
                .iter()
                .all(|binding| table.value(binding.variable) == Some(binding.content))
        });
        if !supported {
            violations.push(format!("no admissible pair of {} matches the assignment", encapsulated.name));
        }
    }

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::all_different::AllDifferentGroup;
    use crate::csp::expression::Connector;
    use crate::csp::network::Arc;
    use crate::csp::ternary::{EncapsulatedSelector, EncapsulatedVariablePermutationCalculator};
    use crate::csp::variables::VariableManager;
    use crate::error::SolverError;
    use crate::model::RelationalOperator;

    fn solution(outcome: SearchOutcome) -> AssignmentTable {
        match outcome {
            SearchOutcome::Solution(table) => table,
            other => panic!("expected a solution, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_table_undo() {
        let mut table = AssignmentTable::new();
        assert!(table.assign(Value { variable: VariableId(0), content: 1 }));
        let mark = table.mark();
        assert!(table.assign(Value { variable: VariableId(1), content: 2 }));
        assert!(!table.assign(Value { variable: VariableId(1), content: 3 }));

        table.undo_to(mark);
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(VariableId(0)), Some(1));
        assert!(!table.is_assigned(VariableId(1)));
    }

    #[test]
    fn test_search_respects_arcs() {
        let mut vm = VariableManager::new();
        let x = vm.add_singleton("X", &[3, 2, 1]).unwrap();
        let y = vm.add_singleton("Y", &[1, 2, 3]).unwrap();
        let mut network = ConstraintNetwork::new(vm);
        network.add_arc(Arc::new(Node::Variable(x), Node::Variable(y), Connector::new(RelationalOperator::Less)));

        let mut search = BacktrackingSearch::new(&network, CancellationToken::new());
        let table = solution(search.run().unwrap());
        assert_eq!(table.value(x), Some(2));
        assert_eq!(table.value(y), Some(3));
        assert!(search.statistics().backtracks > 0);
        assert!(assignment_satisfies(&network, &table).unwrap());
    }

    #[test]
    fn test_search_exhausts_all_different() {
        let mut vm = VariableManager::new();
        let ids: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|name| vm.add_singleton(name, &[1, 2]).unwrap())
            .collect();
        let mut network = ConstraintNetwork::new(vm);
        network.add_all_different(AllDifferentGroup::new(ids));

        let mut search = BacktrackingSearch::new(&network, CancellationToken::new());
        assert_eq!(search.run().unwrap(), SearchOutcome::Exhausted);
    }

    #[test]
    fn test_encapsulated_tuples_must_agree_with_bindings() {
        let mut vm = VariableManager::new();
        let l = vm.add_singleton("L", &[1, 2]).unwrap();
        let r = vm.add_singleton("R", &[1, 2]).unwrap();
        let tuples =
            EncapsulatedVariablePermutationCalculator::compute(&[1, 2], None, RelationalOperator::NotEqual, &[1, 2], None)
                .unwrap();
        let e = vm.add_encapsulated([l, r], tuples);
        let mut network = ConstraintNetwork::new(vm);
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

        let mut search = BacktrackingSearch::new(&network, CancellationToken::new());
        let table = solution(search.run().unwrap());
        assert_eq!(table.value(l), Some(1));
        assert_eq!(table.value(r), Some(2));
        assert!(assignment_satisfies(&network, &table).unwrap());
    }

    #[test]
    fn test_node_limit() {
        let mut vm = VariableManager::new();
        vm.add_singleton("a", &[1]).unwrap();
        vm.add_singleton("b", &[1]).unwrap();
        let network = ConstraintNetwork::new(vm);

        let mut search = BacktrackingSearch::new(&network, CancellationToken::new()).with_node_limit(Some(1));
        assert_eq!(search.run().unwrap(), SearchOutcome::LimitReached);
    }

    #[test]
    fn test_cancelled_search() {
        let mut vm = VariableManager::new();
        vm.add_singleton("a", &[1]).unwrap();
        let network = ConstraintNetwork::new(vm);
        let token = CancellationToken::new();
        token.cancel();

        let mut search = BacktrackingSearch::new(&network, token);
        assert_eq!(search.run(), Err(SolverError::Cancelled));
    }

    #[test]
    fn test_deep_search_on_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let mut vm = VariableManager::new();
                vm.add_aggregate("q", 100_000, &[1, 2]).unwrap();
                let elements = vm.aggregate("q").unwrap().elements.clone();
                let mut network = ConstraintNetwork::new(vm);
                for pair in elements.windows(2) {
                    network.add_arc(Arc::new(
                        Node::Variable(pair[0]),
                        Node::Variable(pair[1]),
                        Connector::new(RelationalOperator::NotEqual),
                    ));
                }

                let mut search = BacktrackingSearch::new(&network, CancellationToken::new());
                let table = solution(search.run().unwrap());
                assert_eq!(table.len(), 100_000);
                assert_eq!(table.value(elements[0]), Some(1));
                assert_eq!(table.value(elements[1]), Some(2));
                assert_eq!(table.value(elements[99_999]), Some(2));
                assert_eq!(search.statistics().nodes, 100_000);
                assert!(assignment_satisfies(&network, &table).unwrap());
            })
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_exhausted_search_restores_table() {
        let mut vm = VariableManager::new();
        let a = vm.add_singleton("a", &[1, 2]).unwrap();
        let b = vm.add_singleton("b", &[1, 2]).unwrap();
        let c = vm.add_singleton("c", &[1, 2]).unwrap();
        let mut network = ConstraintNetwork::new(vm);
        network.add_all_different(AllDifferentGroup::new(vec![a, b, c]));

        let mut search = BacktrackingSearch::new(&network, CancellationToken::new());
        assert_eq!(search.run().unwrap(), SearchOutcome::Exhausted);
        // a once, then b and c under each value of a
        assert_eq!(search.statistics().nodes, 5);
        assert_eq!(search.statistics().backtracks, 5);
    }

    #[test]
    fn test_assignment_satisfies_detects_violation() {
        let mut vm = VariableManager::new();
        let x = vm.add_singleton("X", &[1, 2]).unwrap();
        let mut network = ConstraintNetwork::new(vm);
        network.add_arc(Arc::new(Node::Variable(x), Node::Literal(2), Connector::new(RelationalOperator::Equal)));

        let mut table = AssignmentTable::new();
        table.assign(Value { variable: x, content: 1 });
        assert!(!assignment_satisfies(&network, &table).unwrap());
        assert_eq!(
            assignment_violations(&network, &table).unwrap(),
            vec!["X = 2 is violated by 1 and 2".to_string()]
        );
    }
}
