//! Constraint graph: nodes, arcs and the network that owns them

use super::all_different::AllDifferentGroup;
use super::expression::Connector;
use super::ternary::EncapsulatedSelector;
use super::variables::{EncapsulatedId, VariableId, VariableManager, VariableStatistics};
use serde::Serialize;
use std::fmt;

/// One operand of a binary relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Variable(VariableId),
    Encapsulated {
        variable: EncapsulatedId,
        selector: EncapsulatedSelector,
    },
    Literal(i64),
}

impl Node {
    /// Literals are fixed and never revised
    pub fn is_revisable(&self) -> bool {
        !matches!(self, Node::Literal(_))
    }
}

/// A binary relation between two nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arc {
    pub left: Node,
    pub right: Node,
    pub connector: Connector,
}

impl Arc {
    /// Arc from `left` to `right` under `connector`
    pub fn new(left: Node, right: Node, connector: Connector) -> Self {
        Self { left, right, connector }
    }
}

/// All arcs, variables and all-different groups of one solve
#[derive(Debug, Default)]
pub struct ConstraintNetwork {
    variables: VariableManager,
    arcs: Vec<Arc>,
    all_different: Vec<AllDifferentGroup>,
}

impl ConstraintNetwork {
    /// Network over `variables` with no constraints yet
    pub fn new(variables: VariableManager) -> Self {
        Self {
            variables,
            arcs: Vec::new(),
            all_different: Vec::new(),
        }
    }

    /// Append an arc; arcs are revised in insertion order
    pub fn add_arc(&mut self, arc: Arc) {
        self.arcs.push(arc);
    }

    /// Register an all-different group
    pub fn add_all_different(&mut self, group: AllDifferentGroup) {
        self.all_different.push(group);
    }

    /// Every arc in insertion order
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    /// Every all-different group in insertion order
    pub fn all_different_groups(&self) -> &[AllDifferentGroup] {
        &self.all_different
    }

    /// The variable arena
    pub fn variables(&self) -> &VariableManager {
        &self.variables
    }

    /// Mutable variable arena, used while building and pruning
    pub fn variables_mut(&mut self) -> &mut VariableManager {
        &mut self.variables
    }

    /// No variable (plain or encapsulated) has an empty domain
    pub fn is_solved(&self) -> bool {
        !self.variables.has_empty_domain()
    }

    /// Current candidate values of a node, index-aligned with its domain
    ///
    /// Encapsulated nodes project each tuple onto the selected position.
    pub fn node_values(&self, node: &Node) -> Vec<i64> {
        match node {
            Node::Variable(id) => self.variables.variable(*id).domain.possible_values(),
            Node::Encapsulated { variable, selector } => self
                .variables
                .encapsulated(*variable)
                .domain
                .iter()
                .map(|tuple| selector.select(tuple))
                .collect(),
            Node::Literal(value) => vec![*value],
        }
    }

    /// Drop every domain entry of `node` whose flag in `supported` is false
    ///
    /// Returns the number of entries removed.
    pub fn retain_supported(&mut self, node: &Node, supported: &[bool]) -> usize {
        match node {
            Node::Variable(id) => {
                let domain = &mut self.variables.variable_mut(*id).domain;
                let doomed: Vec<i64> = domain
                    .iter()
                    .zip(supported)
                    .filter(|&(_, &keep)| !keep)
                    .map(|(value, _)| *value)
                    .collect();
                domain.remove_all(&doomed)
            }
            Node::Encapsulated { variable, .. } => {
                let domain = &mut self.variables.encapsulated_mut(*variable).domain;
                let doomed: Vec<_> = domain
                    .iter()
                    .zip(supported)
                    .filter(|&(_, &keep)| !keep)
                    .map(|(tuple, _)| *tuple)
                    .collect();
                domain.remove_all(&doomed)
            }
            Node::Literal(_) => 0,
        }
    }

    /// Whether a node's domain is empty (literals never are)
    pub fn node_is_empty(&self, node: &Node) -> bool {
        match node {
            Node::Variable(id) => self.variables.variable(*id).domain.is_empty(),
            Node::Encapsulated { variable, .. } => self.variables.encapsulated(*variable).domain.is_empty(),
            Node::Literal(_) => false,
        }
    }

    /// Domain of a plain variable by name, mostly useful for inspection
    pub fn domain_of(&self, name: &str) -> Option<Vec<i64>> {
        self.variables
            .lookup(name)
            .ok()
            .map(|id| self.variables.variable(id).domain.possible_values())
    }

    /// Human-readable name of a node for logs and diagnostics
    pub fn node_name(&self, node: &Node) -> String {
        match node {
            Node::Variable(id) => self.variables.variable(*id).name.clone(),
            Node::Encapsulated { variable, selector } => {
                format!("{}.{}", self.variables.encapsulated(*variable).name, selector.position())
            }
            Node::Literal(value) => value.to_string(),
        }
    }

    /// Human-readable form of an arc, used in log output
    pub fn describe_arc(&self, arc: &Arc) -> String {
        format!(
            "{} {} {}",
            self.node_name(&arc.left),
            arc.connector,
            self.node_name(&arc.right)
        )
    }

    /// Get statistics about the network
    pub fn statistics(&self) -> NetworkStatistics {
        NetworkStatistics {
            variables: self.variables.statistics(),
            arcs: self.arcs.len(),
            all_different_groups: self.all_different.len(),
        }
    }
}

/// Size of a built network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkStatistics {
    pub variables: VariableStatistics,
    pub arcs: usize,
    pub all_different_groups: usize,
}

impl fmt::Display for NetworkStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variables)?;
        writeln!(f, "Network Statistics:")?;
        writeln!(f, "  Arcs: {}", self.arcs)?;
        writeln!(f, "  All-different groups: {}", self.all_different_groups)?;
        Ok(())
    }
}
