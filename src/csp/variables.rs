//! Solver-side variables stored in an arena addressed by stable handles

use super::domain::Domain;
use crate::error::{SolverError, SolverResult};
use crate::model::element_name;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Handle of a singleton or aggregate-element variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub usize);

/// Handle of an encapsulated (hidden pair) variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncapsulatedId(pub usize);

/// Ordered pair of integers: one admissible joint assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueSet([i64; 2]);

impl ValueSet {
    /// Joint assignment of the first and second source variables
    pub fn pair(first: i64, second: i64) -> Self {
        Self([first, second])
    }

    /// Value at `position`, if the position exists
    pub fn get(&self, position: usize) -> Option<i64> {
        self.0.get(position).copied()
    }

    /// Both values, in source order
    pub fn values(&self) -> &[i64; 2] {
        &self.0
    }
}

impl fmt::Display for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// A single binding of a variable to an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    pub variable: VariableId,
    pub content: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableOrigin {
    Singleton,
    AggregateElement { aggregate: usize, index: usize },
}

#[derive(Debug, Clone)]
pub struct SolverVariable {
    pub name: String,
    pub domain: Domain<i64>,
    pub origin: VariableOrigin,
}

/// Fixed-size array of element variables
#[derive(Debug, Clone)]
pub struct AggregateVariable {
    pub name: String,
    pub elements: Vec<VariableId>,
}

impl AggregateVariable {
    /// Number of element variables
    pub fn size(&self) -> usize {
        self.elements.len()
    }
}

/// Hidden variable whose domain is the set of admissible pairs of two real variables
#[derive(Debug, Clone)]
pub struct EncapsulatedVariable {
    pub name: String,
    pub sources: [VariableId; 2],
    pub domain: Domain<ValueSet>,
}

impl EncapsulatedVariable {
    /// The bindings a tuple would commit, one per source variable
    pub fn bindings(&self, tuple: &ValueSet) -> Vec<Value> {
        self.sources
            .iter()
            .zip(tuple.values())
            .map(|(&variable, &content)| Value { variable, content })
            .collect()
    }
}

/// Owns every variable of one network
#[derive(Debug, Default)]
pub struct VariableManager {
    variables: Vec<SolverVariable>,
    aggregates: Vec<AggregateVariable>,
    encapsulated: Vec<EncapsulatedVariable>,
    by_name: HashMap<String, VariableId>,
    aggregate_by_name: HashMap<String, usize>,
}

impl VariableManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a singleton variable
    pub fn add_singleton(&mut self, name: &str, values: &[i64]) -> SolverResult<VariableId> {
        self.push_variable(name.to_string(), values, VariableOrigin::Singleton)
    }

    /// Register an aggregate and its `size` element variables
    pub fn add_aggregate(&mut self, name: &str, size: usize, values: &[i64]) -> SolverResult<usize> {
        if self.aggregate_by_name.contains_key(name) || self.by_name.contains_key(name) {
            return Err(SolverError::DuplicateVariable(name.to_string()));
        }

        let aggregate = self.aggregates.len();
        let mut elements = Vec::with_capacity(size);
        for index in 0..size {
            let origin = VariableOrigin::AggregateElement { aggregate, index };
            elements.push(self.push_variable(element_name(name, index), values, origin)?);
        }

        self.aggregates.push(AggregateVariable {
            name: name.to_string(),
            elements,
        });
        self.aggregate_by_name.insert(name.to_string(), aggregate);
        Ok(aggregate)
    }

    /// Register an encapsulated variable over two real variables
    pub fn add_encapsulated(&mut self, sources: [VariableId; 2], tuples: Vec<ValueSet>) -> EncapsulatedId {
        let id = EncapsulatedId(self.encapsulated.len());
        let name = format!(
            "<{}|{}>",
            self.variables[sources[0].0].name, self.variables[sources[1].0].name
        );
        self.encapsulated.push(EncapsulatedVariable {
            name,
            sources,
            domain: Domain::new(tuples),
        });
        id
    }

    fn push_variable(&mut self, name: String, values: &[i64], origin: VariableOrigin) -> SolverResult<VariableId> {
        if self.by_name.contains_key(&name) {
            return Err(SolverError::DuplicateVariable(name));
        }

        let id = VariableId(self.variables.len());
        self.by_name.insert(name.clone(), id);
        self.variables.push(SolverVariable {
            name,
            domain: Domain::new(values.iter().copied()),
            origin,
        });
        Ok(id)
    }

    /// Resolve a singleton or element name to its handle
    pub fn lookup(&self, name: &str) -> SolverResult<VariableId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SolverError::UnknownVariable(name.to_string()))
    }

    /// Resolve an aggregate by name
    pub fn aggregate(&self, name: &str) -> SolverResult<&AggregateVariable> {
        self.aggregate_by_name
            .get(name)
            .map(|&index| &self.aggregates[index])
            .ok_or_else(|| SolverError::UnknownVariable(name.to_string()))
    }

    /// Element `index` of an aggregate
    pub fn element(&self, aggregate: &str, index: i64) -> SolverResult<VariableId> {
        let variable = self.aggregate(aggregate)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| variable.elements.get(i).copied())
            .ok_or_else(|| SolverError::IndexOutOfRange {
                aggregate: aggregate.to_string(),
                index,
            })
    }

    /// Plain variable behind a handle
    pub fn variable(&self, id: VariableId) -> &SolverVariable {
        &self.variables[id.0]
    }

    /// Mutable access to a plain variable, used when pruning its domain
    pub fn variable_mut(&mut self, id: VariableId) -> &mut SolverVariable {
        &mut self.variables[id.0]
    }

    /// Encapsulated variable behind a handle
    pub fn encapsulated(&self, id: EncapsulatedId) -> &EncapsulatedVariable {
        &self.encapsulated[id.0]
    }

    /// Mutable access to an encapsulated variable
    pub fn encapsulated_mut(&mut self, id: EncapsulatedId) -> &mut EncapsulatedVariable {
        &mut self.encapsulated[id.0]
    }

    /// All plain variables in registration order
    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &SolverVariable)> {
        self.variables.iter().enumerate().map(|(i, v)| (VariableId(i), v))
    }

    /// All encapsulated variables in creation order
    pub fn encapsulated_variables(&self) -> impl Iterator<Item = (EncapsulatedId, &EncapsulatedVariable)> {
        self.encapsulated.iter().enumerate().map(|(i, v)| (EncapsulatedId(i), v))
    }

    /// Registered aggregates in model order
    pub fn aggregates(&self) -> &[AggregateVariable] {
        &self.aggregates
    }

    /// Number of plain variables, aggregate elements included
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of encapsulated variables
    pub fn encapsulated_count(&self) -> usize {
        self.encapsulated.len()
    }

    /// Whether any plain or encapsulated domain has been emptied
    pub fn has_empty_domain(&self) -> bool {
        self.variables.iter().any(|v| v.domain.is_empty())
            || self.encapsulated.iter().any(|e| e.domain.is_empty())
    }

    /// Get statistics about variable usage
    pub fn statistics(&self) -> VariableStatistics {
        let element_variables = self
            .variables
            .iter()
            .filter(|v| matches!(v.origin, VariableOrigin::AggregateElement { .. }))
            .count();

        VariableStatistics {
            total_variables: self.variables.len(),
            singleton_variables: self.variables.len() - element_variables,
            element_variables,
            aggregate_variables: self.aggregates.len(),
            encapsulated_variables: self.encapsulated.len(),
        }
    }
}

/// Statistics about variable usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableStatistics {
    pub total_variables: usize,
    pub singleton_variables: usize,
    pub element_variables: usize,
    pub aggregate_variables: usize,
    pub encapsulated_variables: usize,
}

impl fmt::Display for VariableStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Variable Statistics:")?;
        writeln!(f, "  Total variables: {}", self.total_variables)?;
        writeln!(f, "  Singleton variables: {}", self.singleton_variables)?;
        writeln!(f, "  Aggregate elements: {} (in {} aggregates)", self.element_variables, self.aggregate_variables)?;
        writeln!(f, "  Encapsulated variables: {}", self.encapsulated_variables)?;
        Ok(())
    }
}
