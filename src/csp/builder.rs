//! Translation of a validated model into a constraint network

use super::all_different::AllDifferentGroup;
use super::expression::Connector;
use super::network::{Arc, ConstraintNetwork, Node};
use super::repeater::ConstraintRepeater;
use super::ternary::{EncapsulatedSelector, EncapsulatedVariablePermutationCalculator};
use super::variables::{VariableId, VariableManager};
use crate::error::{SolverError, SolverResult, UnsupportedConstruct};
use crate::model::{
    element_name, ArithmeticOperator, ConstraintExpression, CspModel, DomainEvaluator, ExpressionSide,
    ModelConstraint, Operand, ValueMapper, VariableKind,
};
use indexmap::IndexSet;
use log::debug;
use std::collections::HashMap;

/// A model-visible variable and the solver variable standing for it
#[derive(Debug, Clone)]
pub struct MappedVariable {
    pub name: String,
    pub variable: VariableId,
    pub mapper: ValueMapper,
}

/// Name-keyed correspondence between model variables and solver handles
///
/// Entries keep model order: singletons as declared, aggregate elements by index.
#[derive(Debug, Clone, Default)]
pub struct ModelSolverMap {
    entries: Vec<MappedVariable>,
    by_name: HashMap<String, usize>,
}

impl ModelSolverMap {
    fn register(&mut self, name: String, variable: VariableId, mapper: ValueMapper) {
        self.by_name.insert(name.clone(), self.entries.len());
        self.entries.push(MappedVariable { name, variable, mapper });
    }

    /// Look up a singleton or element by its solver name
    pub fn get(&self, name: &str) -> Option<&MappedVariable> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    /// Mapped variables in label order
    pub fn entries(&self) -> &[MappedVariable] {
        &self.entries
    }

    /// Number of mapped variables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the network for one solve
pub struct NetworkBuilder<'a> {
    model: &'a CspModel,
}

impl<'a> NetworkBuilder<'a> {
    /// Builder for one validated model
    pub fn new(model: &'a CspModel) -> Self {
        Self { model }
    }

    /// Register every variable, then translate every constraint into arcs or groups
    pub fn build(&self) -> SolverResult<(ConstraintNetwork, ModelSolverMap)> {
        let (variables, map) = self.register_variables()?;
        let mut network = ConstraintNetwork::new(variables);

        for constraint in &self.model.constraints {
            match constraint {
                ModelConstraint::Expression(expression) => {
                    add_expression(&mut network, expression)?;
                }
                ModelConstraint::Repeated { aggregate, expression } => {
                    let instances = {
                        let variables = network.variables();
                        let repeater = ConstraintRepeater::new(|name: &str| variables.aggregate(name).ok().map(|a| a.size()));
                        repeater.expand(aggregate, expression)?
                    };
                    debug!(
                        "Repeated constraint over `{}` expanded into {} relations",
                        aggregate,
                        instances.len()
                    );
                    for instance in &instances {
                        add_expression(&mut network, instance)?;
                    }
                }
                ModelConstraint::Ternary(expression) => {
                    add_ternary(&mut network, expression)?;
                }
                ModelConstraint::AllDifferent(names) => {
                    let group = all_different_group(network.variables(), names)?;
                    network.add_all_different(group);
                }
            }
        }

        debug!(
            "Built network for `{}`: {} variables, {} encapsulated, {} arcs",
            self.model.name,
            network.variables().variable_count(),
            network.variables().encapsulated_count(),
            network.arcs().len()
        );
        Ok((network, map))
    }

    fn register_variables(&self) -> SolverResult<(VariableManager, ModelSolverMap)> {
        let mut evaluator = DomainEvaluator::new(self.model);
        let mut variables = VariableManager::new();
        let mut map = ModelSolverMap::default();

        for variable in &self.model.variables {
            let domain = evaluator
                .evaluate(&variable.domain)
                .map_err(|e| SolverError::InvalidDomain {
                    variable: variable.name.clone(),
                    reason: format!("{:#}", e),
                })?;

            match variable.kind {
                VariableKind::Singleton => {
                    let id = variables.add_singleton(&variable.name, &domain.values)?;
                    map.register(variable.name.clone(), id, domain.mapper);
                }
                VariableKind::Aggregate { size } => {
                    variables.add_aggregate(&variable.name, size, &domain.values)?;
                    for index in 0..size {
                        let name = element_name(&variable.name, index);
                        let id = variables.lookup(&name)?;
                        map.register(name, id, domain.mapper.clone());
                    }
                }
            }
        }

        Ok((variables, map))
    }
}

/// One arc for a binary relation
fn add_expression(network: &mut ConstraintNetwork, expression: &ConstraintExpression) -> SolverResult<()> {
    check_infix(&expression.left)?;
    check_infix(&expression.right)?;

    let left = resolve_node(network.variables(), &expression.left.operand)?;
    let right = resolve_node(network.variables(), &expression.right.operand)?;
    if let (Node::Literal(_), Node::Literal(_)) = (left, right) {
        return Err(UnsupportedConstruct::Expression(format!(
            "relation between two literals: {} {} {}",
            expression.left.operand, expression.operator, expression.right.operand
        ))
        .into());
    }

    let connector = Connector::with_infixes(expression.operator, expression.left.infix, expression.right.infix);
    network.add_arc(Arc::new(left, right, connector));
    Ok(())
}

/// Encapsulated pair variable plus its two equality channels
fn add_ternary(network: &mut ConstraintNetwork, expression: &ConstraintExpression) -> SolverResult<()> {
    check_infix(&expression.left)?;
    check_infix(&expression.right)?;

    let left = resolve_variable(network.variables(), &expression.left.operand)?;
    let right = resolve_variable(network.variables(), &expression.right.operand)?;

    let tuples = {
        let variables = network.variables();
        EncapsulatedVariablePermutationCalculator::compute(
            &variables.variable(left).domain.possible_values(),
            expression.left.infix.as_ref(),
            expression.operator,
            &variables.variable(right).domain.possible_values(),
            expression.right.infix.as_ref(),
        )?
    };

    let encapsulated = network.variables_mut().add_encapsulated([left, right], tuples);
    network.add_arc(Arc::new(
        Node::Variable(left),
        Node::Encapsulated {
            variable: encapsulated,
            selector: EncapsulatedSelector::First,
        },
        Connector::equality(),
    ));
    network.add_arc(Arc::new(
        Node::Encapsulated {
            variable: encapsulated,
            selector: EncapsulatedSelector::Second,
        },
        Node::Variable(right),
        Connector::equality(),
    ));
    Ok(())
}

fn all_different_group(variables: &VariableManager, names: &[String]) -> SolverResult<AllDifferentGroup> {
    let mut members: IndexSet<VariableId> = IndexSet::new();
    for name in names {
        match variables.aggregate(name) {
            Ok(aggregate) => members.extend(aggregate.elements.iter().copied()),
            Err(_) => {
                members.insert(variables.lookup(name)?);
            }
        }
    }
    Ok(AllDifferentGroup::new(members.into_iter().collect()))
}

fn check_infix(side: &ExpressionSide) -> SolverResult<()> {
    match side.infix {
        Some(infix) if !matches!(infix.operator, ArithmeticOperator::Add | ArithmeticOperator::Subtract) => {
            Err(UnsupportedConstruct::ArithmeticOperator(infix.operator).into())
        }
        _ => Ok(()),
    }
}

fn resolve_node(variables: &VariableManager, operand: &Operand) -> SolverResult<Node> {
    match operand {
        Operand::Literal(value) => Ok(Node::Literal(*value)),
        other => resolve_variable(variables, other).map(Node::Variable),
    }
}

fn resolve_variable(variables: &VariableManager, operand: &Operand) -> SolverResult<VariableId> {
    match operand {
        Operand::Variable(name) => variables.lookup(name),
        Operand::Element { aggregate, index } => {
            let index = i64::try_from(*index).map_err(|_| SolverError::IndexOutOfRange {
                aggregate: aggregate.clone(),
                index: i64::MAX,
            })?;
            variables.element(aggregate, index)
        }
        Operand::Relative { .. } => Err(UnsupportedConstruct::RelativeOperand(operand.to_string()).into()),
        Operand::Literal(_) => Err(UnsupportedConstruct::Expression(format!(
            "literal `{}` where a variable is required",
            operand
        ))
        .into()),
    }
}
