//! Structural validation of authored models

use super::evaluation::{DomainEvaluator, MAX_DOMAIN_SIZE};
use super::types::{ConstraintExpression, CspModel, ModelConstraint, Operand, VariableKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single problem found in a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Where the problem was found, e.g. `variable x` or `constraint #2`
    pub location: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Outcome of validating a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    fn push(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            location: location.into(),
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return writeln!(f, "Model is valid");
        }
        writeln!(f, "Model has {} problem(s):", self.diagnostics.len())?;
        for diagnostic in &self.diagnostics {
            writeln!(f, "  - {}", diagnostic)?;
        }
        Ok(())
    }
}

/// Checks a model before any network is built
pub struct ModelValidator;

impl ModelValidator {
    /// Validate the model, collecting every problem found
    pub fn validate(model: &CspModel) -> ValidationReport {
        let mut report = ValidationReport::default();

        if model.variables.is_empty() {
            report.push("model", "Model declares no variables");
        }

        let kinds = Self::check_variables(model, &mut report);

        for (position, constraint) in model.constraints.iter().enumerate() {
            let location = format!("constraint #{}", position + 1);
            Self::check_constraint(constraint, &kinds, &location, &mut report);
        }

        report
    }

    fn check_variables(model: &CspModel, report: &mut ValidationReport) -> HashMap<String, VariableKind> {
        let mut kinds = HashMap::new();
        let mut solver_names = HashSet::new();
        let mut evaluator = DomainEvaluator::new(model);

        let mut shared_names = HashSet::new();
        for shared in &model.shared_domains {
            if !shared_names.insert(shared.name.as_str()) {
                report.push(format!("shared domain {}", shared.name), "Duplicate shared domain name");
            }
        }

        for variable in &model.variables {
            let location = format!("variable {}", variable.name);

            if variable.name.is_empty() {
                report.push(location.clone(), "Variable name is empty");
            }
            if kinds.insert(variable.name.clone(), variable.kind).is_some() {
                report.push(location.clone(), "Duplicate variable name");
                continue;
            }
            match variable.kind {
                VariableKind::Aggregate { size: 0 } => {
                    report.push(location.clone(), "Aggregate size must be positive");
                }
                VariableKind::Aggregate { size } if size as u64 > MAX_DOMAIN_SIZE => {
                    report.push(
                        location.clone(),
                        format!("Aggregate size {} exceeds the limit of {}", size, MAX_DOMAIN_SIZE),
                    );
                }
                _ => {
                    for name in variable.solver_names() {
                        if !solver_names.insert(name.clone()) {
                            report.push(location.clone(), format!("Solver name `{}` collides with another variable", name));
                        }
                    }
                }
            }

            if let Err(e) = evaluator.evaluate(&variable.domain) {
                report.push(location, format!("Invalid domain: {}", e));
            }
        }

        kinds
    }

    fn check_constraint(
        constraint: &ModelConstraint,
        kinds: &HashMap<String, VariableKind>,
        location: &str,
        report: &mut ValidationReport,
    ) {
        match constraint {
            ModelConstraint::Expression(expression) => {
                Self::check_expression(expression, kinds, None, location, report);
            }
            ModelConstraint::Ternary(expression) => {
                Self::check_expression(expression, kinds, None, location, report);
                for operand in [&expression.left.operand, &expression.right.operand] {
                    if matches!(operand, Operand::Literal(_)) {
                        report.push(location, "Ternary constraints relate two variables, not literals");
                    }
                }
            }
            ModelConstraint::Repeated { aggregate, expression } => match kinds.get(aggregate) {
                Some(VariableKind::Aggregate { size }) => {
                    Self::check_expression(expression, kinds, Some(*size), location, report);
                }
                Some(VariableKind::Singleton) => {
                    report.push(location, format!("Repeated constraint over `{}` which is not an aggregate", aggregate));
                }
                None => {
                    report.push(location, format!("Unknown aggregate `{}`", aggregate));
                }
            },
            ModelConstraint::AllDifferent(variables) => {
                let mut members = 0;
                for name in variables {
                    match kinds.get(name) {
                        Some(VariableKind::Singleton) => members += 1,
                        Some(VariableKind::Aggregate { size }) => members += size,
                        None => report.push(location, format!("Unknown variable `{}`", name)),
                    }
                }
                if members < 2 {
                    report.push(location, "All-different needs at least two variables");
                }
            }
        }
    }

    fn check_expression(
        expression: &ConstraintExpression,
        kinds: &HashMap<String, VariableKind>,
        repeat_size: Option<usize>,
        location: &str,
        report: &mut ValidationReport,
    ) {
        for side in [&expression.left, &expression.right] {
            match &side.operand {
                Operand::Variable(name) => match kinds.get(name) {
                    Some(VariableKind::Singleton) => {}
                    Some(VariableKind::Aggregate { .. }) => {
                        report.push(location, format!("Aggregate `{}` used without an index", name));
                    }
                    None => report.push(location, format!("Unknown variable `{}`", name)),
                },
                Operand::Element { aggregate, index } => match kinds.get(aggregate) {
                    Some(VariableKind::Aggregate { size }) if index < size => {}
                    Some(VariableKind::Aggregate { size }) => {
                        report.push(location, format!("Index {} out of range for `{}` (size {})", index, aggregate, size));
                    }
                    Some(VariableKind::Singleton) => {
                        report.push(location, format!("`{}` is not an aggregate", aggregate));
                    }
                    None => report.push(location, format!("Unknown aggregate `{}`", aggregate)),
                },
                Operand::Relative { aggregate, .. } => {
                    if repeat_size.is_none() {
                        report.push(location, "Loop-relative operand outside a repeated constraint");
                    }
                    if !matches!(kinds.get(aggregate), Some(VariableKind::Aggregate { .. })) {
                        report.push(location, format!("Unknown aggregate `{}`", aggregate));
                    }
                }
                Operand::Literal(_) => {}
            }
        }

        if matches!(expression.left.operand, Operand::Literal(_))
            && matches!(expression.right.operand, Operand::Literal(_))
        {
            report.push(location, "Constraint relates two literals");
        }
    }
}
