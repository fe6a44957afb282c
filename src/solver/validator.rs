//! Independent check of a solution snapshot against its model

use super::result::SolutionSnapshot;
use crate::csp::{assignment_violations, AssignmentTable, NetworkBuilder, Value};
use crate::model::{CspModel, ModelValidator};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt;

/// Result of checking a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub violations: Vec<String>,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid {
            return writeln!(f, "Solution is valid");
        }
        writeln!(f, "Solution has {} violation(s):", self.violations.len())?;
        for violation in &self.violations {
            writeln!(f, "  - {}", violation)?;
        }
        Ok(())
    }
}

/// Rebuilds the model's network and evaluates every constraint on the snapshot
pub struct SolutionValidator;

impl SolutionValidator {
    /// Check every label and constraint, collecting all violations
    ///
    /// Fails only when the model itself is invalid or cannot be built.
    pub fn validate(model: &CspModel, snapshot: &SolutionSnapshot) -> Result<ValidationResult> {
        let report = ModelValidator::validate(model);
        if !report.is_valid() {
            anyhow::bail!("Cannot verify against an invalid model:\n{}", report);
        }

        let (network, map) = NetworkBuilder::new(model)
            .build()
            .with_context(|| format!("Failed to build network for model `{}`", model.name))?;

        let mut violations = Vec::new();
        let mut table = AssignmentTable::new();
        let mut labelled = HashSet::new();

        for label in &snapshot.labels {
            if !labelled.insert(label.variable.as_str()) {
                violations.push(format!("variable {} is labelled more than once", label.variable));
                continue;
            }
            let Some(mapped) = map.get(&label.variable) else {
                violations.push(format!("unknown variable {}", label.variable));
                continue;
            };
            let Some(content) = mapped.mapper.to_solver(&label.value) else {
                violations.push(format!("value {} is outside the domain of {}", label.value, label.variable));
                continue;
            };
            table.assign(Value {
                variable: mapped.variable,
                content,
            });
        }

        for mapped in map.entries() {
            if !labelled.contains(mapped.name.as_str()) {
                violations.push(format!("variable {} has no label", mapped.name));
            }
        }

        violations.extend(assignment_violations(&network, &table)?);

        Ok(ValidationResult {
            is_valid: violations.is_empty(),
            violations,
        })
    }
}
