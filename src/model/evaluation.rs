//! Evaluation of structured domain expressions into integer domains

use super::types::{CspModel, DomainExpression, DomainValue};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Largest number of values a single domain expression may produce
pub const MAX_DOMAIN_SIZE: u64 = 1 << 20;

/// Bidirectional mapping between solver integers and model-native values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueMapper {
    entries: Vec<(i64, DomainValue)>,
}

impl ValueMapper {
    /// Identity mapping for purely integer domains
    pub fn identity(values: &[i64]) -> Self {
        Self {
            entries: values.iter().map(|&v| (v, DomainValue::Int(v))).collect(),
        }
    }

    /// Map a solver integer back to the model value
    pub fn to_model(&self, solver_value: i64) -> Option<&DomainValue> {
        self.entries
            .iter()
            .find(|(value, _)| *value == solver_value)
            .map(|(_, model_value)| model_value)
    }

    /// Map a model value to its solver integer
    pub fn to_solver(&self, model_value: &DomainValue) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate == model_value)
            .map(|(value, _)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fully enumerated domain plus its value mapping
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedDomain {
    pub values: Vec<i64>,
    pub mapper: ValueMapper,
}

/// Resolves domain expressions against a model's shared domains
pub struct DomainEvaluator<'a> {
    model: &'a CspModel,
    cache: HashMap<String, EvaluatedDomain>,
}

impl<'a> DomainEvaluator<'a> {
    pub fn new(model: &'a CspModel) -> Self {
        Self {
            model,
            cache: HashMap::new(),
        }
    }

    /// Evaluate a domain expression
    pub fn evaluate(&mut self, expression: &DomainExpression) -> Result<EvaluatedDomain> {
        self.evaluate_with_depth(expression, 0)
    }

    fn evaluate_with_depth(&mut self, expression: &DomainExpression, depth: usize) -> Result<EvaluatedDomain> {
        // shared domains referencing each other in a cycle
        if depth > self.model.shared_domains.len() {
            anyhow::bail!("Shared domain references form a cycle");
        }

        match expression {
            DomainExpression::Range { from, to } => {
                if from > to {
                    anyhow::bail!("Range {}..={} is empty", from, to);
                }
                let size = i128::from(*to) - i128::from(*from) + 1;
                if size > i128::from(MAX_DOMAIN_SIZE) {
                    anyhow::bail!(
                        "Range {}..={} has {} values, more than the limit of {}",
                        from, to, size, MAX_DOMAIN_SIZE
                    );
                }
                let values: Vec<i64> = (*from..=*to).collect();
                let mapper = ValueMapper::identity(&values);
                Ok(EvaluatedDomain { values, mapper })
            }
            DomainExpression::List(items) => Self::evaluate_list(items),
            DomainExpression::Shared(name) => {
                if let Some(cached) = self.cache.get(name) {
                    return Ok(cached.clone());
                }
                let model = self.model;
                let shared = model
                    .shared_domain(name)
                    .ok_or_else(|| anyhow::anyhow!("Unknown shared domain `{}`", name))?;
                let evaluated = self.evaluate_with_depth(&shared.domain, depth + 1)?;
                self.cache.insert(name.clone(), evaluated.clone());
                Ok(evaluated)
            }
        }
    }

    fn evaluate_list(items: &[DomainValue]) -> Result<EvaluatedDomain> {
        if items.is_empty() {
            anyhow::bail!("Domain list is empty");
        }

        let all_ints = items.iter().all(|v| matches!(v, DomainValue::Int(_)));
        let all_text = items.iter().all(|v| matches!(v, DomainValue::Text(_)));
        if !all_ints && !all_text {
            anyhow::bail!("Domain list mixes integer and text values");
        }

        let mut entries: Vec<(i64, DomainValue)> = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if entries.iter().any(|(_, existing)| existing == item) {
                anyhow::bail!("Domain list contains duplicate value `{}`", item);
            }
            let solver_value = match item {
                DomainValue::Int(value) => *value,
                DomainValue::Text(_) => position as i64,
            };
            entries.push((solver_value, item.clone()));
        }

        Ok(EvaluatedDomain {
            values: entries.iter().map(|(value, _)| *value).collect(),
            mapper: ValueMapper { entries },
        })
    }
}
