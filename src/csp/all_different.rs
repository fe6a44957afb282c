//! All-different primitive: forward checking plus a pigeonhole test

use super::variables::{VariableId, VariableManager};
use std::collections::{HashMap, HashSet};

/// Variables that must take pairwise distinct values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllDifferentGroup {
    pub members: Vec<VariableId>,
}

/// Result of revising one group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllDifferentRevision {
    pub removed: usize,
    pub consistent: bool,
}

impl AllDifferentGroup {
    /// Group over distinct member handles
    pub fn new(members: Vec<VariableId>) -> Self {
        Self { members }
    }

    /// Whether `variable` is a member
    pub fn contains(&self, variable: VariableId) -> bool {
        self.members.contains(&variable)
    }

    /// Remove values fixed in one member from the others and test the pigeonhole bound
    pub fn revise(&self, variables: &mut VariableManager) -> AllDifferentRevision {
        let mut removed = 0;

        // Repeat until no new singleton appears, since a removal can fix another member
        loop {
            let fixed: Vec<(VariableId, i64)> = self
                .members
                .iter()
                .filter_map(|&id| {
                    let domain = &variables.variable(id).domain;
                    if domain.is_singleton() {
                        domain.first().map(|&value| (id, value))
                    } else {
                        None
                    }
                })
                .collect();

            let mut seen: HashMap<i64, VariableId> = HashMap::new();
            for &(id, value) in &fixed {
                if seen.insert(value, id).is_some() {
                    return AllDifferentRevision {
                        removed,
                        consistent: false,
                    };
                }
            }

            let mut changed = 0;
            for &member in &self.members {
                let doomed: Vec<i64> = fixed
                    .iter()
                    .filter(|(owner, _)| *owner != member)
                    .map(|(_, value)| *value)
                    .collect();
                changed += variables.variable_mut(member).domain.remove_all(&doomed);
            }

            removed += changed;
            if changed == 0 {
                break;
            }
        }

        let union: HashSet<i64> = self
            .members
            .iter()
            .flat_map(|&id| variables.variable(id).domain.iter().copied())
            .collect();
        let any_empty = self
            .members
            .iter()
            .any(|&id| variables.variable(id).domain.is_empty());

        AllDifferentRevision {
            removed,
            consistent: !any_empty && union.len() >= self.members.len(),
        }
    }

    /// Whether binding `variable` to `value` clashes with an existing binding in the group
    pub fn conflicts(&self, variable: VariableId, value: i64, bound: impl Fn(VariableId) -> Option<i64>) -> bool {
        self.contains(variable)
            && self
                .members
                .iter()
                .any(|&other| other != variable && bound(other) == Some(value))
    }
}
