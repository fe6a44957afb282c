//! Solve outcomes and solution snapshots

use crate::csp::{NetworkStatistics, PropagationStatistics, SearchStatistics};
use crate::model::{Diagnostic, DomainValue};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Terminal state of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Success,
    /// Definitively unsatisfiable
    Fail,
    /// Rejected by validation before any network was built
    InvalidModel,
    /// Stopped by the cancellation token, the timeout or the search node limit
    Cancelled,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SolveStatus::Success => "success",
            SolveStatus::Fail => "fail",
            SolveStatus::InvalidModel => "invalid model",
            SolveStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", text)
    }
}

/// A variable name and its model-native value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub variable: String,
    pub value: DomainValue,
}

/// Ordered labels for every singleton and aggregate element of a solved model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionSnapshot {
    pub model: String,
    pub labels: Vec<Label>,
}

impl SolutionSnapshot {
    pub fn new(model: impl Into<String>, labels: Vec<Label>) -> Self {
        Self {
            model: model.into(),
            labels,
        }
    }

    /// Value assigned to a variable, by name
    pub fn value(&self, variable: &str) -> Option<&DomainValue> {
        self.labels
            .iter()
            .find(|label| label.variable == variable)
            .map(|label| &label.value)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Create from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Save to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json().context("Failed to serialize solution")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write solution file: {}", path.display()))?;
        Ok(())
    }

    /// Load from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read solution file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse solution file: {}", path.display()))
    }
}

/// How the snapshot of a successful solve was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    FirstRemaining,
    Backtracking,
    /// First-remaining values violated a constraint and search took over
    FallbackToBacktracking,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolveStatistics {
    pub network: Option<NetworkStatistics>,
    pub propagation: PropagationStatistics,
    pub search: Option<SearchStatistics>,
    pub extraction: Option<ExtractionPath>,
}

impl fmt::Display for SolveStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(network) = &self.network {
            write!(f, "{}", network)?;
        }
        write!(f, "{}", self.propagation)?;
        if let Some(search) = &self.search {
            write!(f, "{}", search)?;
        }
        if let Some(extraction) = self.extraction {
            writeln!(f, "Extraction: {:?}", extraction)?;
        }
        Ok(())
    }
}

/// Everything a solve reports back
#[derive(Debug, Clone, Serialize)]
pub struct SolveResult {
    pub model: String,
    pub status: SolveStatus,
    pub elapsed: Duration,
    pub snapshot: Option<SolutionSnapshot>,
    pub diagnostics: Vec<Diagnostic>,
    pub statistics: SolveStatistics,
}

impl SolveResult {
    pub fn is_success(&self) -> bool {
        self.status == SolveStatus::Success
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
