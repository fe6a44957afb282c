//! Configuration settings for the constraint solver

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub extraction: ExtractionStrategy,
    pub timeout_seconds: Option<u64>,
    pub max_search_nodes: Option<u64>,
    pub verify_solutions: bool,
}

/// How a snapshot is read off a propagated network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// First remaining value of every domain, falling back to search if it violates a constraint
    FirstRemaining,
    #[default]
    Backtracking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub output_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionStrategy::Backtracking,
            timeout_seconds: Some(300),
            max_search_nodes: None,
            verify_solutions: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            output_directory: None,
        }
    }
}

impl SolverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a YAML file
    pub fn to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .context("Failed to serialize settings")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.solver.timeout_seconds == Some(0) {
            anyhow::bail!("Timeout must be positive when set");
        }

        if self.solver.max_search_nodes == Some(0) {
            anyhow::bail!("Search node limit must be positive when set");
        }

        if let Some(dir) = &self.output.output_directory {
            if dir.is_file() {
                anyhow::bail!("Output directory is a file: {}", dir.display());
            }
        }

        Ok(())
    }

    /// Merge settings with command line overrides
    pub fn merge_with_cli(&mut self, cli_overrides: &CliOverrides) {
        if let Some(extraction) = cli_overrides.extraction {
            self.solver.extraction = extraction;
        }
        if let Some(timeout) = cli_overrides.timeout_seconds {
            self.solver.timeout_seconds = Some(timeout);
        }
        if let Some(nodes) = cli_overrides.max_search_nodes {
            self.solver.max_search_nodes = Some(nodes);
        }
        if let Some(format) = cli_overrides.format {
            self.output.format = format;
        }
        if let Some(ref output_dir) = cli_overrides.output_dir {
            self.output.output_directory = Some(output_dir.clone());
        }
        if cli_overrides.verbose {
            self.logging.verbose = true;
        }
    }
}

/// Command line overrides for settings
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub extraction: Option<ExtractionStrategy>,
    pub timeout_seconds: Option<u64>,
    pub max_search_nodes: Option<u64>,
    pub format: Option<OutputFormat>,
    pub output_dir: Option<PathBuf>,
    pub verbose: bool,
}
