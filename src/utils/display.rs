//! Display and output formatting utilities

use crate::config::OutputFormat;
use crate::solver::{SolutionSnapshot, SolveResult, SolveStatus};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Format solve results for display
pub struct SolutionFormatter;

/// One line of the batch summary file
#[derive(Debug, Clone, Serialize)]
struct ResultSummary<'a> {
    file: &'a str,
    model: &'a str,
    status: SolveStatus,
    elapsed_ms: u128,
    labels: usize,
}

impl SolutionFormatter {
    /// Format a single result for console output
    pub fn format_result(result: &SolveResult, show_statistics: bool) -> String {
        let mut output = String::new();

        output.push_str(&format!("=== {} ===\n", result.model));
        output.push_str(&format!("Status: {}\n", ColorOutput::status(result.status)));
        output.push_str(&format!("Solve Time: {:.3}s\n", result.elapsed.as_secs_f64()));

        if !result.diagnostics.is_empty() {
            output.push_str("Diagnostics:\n");
            for diagnostic in &result.diagnostics {
                output.push_str(&format!("  - {}\n", diagnostic));
            }
        }

        if let Some(snapshot) = &result.snapshot {
            output.push('\n');
            output.push_str(&Self::format_labels(snapshot));
        }

        if show_statistics {
            output.push('\n');
            output.push_str(&result.statistics.to_string());
        }

        output
    }

    /// Labels aligned in a `name = value` column
    pub fn format_labels(snapshot: &SolutionSnapshot) -> String {
        let width = snapshot
            .labels
            .iter()
            .map(|label| label.variable.len())
            .max()
            .unwrap_or(0);

        let mut output = String::new();
        for label in &snapshot.labels {
            output.push_str(&format!("{:width$} = {}\n", label.variable, label.value, width = width));
        }
        output
    }

    /// Format multiple results as a summary table
    pub fn format_summary<'r>(results: impl IntoIterator<Item = &'r SolveResult>) -> String {
        let mut output = String::new();

        output.push_str("Results Summary:\n");
        output.push_str("Model                | Status        | Time(ms) | Labels\n");
        output.push_str("---------------------|---------------|----------|-------\n");

        for result in results {
            output.push_str(&format!(
                "{:20} | {:13} | {:8} | {}\n",
                truncate(&result.model, 20),
                result.status.to_string(),
                result.elapsed.as_millis(),
                result.snapshot.as_ref().map_or(0, |s| s.len())
            ));
        }

        output
    }

    /// Save results to files based on output format
    ///
    /// Each result is paired with the model file it came from; output files are
    /// named after that file's stem, never after the model's own `name`.
    /// Successful solves also get a `<stem>.solution.json` snapshot that
    /// `verify` can read back.
    pub fn save_results<P: AsRef<Path>>(
        results: &[(PathBuf, SolveResult)],
        output_dir: P,
        format: OutputFormat,
    ) -> Result<()> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

        let stems = output_stems(results.iter().map(|(source, _)| source.as_path()));

        for ((_, result), stem) in results.iter().zip(&stems) {
            match format {
                OutputFormat::Text => {
                    let path = output_dir.join(format!("{}.txt", stem));
                    std::fs::write(&path, Self::format_result(result, true))
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
                OutputFormat::Json => {
                    let path = output_dir.join(format!("{}.result.json", stem));
                    let json = result.to_json().context("Failed to serialize result")?;
                    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
                }
            }

            if let Some(snapshot) = &result.snapshot {
                snapshot.save_to_file(output_dir.join(format!("{}.solution.json", stem)))?;
            }
        }

        if format == OutputFormat::Json {
            let summaries: Vec<_> = results
                .iter()
                .zip(&stems)
                .map(|((_, r), stem)| ResultSummary {
                    file: stem,
                    model: &r.model,
                    status: r.status,
                    elapsed_ms: r.elapsed.as_millis(),
                    labels: r.snapshot.as_ref().map_or(0, |s| s.len()),
                })
                .collect();
            let summary_json = serde_json::to_string_pretty(&summaries)?;
            std::fs::write(output_dir.join("results_summary.json"), summary_json)?;
        }

        Ok(())
    }
}

/// File-system safe, pairwise distinct output stems for a batch of model files
fn output_stems<'p>(sources: impl IntoIterator<Item = &'p Path>) -> Vec<String> {
    let mut used = HashSet::new();
    sources
        .into_iter()
        .map(|source| {
            let raw = source
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut base: String = raw
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect();
            if base.is_empty() {
                base.push_str("model");
            }

            let mut stem = base.clone();
            let mut suffix = 2;
            while !used.insert(stem.clone()) {
                stem = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            stem
        })
        .collect()
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Color output utilities
pub struct ColorOutput;

impl ColorOutput {
    /// Format text with color (if terminal supports it)
    pub fn colored(text: &str, color: Color) -> String {
        if Self::supports_color() {
            format!("\x1b[{}m{}\x1b[0m", color.code(), text)
        } else {
            text.to_string()
        }
    }

    /// Check if terminal supports color
    fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() &&
        (std::env::var("TERM").unwrap_or_default() != "dumb")
    }

    pub fn success(text: &str) -> String {
        Self::colored(text, Color::Green)
    }

    pub fn error(text: &str) -> String {
        Self::colored(text, Color::Red)
    }

    pub fn warning(text: &str) -> String {
        Self::colored(text, Color::Yellow)
    }

    pub fn info(text: &str) -> String {
        Self::colored(text, Color::Blue)
    }

    /// Status word colored by outcome
    pub fn status(status: SolveStatus) -> String {
        let text = status.to_string();
        match status {
            SolveStatus::Success => Self::success(&text),
            SolveStatus::Fail => Self::warning(&text),
            SolveStatus::InvalidModel => Self::error(&text),
            SolveStatus::Cancelled => Self::colored(&text, Color::Magenta),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
            Color::Magenta => 35,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::model::example_models;
    use crate::solver::CspProblem;
    use tempfile::tempdir;

    fn solved(name: &str) -> SolveResult {
        let model = example_models()
            .into_iter()
            .find(|(stem, _)| *stem == name)
            .map(|(_, model)| model)
            .unwrap();
        CspProblem::new(model, Settings::default()).solve().unwrap()
    }

    #[test]
    fn test_label_formatting() {
        let result = solved("less_than");
        let labels = SolutionFormatter::format_labels(result.snapshot.as_ref().unwrap());
        assert_eq!(labels, "X = 1\nY = 2\n");

        let text = SolutionFormatter::format_result(&result, true);
        assert!(text.contains("=== less_than ==="));
        assert!(text.contains("Propagation Statistics"));
    }

    #[test]
    fn test_summary_table() {
        let summary = SolutionFormatter::format_summary(&[solved("less_than"), solved("offset")]);
        assert!(summary.contains("less_than"));
        assert!(summary.contains("offset"));
        assert_eq!(summary.lines().count(), 5);
    }

    #[test]
    fn test_save_results_writes_snapshots() {
        let dir = tempdir().unwrap();
        let results = vec![(PathBuf::from("models/map_colouring.yaml"), solved("map_colouring"))];

        SolutionFormatter::save_results(&results, dir.path(), OutputFormat::Json).unwrap();
        assert!(dir.path().join("map_colouring.result.json").exists());
        assert!(dir.path().join("map_colouring.solution.json").exists());
        assert!(dir.path().join("results_summary.json").exists());

        let snapshot = SolutionSnapshot::load_from_file(dir.path().join("map_colouring.solution.json")).unwrap();
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn test_same_model_name_in_two_files() {
        let dir = tempdir().unwrap();
        let mut renamed = solved("offset");
        renamed.model = "../escape/less_than".into();
        let results = vec![
            (PathBuf::from("a/less_than.yaml"), solved("less_than")),
            (PathBuf::from("b/less_than.yaml"), renamed),
        ];

        SolutionFormatter::save_results(&results, dir.path(), OutputFormat::Text).unwrap();
        assert!(dir.path().join("less_than.txt").exists());
        assert!(dir.path().join("less_than-2.txt").exists());
        assert!(!dir.path().join("../escape").exists());

        let first = SolutionSnapshot::load_from_file(dir.path().join("less_than.solution.json")).unwrap();
        let second = SolutionSnapshot::load_from_file(dir.path().join("less_than-2.solution.json")).unwrap();
        assert_eq!(first.model, "less_than");
        assert_eq!(second.model, "offset");
    }

    #[test]
    fn test_output_stems_are_sanitized() {
        let stems = output_stems([
            Path::new("dir/my model.yaml"),
            Path::new("other/my model.json"),
            Path::new(".."),
        ]);
        assert_eq!(stems, vec!["my_model", "my_model-2", "model"]);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("abcdef", 3), "abc");
    }

    #[test]
    fn test_color_output() {
        let colored = ColorOutput::colored("test", Color::Red);
        assert!(colored.contains("test"));

        let status = ColorOutput::status(SolveStatus::Success);
        assert!(status.contains("success"));
    }
}
