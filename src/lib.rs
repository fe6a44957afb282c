//! Finite-domain Constraint Satisfaction Solver
//!
//! This library solves integer-domain constraint models by arc-consistency
//! propagation, binarizing ternary relations through encapsulated pair
//! variables and completing assignments with backtracking search.

pub mod config;
pub mod error;
pub mod model;
pub mod csp;
pub mod solver;
pub mod utils;

pub use config::Settings;
pub use error::{SolverError, SolverResult, UnsupportedConstruct};
pub use model::CspModel;
pub use solver::{CspProblem, SolutionSnapshot, SolveResult, SolveStatus};

use anyhow::{Context, Result};
use log::debug;
use rayon::prelude::*;
use solver::SolutionValidator;
use std::path::{Path, PathBuf};

/// Main entry point for solving a single model
///
/// When `verify_solutions` is set, a successful snapshot is re-checked
/// against the model before it is returned.
pub fn solve_model(model: CspModel, settings: &Settings) -> Result<SolveResult> {
    let problem = CspProblem::new(model, settings.clone());
    let result = problem
        .solve()
        .with_context(|| format!("Failed to solve model `{}`", problem.model().name))?;

    if settings.solver.verify_solutions {
        if let Some(snapshot) = &result.snapshot {
            let check = SolutionValidator::validate(problem.model(), snapshot)?;
            if !check.is_valid {
                anyhow::bail!("Solution for `{}` failed verification:\n{}", result.model, check);
            }
            debug!("Solution for `{}` verified", result.model);
        }
    }

    Ok(result)
}

/// Load and solve one model file
pub fn solve_file<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<SolveResult> {
    let path = path.as_ref();
    let model = model::load_model_from_file(path)?;
    solve_model(model, settings).with_context(|| format!("While solving {}", path.display()))
}

/// Solve several model files in parallel, one solve per rayon worker
///
/// Results keep the order of `paths`.
pub fn solve_files(paths: &[PathBuf], settings: &Settings) -> Vec<(PathBuf, Result<SolveResult>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), solve_file(path, settings)))
        .collect()
}
