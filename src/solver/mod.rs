//! Top-level solving: problem state machine, results and solution checking

pub mod problem;
pub mod result;
pub mod validator;

pub use problem::{CspProblem, SolveState};
pub use result::{ExtractionPath, Label, SolutionSnapshot, SolveResult, SolveStatistics, SolveStatus};
pub use validator::{SolutionValidator, ValidationResult};
