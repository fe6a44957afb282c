//! Constraint model definition, domain evaluation and validation

pub mod types;
pub mod evaluation;
pub mod validation;
pub mod io;

pub use types::*;
pub use evaluation::{DomainEvaluator, EvaluatedDomain, ValueMapper};
pub use validation::{Diagnostic, ModelValidator, ValidationReport};
pub use io::{load_model_from_file, save_model_to_file, create_example_models, example_models};
