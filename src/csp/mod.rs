//! Finite-domain constraint engine: network, propagation and search

pub mod domain;
pub mod variables;
pub mod expression;
pub mod ternary;
pub mod all_different;
pub mod network;
pub mod repeater;
pub mod builder;
pub mod cancel;
pub mod revision;
pub mod backtrack;

pub use domain::Domain;
pub use variables::{VariableId, EncapsulatedId, Value, ValueSet, VariableManager, VariableStatistics};
pub use network::{Arc, ConstraintNetwork, Node, NetworkStatistics};
pub use builder::{NetworkBuilder, ModelSolverMap, MappedVariable};
pub use cancel::CancellationToken;
pub use revision::{ArcRevisionEngine, PropagationOutcome, PropagationStatistics};
pub use backtrack::{AssignmentTable, BacktrackingSearch, SearchOutcome, SearchStatistics, assignment_satisfies, assignment_violations};
