//! Configuration management for the constraint solver

pub mod settings;

pub use settings::{
    Settings, SolverConfig, OutputConfig, LoggingConfig, ExtractionStrategy, OutputFormat, CliOverrides
};
