//! Main CLI application for the constraint solver

use anyhow::{Context, Result};
use arc_csp_solver::{
    config::{CliOverrides, ExtractionStrategy, OutputFormat, Settings},
    model::{create_example_models, load_model_from_file, ModelValidator},
    solve_files,
    solver::{SolutionSnapshot, SolutionValidator, SolveResult},
    utils::{ColorOutput, SolutionFormatter},
};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "arc_csp_solver")]
#[command(about = "Finite-domain arc-consistency constraint solver")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one or more model files
    Solve {
        /// Model files (YAML or JSON)
        #[arg(required = true)]
        models: Vec<PathBuf>,

        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Snapshot extraction strategy (overrides config)
        #[arg(short, long, value_enum)]
        extraction: Option<ExtractionArg>,

        /// Timeout per model in seconds (overrides config)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Maximum backtracking nodes (overrides config)
        #[arg(long)]
        max_nodes: Option<u64>,

        /// Output format for saved results (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print network, propagation and search statistics
        #[arg(long)]
        stats: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a model without solving it
    Check {
        /// Model file
        model: PathBuf,
    },

    /// Check a saved solution against its model
    Verify {
        /// Model file
        #[arg(short, long)]
        model: PathBuf,

        /// Solution snapshot (JSON)
        #[arg(short, long)]
        solution: PathBuf,
    },

    /// Create example configuration and model files
    Setup {
        /// Directory to create files in
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExtractionArg {
    FirstRemaining,
    Backtracking,
}

impl From<ExtractionArg> for ExtractionStrategy {
    fn from(arg: ExtractionArg) -> Self {
        match arg {
            ExtractionArg::FirstRemaining => ExtractionStrategy::FirstRemaining,
            ExtractionArg::Backtracking => ExtractionStrategy::Backtracking,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            models, config, extraction, timeout, max_nodes,
            format, output, stats, verbose
        } => {
            let overrides = CliOverrides {
                extraction: extraction.map(Into::into),
                timeout_seconds: timeout,
                max_search_nodes: max_nodes,
                format: format.map(Into::into),
                output_dir: output,
                verbose,
            };
            solve_command(models, config, overrides, stats)
        }
        Commands::Check { model } => {
            configure_logging(false);
            check_command(model)
        }
        Commands::Verify { model, solution } => {
            configure_logging(false);
            verify_command(model, solution)
        }
        Commands::Setup { directory, force } => {
            configure_logging(false);
            setup_command(directory, force)
        }
    }
}

fn configure_logging(verbose: bool) {
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level_filter)
        .target(env_logger::Target::Stdout)
        .init();
    info!("Logging successfully configured");
}

fn load_settings(config_path: &PathBuf) -> Result<Settings> {
    if config_path.exists() {
        Settings::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))
    } else {
        println!("{}", ColorOutput::warning(&format!(
            "Config file {} not found, using defaults", config_path.display()
        )));
        Ok(Settings::default())
    }
}

fn solve_command(
    models: Vec<PathBuf>,
    config_path: PathBuf,
    overrides: CliOverrides,
    show_statistics: bool,
) -> Result<()> {
    let mut settings = load_settings(&config_path)?;
    settings.merge_with_cli(&overrides);
    configure_logging(settings.logging.verbose);

    settings.validate()
        .context("Configuration validation failed")?;

    println!("{}", ColorOutput::info(&format!("Solving {} model(s)...", models.len())));
    let start_time = Instant::now();
    let outcomes = solve_files(&models, &settings);
    let total_time = start_time.elapsed();

    let mut results: Vec<(PathBuf, SolveResult)> = Vec::with_capacity(outcomes.len());
    for (path, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                println!("\n{}", SolutionFormatter::format_result(&result, show_statistics));
                results.push((path, result));
            }
            Err(e) => {
                println!("\n{}", ColorOutput::error(&format!("{}: {:#}", path.display(), e)));
            }
        }
    }

    if results.len() > 1 {
        println!("\n{}", SolutionFormatter::format_summary(results.iter().map(|(_, r)| r)));
    }

    let solved = results.iter().filter(|(_, r)| r.is_success()).count();
    println!("{}", ColorOutput::success(&format!(
        "Solved {}/{} model(s) in {:.3}s",
        solved,
        models.len(),
        total_time.as_secs_f64()
    )));

    if let Some(output_dir) = &settings.output.output_directory {
        SolutionFormatter::save_results(&results, output_dir, settings.output.format)
            .context("Failed to save results")?;
        println!("{}", ColorOutput::success(&format!(
            "Results saved to {}", output_dir.display()
        )));
    }

    Ok(())
}

fn check_command(model_path: PathBuf) -> Result<()> {
    let model = load_model_from_file(&model_path)?;
    let report = ModelValidator::validate(&model);

    print!("{}", report);
    if report.is_valid() {
        println!("{}", ColorOutput::success(&format!(
            "Model `{}` declares {} variable(s) and {} constraint(s)",
            model.name,
            model.variables.len(),
            model.constraints.len()
        )));
    } else {
        println!("{}", ColorOutput::error("Model is invalid"));
    }

    Ok(())
}

fn verify_command(model_path: PathBuf, solution_path: PathBuf) -> Result<()> {
    let model = load_model_from_file(&model_path)?;
    let snapshot = SolutionSnapshot::load_from_file(&solution_path)?;

    let result = SolutionValidator::validate(&model, &snapshot)
        .context("Verification failed")?;
    print!("{}", result);

    if result.is_valid {
        println!("{}", ColorOutput::success("Solution is valid!"));
    } else {
        println!("{}", ColorOutput::error("Solution is invalid"));
    }

    Ok(())
}

fn setup_command(directory: PathBuf, force: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Setting up project structure..."));

    let config_dir = directory.join("config");
    let models_dir = directory.join("models");
    let output_dir = directory.join("output/solutions");

    for dir in [&config_dir, &models_dir, &output_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let config_path = config_dir.join("default.yaml");
    if !config_path.exists() || force {
        let mut default_settings = Settings::default();
        default_settings.output.output_directory = Some(PathBuf::from("output/solutions"));
        default_settings.to_file(&config_path)
            .context("Failed to create default configuration")?;
        println!("Created: {}", config_path.display());
    } else {
        println!("Skipped: {} (already exists)", config_path.display());
    }

    create_example_models(&models_dir)
        .context("Failed to create example models")?;
    println!("Created example models in: {}", models_dir.display());

    println!("\n{}", ColorOutput::success("Setup complete!"));
    println!("\nNext steps:");
    println!("1. Edit configuration in {}", config_path.display());
    println!("2. Write models into {}", models_dir.display());
    println!("3. Run: cargo run -- solve models/*.yaml");

    Ok(())
}
