//! Stepwise CLI - Command-line interface for the Stepwise engine
//!
//! Commands:
//! - replay: Replay a session transcript into a snapshot
//! - check: Compare two answers and report which phase decided
//! - classify: Classify an attempt history into a behavior profile

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use stepwise::equivalence::{check_equivalence_for_label, EquivalencePhase};
use stepwise::{
    evaluate_transcript_with_config, normalize, Attempt, BehaviorClassifier, EngineConfig,
    StepLabel, StepwiseError, STEPWISE_VERSION,
};
use tracing_subscriber::EnvFilter;

/// Stepwise - step-answer validation and learner-behavior classification
#[derive(Parser)]
#[command(name = "stepwise")]
#[command(version = STEPWISE_VERSION)]
#[command(about = "Validate multi-step math answers and classify learner behavior", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a session transcript and print the final snapshot
    Replay {
        /// Transcript file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Engine configuration JSON (overrides the transcript's own)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check whether two answers are equivalent
    Check {
        /// Learner answer
        user: String,

        /// Expected answer
        expected: String,

        /// Step label deciding how answers are compared
        #[arg(long, default_value = "math")]
        label: LabelArg,
    },

    /// Classify a JSON array of attempts
    Classify {
        /// Attempts file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Engine configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LabelArg {
    Substitution,
    Simplification,
    Final,
    Math,
    Text,
}

impl From<LabelArg> for StepLabel {
    fn from(label: LabelArg) -> Self {
        match label {
            LabelArg::Substitution => StepLabel::Substitution,
            LabelArg::Simplification => StepLabel::Simplification,
            LabelArg::Final => StepLabel::Final,
            LabelArg::Math => StepLabel::Math,
            LabelArg::Text => StepLabel::Text,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by `STEPWISE_LOG` (default `warn`)
fn init_logging() {
    let filter = EnvFilter::try_from_env("STEPWISE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), StepwiseCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            config,
        } => cmd_replay(&input, &output, config.as_deref()),

        Commands::Check {
            user,
            expected,
            label,
        } => cmd_check(&user, &expected, label.into()),

        Commands::Classify { input, config } => cmd_classify(&input, config.as_deref()),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
) -> Result<(), StepwiseCliError> {
    let transcript = read_input(input)?;
    if transcript.trim().is_empty() {
        return Err(StepwiseCliError::EmptyInput);
    }
    let config = config.map(load_config).transpose()?;

    let snapshot = evaluate_transcript_with_config(&transcript, config)?;
    write_output(output, &snapshot)
}

#[derive(serde::Serialize)]
struct CheckReport {
    equivalent: bool,
    phase: EquivalencePhase,
    label: StepLabel,
    normalized_user: String,
    normalized_expected: String,
}

fn cmd_check(user: &str, expected: &str, label: StepLabel) -> Result<(), StepwiseCliError> {
    let report = check_equivalence_for_label(user, expected, label);
    let check = CheckReport {
        equivalent: report.equivalent,
        phase: report.phase,
        label,
        normalized_user: normalize(user),
        normalized_expected: normalize(expected),
    };
    println!("{}", serde_json::to_string_pretty(&check)?);
    Ok(())
}

fn cmd_classify(input: &Path, config: Option<&Path>) -> Result<(), StepwiseCliError> {
    let data = read_input(input)?;
    if data.trim().is_empty() {
        return Err(StepwiseCliError::EmptyInput);
    }
    let attempts: Vec<Attempt> = serde_json::from_str(&data)?;
    let config = config.map(load_config).transpose()?.unwrap_or_default();

    let profile = BehaviorClassifier::classify(&attempts, &config.thresholds);
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

fn load_config(path: &Path) -> Result<EngineConfig, StepwiseCliError> {
    let json = fs::read_to_string(path)?;
    Ok(EngineConfig::from_json(&json)?)
}

fn read_input(path: &Path) -> Result<String, StepwiseCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, data: &str) -> Result<(), StepwiseCliError> {
    if path.to_string_lossy() == "-" {
        println!("{data}");
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum StepwiseCliError {
    Io(io::Error),
    Engine(StepwiseError),
    Json(serde_json::Error),
    EmptyInput,
}

impl From<io::Error> for StepwiseCliError {
    fn from(e: io::Error) -> Self {
        StepwiseCliError::Io(e)
    }
}

impl From<StepwiseError> for StepwiseCliError {
    fn from(e: StepwiseError) -> Self {
        StepwiseCliError::Engine(e)
    }
}

impl From<serde_json::Error> for StepwiseCliError {
    fn from(e: serde_json::Error) -> Self {
        StepwiseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StepwiseCliError> for CliError {
    fn from(e: StepwiseCliError) -> Self {
        match e {
            StepwiseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StepwiseCliError::Engine(e) => {
                let (code, hint) = match &e {
                    StepwiseError::ConfigError(_) => {
                        ("CONFIG_ERROR", "Check the configuration file fields")
                    }
                    StepwiseError::EmptyProblem(_) => {
                        ("EMPTY_PROBLEM", "Declare at least one step in the transcript")
                    }
                    StepwiseError::EncodingError(_) => ("ENCODING_ERROR", "Report this as a bug"),
                    StepwiseError::ParseError(_) | StepwiseError::JsonError(_) => (
                        "PARSE_ERROR",
                        "Ensure input has problem, steps and commits fields",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            StepwiseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            StepwiseCliError::EmptyInput => CliError {
                code: "EMPTY_INPUT".to_string(),
                message: "No input provided".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}
