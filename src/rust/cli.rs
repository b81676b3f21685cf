use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

use crate::pipeline::search::DEFAULT_FOLDS;
use crate::runtime::RuntimeConfig;

pub const USAGE: &str = "Please provide the filepath of the disaster messages database \
as the first argument and the filepath of the file to save the model to as the second \
argument. \n\nExample: train_classifier ../data/DisasterResponse.db classifier.bin";

/// Exit status for a malformed command line
pub const USAGE_EXIT_CODE: i32 = 2;

#[derive(Parser, Debug, Clone)]
#[command(name = "train_classifier", author, version, about = "Train the disaster message classifier", long_about = None, after_help = USAGE)]
pub struct Cli {
    /// SQLite database holding the `messages` table
    pub database_path: PathBuf,

    /// Where to write the trained model
    pub model_path: PathBuf,

    /// Fraction of messages held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_size: f64,

    /// Cross-validation folds per grid candidate
    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    pub folds: usize,

    /// Seed for the split and the forests; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for fitting (0 = one per core)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Directory for the downloaded language resources
    #[arg(long)]
    pub resources_dir: Option<PathBuf>,

    /// Force a fresh download of the language resources
    #[arg(short, long)]
    pub fresh: bool,
}

/// Outcome of parsing the command line
#[derive(Debug)]
pub enum ParsedArgs {
    Run(Cli),
    /// `--help` or `--version`; clap prints and exits
    Info(clap::Error),
    /// Wrong or missing arguments
    Usage(clap::Error),
}

pub fn parse_args<I, T>(args: I) -> ParsedArgs
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => ParsedArgs::Run(cli),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => ParsedArgs::Info(e),
        Err(e) => ParsedArgs::Usage(e),
    }
}

/// Settings for one training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub database_path: PathBuf,
    pub model_path: PathBuf,
    pub test_size: f64,
    pub folds: usize,
    pub seed: Option<u64>,
    pub runtime: RuntimeConfig,
}

impl TrainOptions {
    pub fn new(database_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            model_path: model_path.into(),
            test_size: 0.2,
            folds: DEFAULT_FOLDS,
            seed: None,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl From<&Cli> for TrainOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            database_path: cli.database_path.clone(),
            model_path: cli.model_path.clone(),
            test_size: cli.test_size,
            folds: cli.folds,
            seed: cli.seed,
            runtime: RuntimeConfig::with_threads(cli.threads),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let ParsedArgs::Run(cli) = parse_args(["train_classifier", "data.db", "model.bin"]) else {
            panic!("expected arguments to parse");
        };
        let options = TrainOptions::from(&cli);
        assert_eq!(options, TrainOptions::new("data.db", "model.bin"));
        assert!(!cli.fresh);
    }

    #[test]
    fn test_options() {
        let parsed = parse_args([
            "train_classifier",
            "data.db",
            "model.bin",
            "--test-size",
            "0.3",
            "--folds",
            "3",
            "--seed",
            "42",
            "--threads",
            "2",
            "--fresh",
        ]);
        let ParsedArgs::Run(cli) = parsed else {
            panic!("expected arguments to parse");
        };
        let options = TrainOptions::from(&cli);
        assert_eq!(options.test_size, 0.3);
        assert_eq!(options.folds, 3);
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.runtime.threads, 2);
        assert!(cli.fresh);
    }

    #[test]
    fn test_wrong_argument_count_is_usage_error() {
        assert!(matches!(parse_args(["train_classifier"]), ParsedArgs::Usage(_)));
        assert!(matches!(parse_args(["train_classifier", "data.db"]), ParsedArgs::Usage(_)));
        assert!(matches!(
            parse_args(["train_classifier", "a.db", "b.bin", "c"]),
            ParsedArgs::Usage(_)
        ));
    }

    #[test]
    fn test_help_is_not_usage_error() {
        assert!(matches!(parse_args(["train_classifier", "--help"]), ParsedArgs::Info(_)));
    }
}
