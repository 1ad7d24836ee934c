//! CLI entry point for training and querying the water-logging classifier.

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use waterlog_learning::{
    ArtifactLayout, ForestConfig, ImportanceTable, LearningError, Pipeline, PipelineConfig,
    PredictionResult, TrainedModel, TrainingResult, write_report,
};
use waterlog_processing::{DatasetSchema, PreprocessingError, load_dataset};

/// Demonstration record answered after training unless `--no-query` is set.
const DEMO_QUERY: &str = r#"{"Water_Table":"High","urbanization":"Good","Elevation":5,"precipitation":30,"runoff_coefficient":0.6,"drainage":25}"#;

#[derive(Parser, Debug)]
#[command(
    name = "waterlog",
    version,
    about = "Random forest water-logging classifier",
    long_about = "Train a random forest on flood/runoff records and answer single-record queries.\n\n\
                  EXAMPLES:\n  \
                  # Train on the default workbook and write artifacts to the current directory\n  \
                  waterlog train\n\n  \
                  # Train on a CSV export, writing artifacts and a CSV report elsewhere\n  \
                  waterlog train --input data.csv --output-dir models/ --report models/probs.csv\n\n  \
                  # Query saved artifacts\n  \
                  waterlog predict --artifacts models/ --query '{\"Water_Table\":\"Low\", ...}'"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and results)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train, evaluate and persist the classifier (default)
    Train(TrainArgs),
    /// Answer one query from previously saved artifacts
    Predict(PredictArgs),
}

#[derive(Parser, Debug)]
struct TrainArgs {
    /// Workbook (.xlsx/.xlsm/.xls/.ods) or CSV file with the training data
    #[arg(short, long, default_value = "combined_manual (5).xlsx")]
    input: PathBuf,

    /// Sheet to read from a workbook
    #[arg(long, default_value = "Sheet1")]
    sheet: String,

    /// Directory the model, encoder and scaler artifacts are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Test-probability report; `.csv` writes CSV, anything else XLSX
    #[arg(long, default_value = "test_probabilities_rf.xlsx")]
    report: PathBuf,

    /// Number of trees in the forest
    #[arg(long, default_value = "200")]
    trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value = "10")]
    max_depth: usize,

    /// Minimum samples required to split a node
    #[arg(long, default_value = "5")]
    min_samples_split: usize,

    /// Minimum samples required in each leaf
    #[arg(long, default_value = "4")]
    min_samples_leaf: usize,

    /// Seed for the train/test split and the forest
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// JSON record to predict after training
    #[arg(long, default_value = DEMO_QUERY)]
    query: String,

    /// Skip the query after training
    #[arg(long)]
    no_query: bool,

    /// Output JSON to stdout instead of the human-readable summary
    ///
    /// Disables all progress logs; only outputs the training result.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Directory holding the saved artifacts
    #[arg(short, long, default_value = ".")]
    artifacts: PathBuf,

    /// JSON record to predict
    #[arg(long, default_value = DEMO_QUERY)]
    query: String,

    /// Output the prediction as JSON
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so stdout only
/// carries JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Train(TrainArgs::parse_from(["train"])));

    let json = match &command {
        Command::Train(args) => args.json,
        Command::Predict(args) => args.json,
    };
    init_logging(&cli.log_level, cli.quiet, json);

    let outcome = match &command {
        Command::Train(args) => run_train(args, cli.quiet),
        Command::Predict(args) => run_predict(args),
    };

    if let Err(e) = &outcome {
        error!("[{}] {:#}", error_code(e), e);
    }
    outcome
}

/// Error code of the library error behind `err`, if any.
fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<LearningError>() {
        e.error_code()
    } else if let Some(e) = err.downcast_ref::<PreprocessingError>() {
        e.error_code()
    } else {
        "CLI_ERROR"
    }
}

fn run_train(args: &TrainArgs, quiet: bool) -> Result<()> {
    let query = if args.no_query {
        None
    } else {
        Some(parse_query(&args.query)?)
    };

    let forest = ForestConfig::builder()
        .n_estimators(args.trees)
        .max_depth(Some(args.max_depth))
        .min_samples_split(args.min_samples_split)
        .min_samples_leaf(args.min_samples_leaf)
        .build()?;
    let config = PipelineConfig::builder()
        .schema(DatasetSchema::default())
        .forest(forest)
        .test_size(args.test_size)
        .random_seed(args.seed)
        .build()?;

    info!("Loading dataset from: {}", args.input.display());
    let df = load_dataset(&args.input, &args.sheet, &config.schema)?;
    info!("Dataset loaded: {} rows x {} columns", df.height(), df.width());

    let mut builder = Pipeline::builder().config(config);
    if !quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.as_str(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    let (result, model) = pipeline.train(&df)?;

    let layout = ArtifactLayout::new(&args.output_dir);
    let saved = model.save(&layout)?;
    let report_path = write_report(&result.test_probabilities, &args.report)?;
    let prediction = query
        .as_ref()
        .map(|record| model.predict(record))
        .transpose()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_metrics(&result);
    print_saved(&saved, &model);
    println!("Test set probabilities saved to {}", report_path.display());
    if let Some(prediction) = &prediction {
        print_prediction(prediction);
    }
    println!();
    print!("{}", ImportanceTable(&result.feature_importance));

    Ok(())
}

fn run_predict(args: &PredictArgs) -> Result<()> {
    let model = TrainedModel::load(&args.artifacts)?;
    let prediction = model.predict_json(&args.query)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        print_prediction(&prediction);
    }
    Ok(())
}

fn parse_query(text: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| anyhow!("Query is not valid JSON: {}", e))?;
    if !value.is_object() {
        return Err(anyhow!("Query must be a JSON object, got: {}", text));
    }
    Ok(value)
}

// The functions below use `println!` intentionally; these lines are
// the program's output, not diagnostics.
fn print_metrics(result: &TrainingResult) {
    let metrics = &result.metrics;
    println!("Performance Metrics for Random Forest Classifier:");
    println!("Accuracy: {:.2}", metrics.accuracy);
    println!("Precision: {:.2}", metrics.precision);
    println!("Recall: {:.2}", metrics.recall);
    println!("F1-Score: {:.2}", metrics.f1_score);
    println!("Classification Report:");
    println!("{}", result.report());
}

fn print_saved(saved: &[PathBuf], model: &TrainedModel) {
    let encoders = model.preprocessor().encoders();
    for (idx, path) in saved.iter().enumerate() {
        let name = display_name(path);
        if idx == 0 {
            println!("Random Forest model saved as '{}'", name);
        } else if let Some(encoder) = encoders.get(idx - 1) {
            println!(
                "Label encoder for {} saved as '{}'",
                encoder.feature(),
                name
            );
        } else {
            println!("Scaler saved as '{}'", name);
        }
    }
}

fn print_prediction(prediction: &PredictionResult) {
    let p0 = prediction.probabilities.first().copied().unwrap_or(0.0);
    let p1 = prediction.probabilities.get(1).copied().unwrap_or(0.0);
    println!("Query Prediction: {}", prediction.label);
    println!("Query Probabilities: Class 0 = {:.2}, Class 1 = {:.2}", p0, p1);
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Argument parsing
    // ========================================================================

    #[test]
    fn test_train_defaults() {
        let cli = Cli::parse_from(["waterlog", "train"]);
        let Some(Command::Train(args)) = cli.command else {
            panic!("expected train subcommand");
        };
        assert_eq!(args.input, PathBuf::from("combined_manual (5).xlsx"));
        assert_eq!(args.sheet, "Sheet1");
        assert_eq!(args.report, PathBuf::from("test_probabilities_rf.xlsx"));
        assert_eq!(args.trees, 200);
        assert_eq!(args.max_depth, 10);
        assert_eq!(args.min_samples_split, 5);
        assert_eq!(args.min_samples_leaf, 4);
        assert_eq!(args.seed, 42);
        assert_eq!(args.test_size, 0.2);
        assert!(!args.no_query);
    }

    #[test]
    fn test_no_subcommand_defaults_to_train() {
        let cli = Cli::parse_from(["waterlog", "--quiet"]);
        assert!(cli.command.is_none());
        assert!(cli.quiet);

        let args = TrainArgs::parse_from(["train"]);
        assert_eq!(args.query, DEMO_QUERY);
    }

    #[test]
    fn test_predict_args() {
        let cli = Cli::parse_from([
            "waterlog",
            "predict",
            "--artifacts",
            "models",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.log_level, "debug");
        let Some(Command::Predict(args)) = cli.command else {
            panic!("expected predict subcommand");
        };
        assert_eq!(args.artifacts, PathBuf::from("models"));
    }

    // ========================================================================
    // Query parsing
    // ========================================================================

    #[test]
    fn test_parse_demo_query() {
        let value = parse_query(DEMO_QUERY).unwrap();
        assert_eq!(value["Water_Table"], "High");
        assert_eq!(value["drainage"], 25);
    }

    #[test]
    fn test_parse_query_rejects_non_object() {
        assert!(parse_query("[1, 2]").is_err());
        assert!(parse_query("{not json").is_err());
    }

    #[test]
    fn test_error_code_of_library_error() {
        let err = anyhow::Error::from(LearningError::TargetNotFound("output".to_string()));
        assert_eq!(error_code(&err), "TARGET_NOT_FOUND");
        assert_eq!(error_code(&anyhow!("plain")), "CLI_ERROR");
    }
}
