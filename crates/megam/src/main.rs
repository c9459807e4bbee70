//! CLI entry point for the megam interface.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use megam::{
    FeatureEncoding, LabelMode, Megam, MegamConfig, TableEncoding, TableInstance, TrainOptions,
    TrainingRecord, WriteOptions, parse_megam_weights, write_megam_file,
};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Train maxent weights with the external megam optimizer",
    long_about = "Write megam training files, run megam and parse its weights.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  MEGAM        Path to the megam binary\n  \
                  MEGAMHOME    Directory containing the megam binary\n\n\
                  Training data is JSON lines, one instance per line:\n  \
                  {\"label\": \"pos\", \"features\": {\"pos\": [[0, 1]], \"neg\": [[1, 1]]}}\n\n\
                  EXAMPLES:\n  \
                  megam-cli locate\n  \
                  megam-cli write -i data.jsonl -o train.megam\n  \
                  megam-cli train -i data.jsonl -o weights.json --repeat 5\n  \
                  megam-cli parse -i megam.out --features 120"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the megam binary and print its path
    Locate {
        /// Explicit path to the megam binary
        #[arg(long)]
        bin: Option<PathBuf>,
    },

    /// Write a megam training file from JSON-lines instances
    Write {
        #[command(flatten)]
        data: DataArgs,

        /// Path of the megam training file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Write one feature block for the gold label only
        #[arg(long)]
        implicit: bool,
    },

    /// Train weights with megam and write them as JSON
    Train {
        #[command(flatten)]
        data: DataArgs,

        /// Explicit path to the megam binary
        #[arg(long)]
        bin: Option<PathBuf>,

        /// Output file for the weights (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of optimization repeats
        #[arg(long, default_value = "10")]
        repeat: u32,

        /// Gaussian prior precision
        #[arg(long)]
        lambda: Option<f64>,

        /// Maximum number of iterations
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Tune lambda on held-out data
        #[arg(long)]
        tune: bool,
    },

    /// Parse megam weight output into JSON
    Parse {
        /// megam stdout capture ("-" for stdin)
        #[arg(short, long)]
        input: String,

        /// Total number of features
        #[arg(long)]
        features: usize,

        /// Output file for the weights (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct DataArgs {
    /// JSON-lines training data
    #[arg(short, long)]
    input: PathBuf,

    /// Comma-separated label order (default: order of first appearance)
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Total number of features (default: largest feature id + 1)
    #[arg(long)]
    features: Option<usize>,

    /// List feature values explicitly instead of the bernoulli format
    #[arg(long)]
    fvals: bool,

    /// Write per-label costs instead of the gold label index
    #[arg(long)]
    cost: bool,
}

impl DataArgs {
    fn label_mode(&self) -> LabelMode {
        if self.cost { LabelMode::Cost } else { LabelMode::Index }
    }
}

#[derive(Serialize)]
struct WeightsReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<&'a [String]>,
    features: usize,
    weights: &'a [f64],
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so that weight JSON on stdout stays clean.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet);

    // Load MEGAM / MEGAMHOME from a .env file if present
    dotenv().ok();

    match cli.command {
        Command::Locate { bin } => {
            let path = build_megam(bin)?.resolve()?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Write {
            data,
            output,
            implicit,
        } => {
            let (encoding, toks) = load_training_data(&data)?;
            let options = WriteOptions {
                bernoulli: !data.fvals,
                explicit: !implicit,
                label_mode: data.label_mode(),
            };
            write_megam_file(&toks, &encoding, &output, &options)?;
            info!("Wrote {} instances to {}", toks.len(), output.display());
            Ok(())
        }
        Command::Train {
            data,
            bin,
            output,
            repeat,
            lambda,
            max_iterations,
            tune,
        } => {
            let (encoding, toks) = load_training_data(&data)?;

            let mut builder = TrainOptions::builder()
                .bernoulli(!data.fvals)
                .label_mode(data.label_mode())
                .repeat(repeat)
                .tune(tune);
            if let Some(lambda) = lambda {
                builder = builder.lambda(lambda);
            }
            if let Some(maxi) = max_iterations {
                builder = builder.max_iterations(maxi);
            }
            let options = builder.build()?;

            let megam = build_megam(bin)?;
            let weights = megam.train(&toks, &encoding, &options)?;

            let report = WeightsReport {
                labels: Some(encoding.labels()),
                features: encoding.length(),
                weights: &weights,
            };
            emit_json(&report, output.as_deref())
        }
        Command::Parse {
            input,
            features,
            output,
        } => {
            let stdout = read_input(&input)?;
            let weights = parse_megam_weights(&stdout, features, true)?;
            let report = WeightsReport {
                labels: None,
                features,
                weights: &weights,
            };
            emit_json(&report, output.as_deref())
        }
    }
}

fn build_megam(bin: Option<PathBuf>) -> Result<Megam> {
    let mut builder = MegamConfig::builder();
    if let Some(bin) = bin {
        builder = builder.binary(bin);
    }
    Ok(Megam::new(builder.build()?))
}

fn load_training_data(args: &DataArgs) -> Result<(TableEncoding, Vec<(TableInstance, String)>)> {
    let records = read_records(&args.input)?;
    if records.is_empty() {
        return Err(anyhow!("No training instances in {}", args.input.display()));
    }

    let encoding = TableEncoding::from_records(&records, args.labels.clone(), args.features)?;
    debug!("Loaded {} training records", records.len());

    let toks = records.into_iter().map(|r| (r.instance, r.label)).collect();
    Ok((encoding, toks))
}

fn read_records(path: &Path) -> Result<Vec<TrainingRecord>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid training record", path.display(), i + 1))
        })
        .collect()
}

fn read_input(input: &str) -> Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(input).with_context(|| format!("Failed to read {input}"))
    }
}

fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            info!("Weights saved: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
