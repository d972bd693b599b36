#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use krippendorff_alpha::detect::{detect, infer_data_type, resolve_column_mapping};
use krippendorff_alpha::report::render_report_markdown;
use krippendorff_alpha::{
    compute_alpha_run, load_table, AlphaConfig, AlphaRequest, AnnotationLevel, AnnotatorWeights,
    DataType, MissingValuePolicy,
};

#[derive(Parser)]
#[command(name = "kalpha", version, about = "Krippendorff's alpha for annotation tables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute alpha for a CSV/TSV/JSON/JSONL annotation file
    Compute {
        #[arg(long)]
        input: PathBuf,
        /// nominal, ordinal, interval or ratio; inferred when omitted
        #[arg(long)]
        data_type: Option<String>,
        /// Comma-separated annotator columns; detected when omitted
        #[arg(long, value_delimiter = ',')]
        annotators: Option<Vec<String>>,
        #[arg(long)]
        text_col: Option<String>,
        #[arg(long, value_enum, default_value_t = Level::TextLevel)]
        level: Level,
        /// Missing-value policy; the configured policy when omitted
        #[arg(long, value_enum)]
        missing: Option<Missing>,
        /// Label used by `--missing fill`
        #[arg(long)]
        fill_value: Option<String>,
        /// Comma-separated ordinal scale, lowest first
        #[arg(long, value_delimiter = ',')]
        ordinal_scale: Option<Vec<String>>,
        /// Annotator weight as name=weight (repeatable)
        #[arg(long = "weight")]
        weights: Vec<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Print detected columns and the inferred data type
    Detect {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = Level::TextLevel)]
        level: Level,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the ordinal scale library
    Scales {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    TextLevel,
    TokenLevel,
}

impl From<Level> for AnnotationLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::TextLevel => AnnotationLevel::TextLevel,
            Level::TokenLevel => AnnotationLevel::TokenLevel,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Missing {
    Ignore,
    Drop,
    Fill,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Md,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compute {
            input,
            data_type,
            annotators,
            text_col,
            level,
            missing,
            fill_value,
            ordinal_scale,
            weights,
            config,
            out,
            format,
        } => {
            let config = load_config(config)?;
            let table = load_table(&input)?;
            let columns = resolve_column_mapping(
                &table,
                level.into(),
                text_col.as_deref(),
                annotators,
                &config,
            )?;
            let data_type = match data_type {
                Some(raw) => raw.parse::<DataType>()?,
                None => infer_data_type(&table, &columns.annotator_cols, &config.scale_library())?,
            };

            let mut request = AlphaRequest::new(data_type, columns.annotator_cols)
                .with_weights(parse_weights(&weights)?);
            if let Some(policy) = missing_policy(missing, fill_value)? {
                request = request.with_missing_value_policy(policy);
            }
            if let Some(scale) = ordinal_scale {
                request = request.with_ordinal_scale(scale);
            }

            let run = compute_alpha_run(&table, &request, &config)?;
            let rendered = match format {
                Format::Json => serde_json::to_string_pretty(&run)?,
                Format::Md => render_report_markdown(&run),
            };
            emit(out, &rendered)?;
        }
        Commands::Detect {
            input,
            level,
            config,
        } => {
            let config = load_config(config)?;
            let table = load_table(&input)?;
            let detection = detect(&table, level.into(), &config)?;
            emit(None, &serde_json::to_string_pretty(&detection)?)?;
        }
        Commands::Scales { config } => {
            let config = load_config(config)?;
            let library = config.scale_library();
            emit(None, &serde_json::to_string_pretty(library.scales())?)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<AlphaConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => AlphaConfig::load(path)?,
        None => AlphaConfig::from_env()?,
    })
}

fn missing_policy(
    missing: Option<Missing>,
    fill_value: Option<String>,
) -> Result<Option<MissingValuePolicy>, Box<dyn std::error::Error>> {
    Ok(match missing {
        None => None,
        Some(Missing::Ignore) => Some(MissingValuePolicy::Ignore),
        Some(Missing::Drop) => Some(MissingValuePolicy::DropUnits),
        Some(Missing::Fill) => {
            let value = fill_value
                .filter(|v| !v.trim().is_empty())
                .ok_or("--missing fill requires --fill-value")?;
            Some(MissingValuePolicy::Fill(value))
        }
    })
}

/// Parse "name=weight" specs.
fn parse_weights(specs: &[String]) -> Result<AnnotatorWeights, Box<dyn std::error::Error>> {
    let mut weights = AnnotatorWeights::new();
    for spec in specs {
        let (name, raw) = spec
            .rsplit_once('=')
            .ok_or_else(|| format!("invalid weight spec {spec:?}: expected name=weight"))?;
        let weight: f64 = raw
            .trim()
            .parse()
            .map_err(|e| format!("invalid weight in {spec:?}: {e}"))?;
        weights.insert(name.trim(), weight)?;
    }
    Ok(weights)
}

fn emit(out: Option<PathBuf>, rendered: &str) -> Result<(), io::Error> {
    match out {
        Some(path) => std::fs::write(path, rendered),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.write_all(b"\n")
        }
    }
}
