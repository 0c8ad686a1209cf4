//! # csvbind
//!
//! Command-line front end for csv-bind.
//!
//! Record layouts come from a schema file holding a record descriptor and
//! the CSV configuration used to read sources.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use csv_bind::{
    BindingMode, CsvConfig, CsvReader, CsvWriter, MappingStrategy, RecordDescriptor, RowRecord,
};
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csvbind")]
#[command(about = "Map CSV files through a record descriptor")]
#[command(version)]
struct Cli {
    /// Schema file (YAML or JSON) with the record descriptor and CSV config
    #[arg(short, long, global = true)]
    schema: Option<PathBuf>,

    /// How fields bind to columns
    #[arg(short, long, global = true, value_enum, default_value_t = ModeArg::Auto)]
    mode: ModeArg,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header line the schema generates
    Header,

    /// Read a CSV file and report how many records it maps to
    Validate {
        /// Input file path
        input: PathBuf,
    },

    /// Read a CSV file and write it back out with another layout
    Convert {
        /// Input file path
        input: PathBuf,

        /// Output file path
        output: PathBuf,

        /// Output field separator
        #[arg(long)]
        separator: Option<char>,

        /// Output quote character; every field is quoted when set
        #[arg(long)]
        quote: Option<char>,

        /// Output line terminator
        #[arg(long, value_enum)]
        line_end: Option<LineEnd>,

        /// Do not write a header line
        #[arg(long)]
        no_header: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Name,
    Position,
    Unbound,
}

impl ModeArg {
    fn binding_mode(self) -> Option<BindingMode> {
        match self {
            ModeArg::Auto => None,
            ModeArg::Name => Some(BindingMode::NameBased),
            ModeArg::Position => Some(BindingMode::PositionBased),
            ModeArg::Unbound => Some(BindingMode::Unbound),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LineEnd {
    Lf,
    Crlf,
}

impl LineEnd {
    fn as_str(self) -> &'static str {
        match self {
            LineEnd::Lf => "\n",
            LineEnd::Crlf => "\r\n",
        }
    }
}

/// Contents of a `--schema` file
#[derive(Debug, Deserialize)]
struct SchemaFile {
    record: RecordDescriptor,
    #[serde(default)]
    config: CsvConfig,
}

fn load_schema(path: &Path) -> anyhow::Result<SchemaFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to load schema {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let schema = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON schema {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML schema {}", path.display()))?
    };
    Ok(schema)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let Some(schema_path) = cli.schema else {
        bail!("a schema file is required (--schema <file>)");
    };
    let schema = load_schema(&schema_path)?;
    let strategy =
        MappingStrategy::<RowRecord>::with_descriptor(cli.mode.binding_mode(), &schema.record)
            .with_context(|| format!("Invalid record descriptor '{}'", schema.record.name))?;
    tracing::info!(
        record = %schema.record.name,
        mode = %strategy.mode(),
        "Loaded schema"
    );

    match cli.command {
        Commands::Header => {
            let separator = schema.config.separator.to_string();
            println!("{}", strategy.generate_header().join(separator.as_str()));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { input } => {
            tracing::info!("Validating {}", input.display());
            let file = File::open(&input)
                .with_context(|| format!("Failed to open {}", input.display()))?;
            let report = CsvReader::new()
                .with_config(schema.config)
                .with_strategy(strategy)
                .read_report(file)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            println!("Records: {}", report.records.len());
            println!("Skipped: {}", report.skipped.len());
            for err in &report.skipped {
                println!("  {err}");
            }
            if report.skipped.is_empty() {
                println!("Validation passed.");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
        Commands::Convert {
            input,
            output,
            separator,
            quote,
            line_end,
            no_header,
        } => {
            tracing::info!("Converting {} -> {}", input.display(), output.display());
            let records = CsvReader::new()
                .with_config(schema.config.clone())
                .with_strategy(strategy.clone())
                .read_path(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let mut config = schema.config;
            if let Some(separator) = separator {
                config = config.separator(separator);
            }
            if let Some(quote) = quote {
                config = config.quote_char(quote);
            }
            if let Some(line_end) = line_end {
                config = config.line_end(line_end.as_str());
            }
            if no_header {
                config = config.without_header();
            }

            let count = records.len();
            CsvWriter::new()
                .with_config(config)
                .with_strategy(strategy)
                .write_path(&output, records)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Converted {count} records to {}", output.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
