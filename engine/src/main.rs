//! Rowparse CLI - parse delimited or fixed-width files with a JSON schema
//!
//! ```bash
//! rowparse parse --schema people.json people.csv           # JSON array of outcomes
//! rowparse parse --schema people.json people.csv --ndjson  # one outcome per line
//! rowparse check --schema people.json                      # validate a schema
//! rowparse transforms                                      # list registered transforms
//! ```
//!
//! Logs go to stderr (`-v` for debug, `-vv` for trace, or `RUST_LOG`).

use clap::{Parser, Subcommand};
use rowparse::{registered_file_types, registered_keys, RowOutcome, Schema, SchemaConfig, Summary};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rowparse")]
#[command(about = "Parse delimited and fixed-width files with a JSON schema", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and output one outcome per row
    Parse {
        /// Schema configuration (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Input file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write one JSON object per line instead of an array
        #[arg(long)]
        ndjson: bool,
    },

    /// Build a schema and report configuration errors
    Check {
        /// Schema configuration (JSON)
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// List registered file types and transforms
    Transforms,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Parse {
            schema,
            input,
            output,
            ndjson,
        } => cmd_parse(&schema, &input, output.as_deref(), ndjson),

        Commands::Check { schema } => cmd_check(&schema),

        Commands::Transforms => cmd_transforms(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_schema(path: &Path) -> Result<Schema, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(path)?;
    let config = SchemaConfig::from_json(&json)?;
    Ok(Schema::build(&config)?)
}

fn cmd_parse(
    schema_path: &Path,
    input: &Path,
    output: Option<&Path>,
    ndjson: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(schema_path)?;
    eprintln!("Parsing: {}", input.display());

    let stream = schema.stream(File::open(input)?)?;

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);

    let mut summary = Summary::default();
    if ndjson {
        for outcome in stream {
            summary.record(&outcome);
            serde_json::to_writer(&mut writer, &outcome)?;
            writeln!(writer)?;
        }
    } else {
        let outcomes: Vec<RowOutcome> = stream.collect();
        summary = Summary::from_outcomes(&outcomes);
        serde_json::to_writer_pretty(&mut writer, &outcomes)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    if let Some(path) = output {
        eprintln!("Output written to: {}", path.display());
    }
    eprintln!("{}", summary);
    Ok(())
}

fn cmd_check(schema_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(schema_path)?;
    eprintln!(
        "Schema OK: {} fields, {} computed fields{}",
        schema.fields().len(),
        schema.computed_fields().len(),
        if schema.has_header() { ", header row skipped" } else { "" }
    );
    Ok(())
}

fn cmd_transforms() -> Result<(), Box<dyn std::error::Error>> {
    println!("file types: {}", registered_file_types().join(", "));
    for (family, keys) in registered_keys() {
        println!("{}: {}", family, keys.join(", "));
    }
    Ok(())
}
