//! Serial Trace Studio CLI
//!
//! A protocol reconstruction tool for captured serial/USB traces.
//! Produces deduplicated command catalogs from syscall-level captures.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use serial_trace_studio::commands::{execute_analyze, validate_args, AnalyzeArgs};
use serial_trace_studio::output::read_catalog;
use serial_trace_studio::utils::config::SCHEMA_VERSION;

/// Serial Trace Studio - Protocol reconstruction from device captures
#[derive(Parser, Debug)]
#[command(name = "serial-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a captured trace file
    Analyze {
        /// Path to the trace file
        #[arg(short, long)]
        file: PathBuf,

        /// Output path for the catalog JSON
        #[arg(short, long, default_value = "catalog.json")]
        output: PathBuf,

        /// Attach every contiguous read to its command (dump-style
        /// traces) instead of strict one-to-one pairing
        #[arg(long)]
        multi_response: bool,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate a catalog JSON file
    Validate {
        /// Path to catalog JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Analyze {
            file,
            output,
            multi_response,
            summary,
        } => {
            let args = AnalyzeArgs {
                input: file,
                output_json: output,
                multi_response,
                print_summary: summary,
            };

            validate_args(&args)?;
            execute_analyze(args)?;
        }

        Commands::Validate { file } => {
            validate_catalog_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// Validate a catalog JSON file
///
/// **Private** - internal command implementation
fn validate_catalog_file(file_path: PathBuf) -> Result<()> {
    println!("Validating catalog: {}", file_path.display());

    let catalog = read_catalog(&file_path)?;

    println!("✓ Valid catalog JSON");
    println!("  Version: {}", catalog.version);
    println!("  Source: {}", catalog.source_file);
    println!("  Format: {}", catalog.trace_format);
    println!("  Operations: {}", catalog.summary.total_operations);
    println!("  Pairs: {}", catalog.summary.pair_count);
    println!("  Distinct Commands: {}", catalog.commands.len());
    if catalog.low_confidence {
        println!("  Confidence: LOW (generic hex fallback)");
    }

    Ok(())
}

/// Display schema information
///
/// **Private** - internal command implementation
fn display_schema(show_details: bool) {
    println!("Serial Trace Studio Catalog Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string          - Schema version (e.g., '1.0.0')");
        println!("  sourceFile: string       - Trace file analyzed");
        println!("  traceFormat: string      - Grammar that matched the trace");
        println!("  lowConfidence: boolean   - True when only the hex fallback matched");
        println!("  summary: object          - Run statistics");
        println!("    totalOperations: number - Operations tokenized");
        println!("    commandCount: number   - Host-to-device writes");
        println!("    responseCount: number  - Device-to-host reads");
        println!("    pairCount: number      - Correlated pairs");
        println!("    handshakeCount: number - Pairs flagged as handshakes");
        println!("    successCount: number   - ACK responses");
        println!("    errorCount: number     - NAK responses");
        println!("  commands: array          - Deduplicated command profiles");
        println!("    commandHex: string     - Canonical lowercase hex key");
        println!("    description: string    - Best-guess classification");
        println!("    dataCategory: string   - Control/programming/bulk bucket");
        println!("    occurrences: number    - Pairs collapsed into this entry");
        println!("    timingAverage: string  - Mean command-to-response delta");
        println!("    successRate: string    - ACK percentage");
        println!("    responseVariants: array - Distinct response hex strings");
        println!("  generatedAt: string      - ISO 8601 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
///
/// **Private** - internal command implementation
fn display_version() {
    println!("Serial Trace Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Catalog Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("A protocol reconstruction tool for captured serial/USB traces.");
}
