//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Reads the trace file
//! 2. Tokenizes it into operations
//! 3. Correlates command-response pairs
//! 4. Classifies and aggregates them
//! 5. Writes the catalog JSON

use crate::aggregator::aggregate;
use crate::classifier::classify_pairs;
use crate::correlator::{correlate, PairingMode};
use crate::output::{build_catalog, write_catalog, AnalysisSummary};
use crate::parser::{tokenize_trace, Direction};
use crate::utils::error::ParseError;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to the captured trace file
    pub input: PathBuf,

    /// Output path for the catalog JSON
    pub output_json: PathBuf,

    /// Attach the whole contiguous run of reads to each command
    /// instead of strict one-to-one pairing
    pub multi_response: bool,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_json: PathBuf::from("catalog.json"),
            multi_response: false,
            print_summary: false,
        }
    }
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Trace file path cannot be empty");
    }

    if !args.input.exists() {
        anyhow::bail!("Trace file does not exist: {}", args.input.display());
    }

    if args.input.is_dir() {
        anyhow::bail!("Trace path is a directory: {}", args.input.display());
    }

    if args.output_json.as_os_str().is_empty() {
        anyhow::bail!("Output path cannot be empty");
    }

    Ok(())
}

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Trace file unreadable
/// * Zero operations parsed ("no communications found")
/// * Catalog write failures
pub fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Starting analysis of trace: {}", args.input.display());

    // Step 1: Read the trace file
    info!("Step 1/5: Reading trace file...");
    let text = std::fs::read_to_string(&args.input)
        .map_err(ParseError::FileUnreadable)
        .with_context(|| format!("Failed to read trace file {}", args.input.display()))?;

    // Step 2: Tokenize into operations
    info!("Step 2/5: Tokenizing trace...");
    let (operations, format, stats) = tokenize_trace(&text);

    info!("Parse coverage: {}", stats.coverage_summary());
    if stats.fallback_used {
        warn!("Operations came from the generic hex fallback; treat results as low confidence");
    }

    if operations.is_empty() {
        return Err(ParseError::NoCommunications)
            .with_context(|| format!("Nothing to analyze in {}", args.input.display()));
    }

    let total_operations = operations.len();
    let command_count = operations
        .iter()
        .filter(|op| op.direction == Direction::ToDevice)
        .count();
    info!(
        "Found {} communications ({} commands, {} responses)",
        total_operations,
        command_count,
        total_operations - command_count
    );

    // Step 3: Correlate into pairs
    info!("Step 3/5: Correlating command-response pairs...");
    let mode = if args.multi_response {
        PairingMode::ContiguousRun
    } else {
        PairingMode::Strict
    };
    let mut pairs = correlate(operations, mode);
    debug!("Identified {} command-response pairs", pairs.len());

    // Step 4: Classify and aggregate
    info!("Step 4/5: Classifying and aggregating...");
    classify_pairs(&mut pairs);
    let summary = AnalysisSummary::from_run(total_operations, command_count, &pairs, &stats);
    let profiles = aggregate(&pairs);
    info!("Extracted {} distinct protocol commands", profiles.len());

    // Step 5: Write the catalog
    info!("Step 5/5: Writing catalog...");
    let catalog = build_catalog(
        &args.input.display().to_string(),
        format,
        summary,
        &profiles,
        stats.fallback_used,
    );
    write_catalog(&catalog, &args.output_json).context("Failed to write catalog JSON")?;

    info!("✓ Catalog written to: {}", args.output_json.display());

    if args.print_summary {
        print_summary(&catalog);
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

/// Print a text digest of the catalog to stdout
///
/// **Private** - internal helper for execute_analyze
fn print_summary(catalog: &crate::output::Catalog) {
    let summary = &catalog.summary;

    println!("\n{}", "=".repeat(80));
    println!("ANALYSIS SUMMARY");
    println!("{}", "=".repeat(80));
    println!("Trace:        {}", catalog.source_file);
    println!("Format:       {}", catalog.trace_format);
    if catalog.low_confidence {
        println!("Confidence:   LOW (generic hex fallback)");
    }
    println!(
        "Operations:   {} ({} commands, {} responses)",
        summary.total_operations, summary.command_count, summary.response_count
    );
    println!("Pairs:        {}", summary.pair_count);
    println!("Handshakes:   {}", summary.handshake_count);
    println!(
        "ACK/NAK:      {} acknowledged, {} rejected",
        summary.success_count, summary.error_count
    );
    println!("Coverage:     {} of {} lines", summary.matched_lines, summary.total_lines);
    println!("\nTop commands:");

    for record in catalog.commands.iter().take(10) {
        println!(
            "  {:>4}x  {:<20} {}",
            record.occurrences,
            truncate(&record.command_hex, 20),
            record.description
        );
    }
    println!("{}", "=".repeat(80));
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}..", &s[..max - 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_args_empty_input() {
        let args = AnalyzeArgs::default();
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_missing_file() {
        let args = AnalyzeArgs {
            input: PathBuf::from("/definitely/not/there.log"),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_directory_input() {
        let temp_dir = tempfile::tempdir().unwrap();
        let args = AnalyzeArgs {
            input: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_valid() {
        let mut trace = tempfile::NamedTempFile::new().unwrap();
        writeln!(trace, "10:00:00.000000 write(3, \"\\x02\", 1) = 1").unwrap();

        let args = AnalyzeArgs {
            input: trace.path().to_path_buf(),
            ..Default::default()
        };
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_execute_analyze_no_communications() {
        let mut trace = tempfile::NamedTempFile::new().unwrap();
        writeln!(trace, "nothing that parses").unwrap();

        let temp_dir = tempfile::tempdir().unwrap();
        let args = AnalyzeArgs {
            input: trace.path().to_path_buf(),
            output_json: temp_dir.path().join("catalog.json"),
            ..Default::default()
        };

        let err = execute_analyze(args).unwrap_err();
        assert!(err.to_string().contains("Nothing to analyze"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 10), "abcdef");
        assert_eq!(truncate("abcdefghijkl", 6), "abcd..");
    }
}
