//! Catalog JSON schema definitions.
//!
//! This module defines the structure of the catalog files we write to
//! disk. Schema is versioned to allow future evolution; field names
//! are camelCase to match the artifacts downstream tooling already
//! consumes.

use crate::aggregator::ProtocolCommandProfile;
use crate::correlator::CommandResponsePair;
use crate::parser::{display_ascii, ScanStats, TraceFormat};
use crate::utils::config::{ACK, NAK, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};

/// Top-level catalog structure written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Schema version for compatibility checking
    pub version: String,

    /// Trace file the catalog was reconstructed from
    pub source_file: String,

    /// Grammar that produced the operations
    pub trace_format: String,

    /// True when only the generic hex fallback matched; such catalogs
    /// deserve extra skepticism
    pub low_confidence: bool,

    /// Run statistics
    pub summary: AnalysisSummary,

    /// Deduplicated command profiles, most frequent first
    pub commands: Vec<CommandRecord>,

    /// Timestamp when the catalog was generated
    pub generated_at: String,
}

/// Summary statistics for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    /// Operations tokenized from the trace
    pub total_operations: usize,

    /// Writes (host to device)
    pub command_count: usize,

    /// Reads (device to host)
    pub response_count: usize,

    /// Correlated command-response pairs
    pub pair_count: usize,

    /// Pairs flagged as handshakes
    pub handshake_count: usize,

    /// Responses leading with ACK
    pub success_count: usize,

    /// Responses leading with NAK
    pub error_count: usize,

    /// Non-blank lines scanned
    pub total_lines: usize,

    /// Lines that matched the active grammar
    pub matched_lines: usize,
}

/// One deduplicated command entry in the serialized catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub command_hex: String,
    pub command_ascii: String,
    pub description: String,
    pub data_category: String,
    pub response_pattern: String,
    pub response_hex: String,
    pub response_ascii: String,
    pub occurrences: usize,
    pub timing_average: String,
    pub success_rate: String,
    pub timestamp_first: String,
    pub timestamp_last: String,
    pub line_numbers: Vec<usize>,
    pub is_handshake: bool,
    pub response_variants: Vec<String>,
}

impl AnalysisSummary {
    /// Compute run statistics
    ///
    /// **Public** - called by the analyze command; operation counts
    /// are taken before the correlator consumes the sequence
    pub fn from_run(
        total_operations: usize,
        command_count: usize,
        pairs: &[CommandResponsePair],
        stats: &ScanStats,
    ) -> Self {
        let mut success_count = 0;
        let mut error_count = 0;
        for pair in pairs {
            for response in &pair.responses {
                match response.payload.first() {
                    Some(&ACK) => success_count += 1,
                    Some(&NAK) => error_count += 1,
                    _ => {}
                }
            }
        }

        Self {
            total_operations,
            command_count,
            response_count: total_operations - command_count,
            pair_count: pairs.len(),
            handshake_count: pairs.iter().filter(|p| p.is_handshake).count(),
            success_count,
            error_count,
            total_lines: stats.total_lines,
            matched_lines: stats.matched_lines,
        }
    }
}

impl CommandRecord {
    /// Serialized form of one profile
    fn from_profile(profile: &ProtocolCommandProfile) -> Self {
        Self {
            command_hex: profile.hex_key.clone(),
            command_ascii: ascii_of_hex(&profile.hex_key),
            description: profile.description.clone(),
            data_category: profile.data_category.clone(),
            response_pattern: profile.response_pattern.clone(),
            response_hex: profile.response_hex.clone(),
            response_ascii: ascii_of_hex(&profile.response_hex),
            occurrences: profile.occurrences,
            timing_average: profile.timing_average.clone(),
            success_rate: profile.success_rate.clone(),
            timestamp_first: profile.timestamp_first.clone(),
            timestamp_last: profile.timestamp_last.clone(),
            line_numbers: profile.line_numbers.clone(),
            is_handshake: profile.is_handshake,
            response_variants: profile.response_variants.clone(),
        }
    }
}

/// Assemble the catalog handed to reporting consumers
///
/// **Public** - final step of the analysis pipeline
pub fn build_catalog(
    source_file: &str,
    format: TraceFormat,
    summary: AnalysisSummary,
    profiles: &[ProtocolCommandProfile],
    low_confidence: bool,
) -> Catalog {
    use chrono::Utc;

    Catalog {
        version: SCHEMA_VERSION.to_string(),
        source_file: source_file.to_string(),
        trace_format: format.name().to_string(),
        low_confidence,
        summary,
        commands: profiles.iter().map(CommandRecord::from_profile).collect(),
        generated_at: Utc::now().to_rfc3339(),
    }
}

/// Dot-ASCII rendering of a canonical hex string
fn ascii_of_hex(hex_key: &str) -> String {
    match hex::decode(hex_key) {
        Ok(bytes) => display_ascii(&bytes),
        Err(_) => String::new(),
    }
}
