//! Aggregation of correlated pairs into a deduplicated command catalog.
//!
//! Pairs collapse onto profiles keyed by the canonical hex of the
//! command payload. Profiles carry occurrence counts, observed
//! response variants, mean timing, and acknowledgment rates - the
//! statistics a reverse-engineer reads first.

use crate::classifier::label_response;
use crate::correlator::CommandResponsePair;
use crate::utils::config::ACK;
use log::debug;
use std::collections::HashMap;

/// One deduplicated command entry in the catalog
///
/// **Public** - keyed by the canonical lowercase hex of the full
/// command payload; one profile per distinct key per run
#[derive(Debug, Clone)]
pub struct ProtocolCommandProfile {
    /// Canonical lowercase hex of the command payload, no separators
    pub hex_key: String,
    /// Description taken from the first observed pair
    pub description: String,
    /// Data category from the first observed pair
    pub data_category: String,
    /// Label of the first observed response
    pub response_pattern: String,
    /// Hex of the first observed response
    pub response_hex: String,
    /// Number of pairs collapsed into this profile
    pub occurrences: usize,
    /// Distinct response hex strings, first-seen order
    pub response_variants: Vec<String>,
    /// Mean of valid deltas, unit-formatted; "unknown" without samples
    pub timing_average: String,
    /// Percentage of ACK-leading responses; "n/a" without responses
    pub success_rate: String,
    /// Raw timestamp of the first occurrence
    pub timestamp_first: String,
    /// Raw timestamp of the last occurrence
    pub timestamp_last: String,
    /// Source line of every occurrence
    pub line_numbers: Vec<usize>,
    /// Handshake flag from the first observed pair
    pub is_handshake: bool,
}

/// Running state for one profile during the scan
#[derive(Debug)]
struct ProfileAccumulator {
    profile: ProtocolCommandProfile,
    timing_samples_us: Vec<i64>,
    ack_responses: usize,
    total_responses: usize,
}

/// Collapse classified pairs into deduplicated profiles
///
/// **Public** - main entry point for aggregation
///
/// The first pair seen for a key seeds its profile; repeats bump the
/// count, extend the variant and line lists, and fold their timing
/// into the running mean. The result is ordered by descending
/// occurrence count, ties keeping first-seen order - the reporting
/// side depends on that ordering.
pub fn aggregate(pairs: &[CommandResponsePair]) -> Vec<ProtocolCommandProfile> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut accumulators: Vec<ProfileAccumulator> = Vec::new();

    for pair in pairs {
        let hex_key = hex::encode(&pair.command.payload);

        let slot = match index.get(&hex_key) {
            Some(&slot) => slot,
            None => {
                let slot = accumulators.len();
                index.insert(hex_key.clone(), slot);
                accumulators.push(ProfileAccumulator::new(hex_key, pair));
                slot
            }
        };
        accumulators[slot].fold(pair);
    }

    let mut profiles: Vec<ProtocolCommandProfile> = accumulators
        .into_iter()
        .map(ProfileAccumulator::finish)
        .collect();

    // Stable sort keeps first-seen order within equal counts
    profiles.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));

    debug!("Aggregated {} pairs into {} profiles", pairs.len(), profiles.len());
    profiles
}

impl ProfileAccumulator {
    fn new(hex_key: String, pair: &CommandResponsePair) -> Self {
        let response_hex = pair
            .first_response()
            .map(|r| hex::encode(&r.payload))
            .unwrap_or_default();
        let response_pattern = match pair.first_response() {
            Some(resp) => label_response(&resp.payload),
            None => "No Response".to_string(),
        };

        Self {
            profile: ProtocolCommandProfile {
                hex_key,
                description: pair.description.clone(),
                data_category: pair.data_category.clone(),
                response_pattern,
                response_hex,
                occurrences: 0,
                response_variants: Vec::new(),
                timing_average: String::new(),
                success_rate: String::new(),
                timestamp_first: pair.command.timestamp_raw.clone(),
                timestamp_last: pair.command.timestamp_raw.clone(),
                line_numbers: Vec::new(),
                is_handshake: pair.is_handshake,
            },
            timing_samples_us: Vec::new(),
            ack_responses: 0,
            total_responses: 0,
        }
    }

    fn fold(&mut self, pair: &CommandResponsePair) {
        self.profile.occurrences += 1;
        self.profile.timestamp_last = pair.command.timestamp_raw.clone();
        self.profile.line_numbers.push(pair.command.source_line);

        for response in &pair.responses {
            let response_hex = hex::encode(&response.payload);
            if !self.profile.response_variants.contains(&response_hex) {
                self.profile.response_variants.push(response_hex);
            }
            self.total_responses += 1;
            if response.payload.first() == Some(&ACK) {
                self.ack_responses += 1;
            }
        }

        if let Some(us) = pair.time_delta.micros() {
            if us > 0 {
                self.timing_samples_us.push(us);
            }
        }
    }

    fn finish(self) -> ProtocolCommandProfile {
        let mut profile = self.profile;

        profile.timing_average = if self.timing_samples_us.is_empty() {
            "unknown".to_string()
        } else {
            let sum: i64 = self.timing_samples_us.iter().sum();
            format_micros(sum / self.timing_samples_us.len() as i64)
        };

        profile.success_rate = if self.total_responses == 0 {
            "n/a".to_string()
        } else {
            format!(
                "{:.1}%",
                self.ack_responses as f64 / self.total_responses as f64 * 100.0
            )
        };

        profile
    }
}

/// Format a microsecond count with unit thresholds
///
/// **Public** - microseconds below 1 ms, milliseconds below 1 s,
/// seconds otherwise
pub fn format_micros(us: i64) -> String {
    if us.abs() < 1_000 {
        format!("{}µs", us)
    } else if us.abs() < 1_000_000 {
        format!("{:.1}ms", us as f64 / 1_000.0)
    } else {
        format!("{:.2}s", us as f64 / 1_000_000.0)
    }
}
