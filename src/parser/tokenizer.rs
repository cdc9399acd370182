//! Trace tokenizer.
//!
//! Converts trace text into an ordered `Operation` sequence using the
//! grammar chosen by the format detector. Lines that match nothing are
//! skipped and counted, never fatal. When the detected grammar yields
//! no operations at all, a low-confidence fallback scan extracts the
//! longest hex-looking substring per line.

use super::escape::unescape_bytes;
use super::format::{
    detect_format, hex_dump_line_regex, syscall_header_regex, syscall_inline_regex, tagged_regex,
    TraceFormat,
};
use crate::utils::config::TRACE_TIME_FORMAT;
use chrono::NaiveTime;
use log::{debug, warn};
use regex::Regex;
use std::sync::OnceLock;

/// Transfer direction of one observed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host wrote bytes to the device (a command)
    ToDevice,
    /// Host read bytes from the device (a response)
    FromDevice,
}

/// One observed byte transfer
///
/// Created once from a trace record, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Operation {
    pub direction: Direction,
    /// Parsed wall-clock time; None when the grammar has no timestamp
    /// or the field was malformed
    pub timestamp: Option<NaiveTime>,
    /// Timestamp text exactly as recorded in the trace
    pub timestamp_raw: String,
    /// File descriptor / handle text identifying the channel
    pub channel_id: String,
    /// Raw payload bytes; never empty in an emitted operation
    pub payload: Vec<u8>,
    /// 1-based line number of the originating record
    pub source_line: usize,
}

/// Line-coverage diagnostics for one tokenizer pass
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    /// Non-blank lines seen
    pub total_lines: usize,
    /// Lines that matched the active grammar
    pub matched_lines: usize,
    /// True when the low-confidence generic hex scan produced the
    /// operations instead of a known grammar
    pub fallback_used: bool,
}

impl ScanStats {
    /// Human-readable parse coverage line
    pub fn coverage_summary(&self) -> String {
        format!(
            "{} of {} lines matched a known grammar",
            self.matched_lines, self.total_lines
        )
    }
}

/// Tokenize a trace into operations
///
/// **Public** - main entry point for trace ingestion
///
/// Detects the grammar from the opening lines, scans with it, and
/// falls back first to the other known grammars and finally to the
/// generic hex scan if nothing produced an operation. The returned
/// format is the grammar that actually produced the operations.
pub fn tokenize_trace(input: &str) -> (Vec<Operation>, TraceFormat, ScanStats) {
    let lines: Vec<&str> = input.lines().collect();
    let detected = detect_format(&lines);

    let (mut operations, mut stats) = tokenize_with(&lines, detected);
    let mut format = detected;

    if operations.is_empty() {
        // The detector can be fooled by leading banner text; before
        // giving up, let the other grammars have a pass
        for candidate in [TraceFormat::Syscall, TraceFormat::HexDump, TraceFormat::Tagged] {
            if candidate == detected {
                continue;
            }
            let (ops, candidate_stats) = tokenize_with(&lines, candidate);
            if !ops.is_empty() {
                debug!(
                    "Grammar {} produced nothing, {} matched instead",
                    detected.name(),
                    candidate.name()
                );
                operations = ops;
                stats = candidate_stats;
                format = candidate;
                break;
            }
        }
    }

    if operations.is_empty() {
        warn!("No grammar matched; running low-confidence generic hex scan");
        let (ops, fallback_stats) = fallback_scan(&lines);
        operations = ops;
        stats = fallback_stats;
    }

    debug!(
        "Tokenized {} operations ({})",
        operations.len(),
        stats.coverage_summary()
    );

    (operations, format, stats)
}

fn tokenize_with(lines: &[&str], format: TraceFormat) -> (Vec<Operation>, ScanStats) {
    match format {
        TraceFormat::Syscall => tokenize_syscall(lines),
        TraceFormat::HexDump => tokenize_hex_dump(lines),
        TraceFormat::Tagged => tokenize_tagged(lines),
    }
}

/// Scan syscall-trace lines with inline escaped payloads
fn tokenize_syscall(lines: &[&str]) -> (Vec<Operation>, ScanStats) {
    let mut operations = Vec::new();
    let mut stats = ScanStats::default();

    for (idx, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        stats.total_lines += 1;

        // Hex-dump detail lines can accompany inline captures; they
        // duplicate the payload, so they are acknowledged and skipped
        if hex_dump_line_regex().is_match(line) {
            stats.matched_lines += 1;
            continue;
        }

        let Some(caps) = syscall_inline_regex().captures(line) else {
            debug!("No match: {}", line);
            continue;
        };
        stats.matched_lines += 1;

        let payload = unescape_bytes(&caps[4]);
        if payload.is_empty() {
            // Zero decoded bytes carry no protocol information
            continue;
        }

        let direction = if caps[2].eq_ignore_ascii_case("write") {
            Direction::ToDevice
        } else {
            Direction::FromDevice
        };

        operations.push(Operation {
            direction,
            timestamp: parse_trace_time(&caps[1]),
            timestamp_raw: caps[1].to_string(),
            channel_id: caps[3].to_string(),
            payload,
            source_line: idx + 1,
        });
    }

    (operations, stats)
}

/// Scan syscall headers followed by fixed-width hex-dump lines
fn tokenize_hex_dump(lines: &[&str]) -> (Vec<Operation>, ScanStats) {
    let mut operations = Vec::new();
    let mut stats = ScanStats::default();
    let mut current: Option<Operation> = None;

    for (idx, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        stats.total_lines += 1;

        if let Some(caps) = syscall_header_regex().captures(line) {
            stats.matched_lines += 1;
            flush(&mut current, &mut operations);

            let direction = if caps[2].eq_ignore_ascii_case("write") {
                Direction::ToDevice
            } else {
                Direction::FromDevice
            };
            current = Some(Operation {
                direction,
                timestamp: parse_trace_time(&caps[1]),
                timestamp_raw: caps[1].to_string(),
                channel_id: caps[3].to_string(),
                payload: Vec::new(),
                source_line: idx + 1,
            });
            continue;
        }

        if let Some(caps) = hex_dump_line_regex().captures(line) {
            if let Some(op) = current.as_mut() {
                stats.matched_lines += 1;
                let compact: String = caps[1].split_whitespace().collect();
                match hex::decode(&compact) {
                    Ok(bytes) => op.payload.extend_from_slice(&bytes),
                    Err(e) => warn!("Undecodable dump line {}: {}", idx + 1, e),
                }
                continue;
            }
        }

        // A non-dump line terminates any accumulation in progress
        flush(&mut current, &mut operations);
        debug!("No match: {}", line);
    }

    flush(&mut current, &mut operations);
    (operations, stats)
}

/// Emit an accumulated operation if it gathered any payload
fn flush(current: &mut Option<Operation>, operations: &mut Vec<Operation>) {
    if let Some(op) = current.take() {
        if !op.payload.is_empty() {
            operations.push(op);
        }
    }
}

/// Scan `CMD:`/`RSP:` tagged hex lines
fn tokenize_tagged(lines: &[&str]) -> (Vec<Operation>, ScanStats) {
    let mut operations = Vec::new();
    let mut stats = ScanStats::default();
    let mut seen_command = false;

    for (idx, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        stats.total_lines += 1;

        let Some(caps) = tagged_regex().captures(line) else {
            debug!("No match: {}", line);
            continue;
        };
        stats.matched_lines += 1;

        let compact: String = caps[2].split_whitespace().collect();
        let bytes = match hex::decode(&compact) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => continue,
            Err(e) => {
                warn!("Undecodable tagged line {}: {}", idx + 1, e);
                continue;
            }
        };

        let is_command = caps[1].eq_ignore_ascii_case("CMD");
        if !is_command && !seen_command {
            // A response with no command to answer is noise
            debug!("Ignoring RSP with no prior CMD at line {}", idx + 1);
            continue;
        }
        seen_command |= is_command;

        operations.push(Operation {
            direction: if is_command {
                Direction::ToDevice
            } else {
                Direction::FromDevice
            },
            timestamp: None,
            timestamp_raw: String::new(),
            channel_id: String::new(),
            payload: bytes,
            source_line: idx + 1,
        });
    }

    (operations, stats)
}

fn hex_run_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9a-fA-F]+").expect("hex run pattern is valid"))
}

/// Last-resort scan for unknown log dialects
///
/// Takes the longest contiguous hex-looking substring per line and
/// guesses direction from command-ish keywords. Results are marked
/// low-confidence via `ScanStats::fallback_used`.
fn fallback_scan(lines: &[&str]) -> (Vec<Operation>, ScanStats) {
    let mut operations = Vec::new();
    let mut stats = ScanStats {
        fallback_used: true,
        ..Default::default()
    };
    let mut seen_command = false;

    for (idx, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        stats.total_lines += 1;

        let Some(run) = hex_run_regex()
            .find_iter(line)
            .max_by_key(|m| m.as_str().len())
        else {
            continue;
        };
        if run.as_str().len() < 2 {
            continue;
        }
        let Ok(bytes) = hex::decode(run.as_str()) else {
            continue;
        };
        if bytes.is_empty() {
            continue;
        }

        let lowered = line.to_lowercase();
        let is_command =
            lowered.contains("cmd") || lowered.contains("tx") || lowered.contains("write");
        if !is_command && !seen_command {
            continue;
        }
        seen_command |= is_command;
        stats.matched_lines += 1;

        operations.push(Operation {
            direction: if is_command {
                Direction::ToDevice
            } else {
                Direction::FromDevice
            },
            timestamp: None,
            timestamp_raw: String::new(),
            channel_id: String::new(),
            payload: bytes,
            source_line: idx + 1,
        });
    }

    (operations, stats)
}

/// Parse an HH:MM:SS.ffffff trace timestamp
///
/// Failures map to None; the correlator reports an unknown delta
/// rather than a misleading zero.
pub fn parse_trace_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, TRACE_TIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syscall_tokenize_basic() {
        let input = "10:00:00.000000 write(3, \"\\x02\\x41\\x42\", 3) = 3\n\
                     10:00:00.001000 read(3, \"\\x06\", 1) = 1\n";
        let (ops, format, stats) = tokenize_trace(input);

        assert_eq!(format, TraceFormat::Syscall);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].direction, Direction::ToDevice);
        assert_eq!(ops[0].payload, vec![0x02, 0x41, 0x42]);
        assert_eq!(ops[0].channel_id, "3");
        assert_eq!(ops[1].direction, Direction::FromDevice);
        assert_eq!(ops[1].payload, vec![0x06]);
        assert_eq!(stats.matched_lines, 2);
        assert!(!stats.fallback_used);
    }

    #[test]
    fn test_syscall_drops_empty_payload() {
        let input = "1 10:00:00.000000 write(3, \"\", 0) = 0\n\
                     1 10:00:00.001000 write(3, \"\\x50\", 1) = 1\n";
        let (ops, _, _) = tokenize_trace(input);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].payload, vec![0x50]);
    }

    #[test]
    fn test_syscall_skips_unmatched_lines() {
        let input = "garbage line\n\
                     10:00:00.000000 write(3, \"\\x02\", 1) = 1\n";
        let (ops, _, stats) = tokenize_trace(input);
        assert_eq!(ops.len(), 1);
        assert_eq!(stats.total_lines, 2);
        assert_eq!(stats.matched_lines, 1);
    }

    #[test]
    fn test_hex_dump_accumulates_lines() {
        let input = "1234 10:00:00.000000 write(3, 0x7f, 6) = 6\n\
                     | 0000 02 41 42 |\n\
                     | 0003 43 44 45 |\n\
                     1234 10:00:00.002000 read(3, 0x7f, 1) = 1\n\
                     | 0000 06 |\n";
        let (ops, format, _) = tokenize_trace(input);

        assert_eq!(format, TraceFormat::HexDump);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].payload, vec![0x02, 0x41, 0x42, 0x43, 0x44, 0x45]);
        assert_eq!(ops[0].timestamp_raw, "10:00:00.000000");
        assert_eq!(ops[1].payload, vec![0x06]);
    }

    #[test]
    fn test_hex_dump_header_without_payload_dropped() {
        let input = "1234 10:00:00.000000 write(3, 0x7f, 6) = 6\n\
                     not a dump line\n\
                     1234 10:00:00.002000 read(3, 0x7f, 1) = 1\n\
                     | 0000 06 |\n";
        let (ops, _, _) = tokenize_trace(input);

        // The write header gathered no dump bytes, so only the read is
        // emitted
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].direction, Direction::FromDevice);
        assert_eq!(ops[0].payload, vec![0x06]);
    }

    #[test]
    fn test_tagged_tokenize() {
        let input = "CMD: 02 41 42\nRSP: 06\nCMD: 0243\nRSP: 15\n";
        let (ops, format, _) = tokenize_trace(input);

        assert_eq!(format, TraceFormat::Tagged);
        assert_eq!(ops.len(), 4);
        assert_eq!(ops[0].direction, Direction::ToDevice);
        assert_eq!(ops[0].payload, vec![0x02, 0x41, 0x42]);
        assert_eq!(ops[3].direction, Direction::FromDevice);
        assert_eq!(ops[3].payload, vec![0x15]);
    }

    #[test]
    fn test_tagged_leading_rsp_ignored() {
        let input = "RSP: 06\nCMD: 02\nRSP: 06\n";
        let (ops, _, _) = tokenize_trace(input);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].direction, Direction::ToDevice);
    }

    #[test]
    fn test_fallback_scan_marks_low_confidence() {
        let input = "port cmd 0241\nrx 06\n";
        let (ops, _, stats) = tokenize_trace(input);

        assert!(stats.fallback_used);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].direction, Direction::ToDevice);
        assert_eq!(ops[0].payload, vec![0x02, 0x41]);
        assert_eq!(ops[1].direction, Direction::FromDevice);
        assert_eq!(ops[1].payload, vec![0x06]);
    }

    #[test]
    fn test_parse_trace_time() {
        assert!(parse_trace_time("10:00:00.000000").is_some());
        assert!(parse_trace_time("not a time").is_none());
    }
}
