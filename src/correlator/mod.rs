//! Command/response correlation.
//!
//! Pairs the flat operation sequence into command-response records
//! using adjacency: a write opens a pair, following reads answer it.
//! Pair order always equals the order commands appeared in the trace;
//! the aggregator's first-occurrence bookkeeping depends on that.

use crate::parser::{Direction, Operation};
use log::debug;
use std::fmt;

/// How many responses a single command may claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingMode {
    /// Only the immediately following operation, when it is a read.
    /// One-to-one pairing for chatty command/ack protocols.
    Strict,
    /// The whole contiguous run of reads that follows. Dump-style
    /// traces answer one command with several reads.
    ContiguousRun,
}

/// Wall-clock distance between a command and its first response
///
/// `Unknown` is an explicit sentinel for missing or unparseable
/// timestamps; it is never rendered as a zero that could pass for a
/// real near-zero latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeDelta {
    Known(chrono::Duration),
    Unknown,
}

impl TimeDelta {
    /// Microseconds when the delta is known
    pub fn micros(&self) -> Option<i64> {
        match self {
            TimeDelta::Known(d) => Some(d.num_microseconds().unwrap_or(i64::MAX)),
            TimeDelta::Unknown => None,
        }
    }
}

impl fmt::Display for TimeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.micros() {
            Some(us) => write!(f, "{}", crate::aggregator::format_micros(us)),
            None => write!(f, "unknown"),
        }
    }
}

/// One command and the responses attributed to it
///
/// Created here; the classification fields start empty and are filled
/// in place by the classifier. Read-only from the aggregator onward.
#[derive(Debug, Clone)]
pub struct CommandResponsePair {
    pub command: Operation,
    pub responses: Vec<Operation>,
    pub time_delta: TimeDelta,
    pub is_handshake: bool,
    pub data_category: String,
    pub description: String,
}

impl CommandResponsePair {
    /// First response, which most call sites care about
    pub fn first_response(&self) -> Option<&Operation> {
        self.responses.first()
    }
}

/// Pair operations into command-response records
///
/// **Public** - main entry point for correlation
///
/// Scans in original order. Each write opens a pair; reads are
/// attached per `mode`. A command with no following read still yields
/// a pair with an empty response list - an unanswered command is a
/// meaningful protocol fact.
pub fn correlate(operations: Vec<Operation>, mode: PairingMode) -> Vec<CommandResponsePair> {
    let mut pairs: Vec<CommandResponsePair> = Vec::new();

    let mut i = 0;
    while i < operations.len() {
        let op = &operations[i];
        if op.direction != Direction::ToDevice {
            // A read with no open command has nothing to attach to
            i += 1;
            continue;
        }

        let mut responses = Vec::new();
        let mut j = i + 1;
        match mode {
            PairingMode::Strict => {
                if j < operations.len() && operations[j].direction == Direction::FromDevice {
                    responses.push(operations[j].clone());
                    j += 1;
                }
            }
            PairingMode::ContiguousRun => {
                while j < operations.len() && operations[j].direction == Direction::FromDevice {
                    responses.push(operations[j].clone());
                    j += 1;
                }
            }
        }

        let time_delta = compute_time_delta(op, responses.first());
        pairs.push(CommandResponsePair {
            command: op.clone(),
            responses,
            time_delta,
            is_handshake: false,
            data_category: String::new(),
            description: String::new(),
        });

        i = j.max(i + 1);
    }

    debug!("Correlated {} pairs from {} operations", pairs.len(), operations.len());
    pairs
}

/// Delta between command and first response timestamps
///
/// **Private** - internal helper for correlate
fn compute_time_delta(command: &Operation, first_response: Option<&Operation>) -> TimeDelta {
    match (command.timestamp, first_response.and_then(|r| r.timestamp)) {
        (Some(cmd_ts), Some(resp_ts)) => TimeDelta::Known(resp_ts - cmd_ts),
        _ => TimeDelta::Unknown,
    }
}
