//! Trace format detection.
//!
//! Capture files arrive in several dialects. Detection is content
//! based: the first operation-like line decides which tokenizer
//! grammar applies.

use log::debug;
use regex::Regex;
use std::sync::OnceLock;

/// Detected trace grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    /// Syscall trace with inline escaped payload literals
    /// (`PID HH:MM:SS.ffffff write(FD, "\x02..", N) = N`)
    Syscall,
    /// Syscall header lines followed by fixed-width hex-dump lines
    HexDump,
    /// `CMD:`/`RSP:` prefixed raw hex lines
    Tagged,
}

impl TraceFormat {
    /// Human-readable grammar name for diagnostics and catalog output
    pub fn name(&self) -> &'static str {
        match self {
            TraceFormat::Syscall => "syscall-trace",
            TraceFormat::HexDump => "hex-dump",
            TraceFormat::Tagged => "tagged",
        }
    }
}

/// Matches a read/write syscall header, with or without inline payload
pub(crate) fn syscall_header_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:\d+\s+)?(\d{2}:\d{2}:\d{2}\.\d+)\s+(read|write)\((\d+)")
            .expect("syscall header pattern is valid")
    })
}

/// Matches a syscall line carrying its payload as a quoted literal
pub(crate) fn syscall_inline_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i)^(?:\d+\s+)?(\d{2}:\d{2}:\d{2}\.\d+)\s+(read|write)\((\d+),\s*"([^"]*)"(?:\.\.\.)?,\s*\d+\)\s*=\s*(-?\d+)"#,
        )
        .expect("syscall inline pattern is valid")
    })
}

/// Matches a `CMD:`/`RSP:` tagged line
pub(crate) fn tagged_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(CMD|RSP):\s*([0-9a-f\s]+)$").expect("tagged pattern is valid")
    })
}

/// Matches one hex-dump detail line (`| 0000 02 41 42 ... |`)
pub(crate) fn hex_dump_line_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\|\s*[0-9a-fA-F]+\s+((?:[0-9a-fA-F]{2}\s+)+).*\|")
            .expect("hex dump pattern is valid")
    })
}

/// Decide which tokenizer grammar applies to a trace
///
/// **Public** - called once per trace before tokenizing
///
/// Scans for the first non-empty line that looks like an operation.
/// A `CMD:`/`RSP:` prefix selects the tagged grammar; a syscall header
/// with an inline quoted literal selects the syscall grammar; a bare
/// syscall header selects the hex-dump grammar. If nothing recognizable
/// appears, defaults to the syscall grammar rather than failing.
pub fn detect_format(lines: &[&str]) -> TraceFormat {
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if tagged_regex().is_match(line) {
            debug!("Detected tagged CMD/RSP trace format");
            return TraceFormat::Tagged;
        }

        if syscall_header_regex().is_match(line) {
            let format = if syscall_inline_regex().is_match(line) {
                TraceFormat::Syscall
            } else {
                TraceFormat::HexDump
            };
            debug!("Detected {} trace format", format.name());
            return format;
        }

        // First non-empty line is not operation-like; keep scanning in
        // case the capture starts with banner text
    }

    debug!("No recognizable header found, defaulting to syscall-trace format");
    TraceFormat::Syscall
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_syscall_inline() {
        let lines = vec![r#"10:00:00.000000 write(3, "\x02\x41", 2) = 2"#];
        assert_eq!(detect_format(&lines), TraceFormat::Syscall);
    }

    #[test]
    fn test_detect_syscall_with_pid() {
        let lines = vec![r#"1234 10:00:00.000000 read(3, "\x06", 1) = 1"#];
        assert_eq!(detect_format(&lines), TraceFormat::Syscall);
    }

    #[test]
    fn test_detect_hex_dump() {
        let lines = vec![
            "1234 10:00:00.000000 write(3, 0x7f, 16) = 16",
            " | 0000 02 41 42 |",
        ];
        assert_eq!(detect_format(&lines), TraceFormat::HexDump);
    }

    #[test]
    fn test_detect_tagged() {
        let lines = vec!["CMD: 02 41 42", "RSP: 06"];
        assert_eq!(detect_format(&lines), TraceFormat::Tagged);
    }

    #[test]
    fn test_detect_defaults_to_syscall() {
        let lines = vec!["some banner text", "more text"];
        assert_eq!(detect_format(&lines), TraceFormat::Syscall);
    }

    #[test]
    fn test_detect_skips_blank_lines() {
        let lines = vec!["", "  ", "cmd: 0241"];
        assert_eq!(detect_format(&lines), TraceFormat::Tagged);
    }
}
