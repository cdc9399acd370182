//! Configuration and constants for the analysis pipeline.

/// Current catalog schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Transmission-control bytes used for framing and acknowledgment
// in the captured protocols
pub const SOH: u8 = 0x01; // Start of Header
pub const STX: u8 = 0x02; // Start of Text
pub const ETX: u8 = 0x03; // End of Text
pub const EOT: u8 = 0x04; // End of Transmission
pub const ENQ: u8 = 0x05; // Enquiry
pub const ACK: u8 = 0x06; // Acknowledge
pub const NAK: u8 = 0x15; // Negative Acknowledge
pub const SYN: u8 = 0x16; // Synchronous Idle
pub const ETB: u8 = 0x17; // End of Transmission Block
pub const CAN: u8 = 0x18; // Cancel

// Payload length thresholds for classification
// A payload at or below HANDSHAKE_MAX_LEN on both sides is a handshake
pub const HANDSHAKE_MAX_LEN: usize = 4;
pub const SHORT_DATA_MAX_LEN: usize = 16;

// Minimum lengths before the structural heuristics are considered
pub const MIN_CHANNEL_BLOCK: usize = 32;
pub const MIN_ZONE_BLOCK: usize = 16;
pub const MIN_CONTACT_BLOCK: usize = 8;
pub const MIN_CONFIG_BLOCK: usize = 4;

// Byte pairs that tend to prefix frequency fields in channel blocks
pub const CHANNEL_FREQ_PATTERNS: &[&[u8]] = &[&[0x43, 0x36], &[0x44, 0x36]];

// Padding runs common in configuration blocks
pub const CONFIG_PAD_PATTERNS: &[&[u8]] = &[&[0xFF, 0xFF], &[0x00, 0x00]];

// Ratio thresholds for the contact-data heuristic
pub const CONTACT_PRINTABLE_RATIO: f64 = 0.7;
pub const CONTACT_DIGIT_RATIO: f64 = 0.25;

/// Timestamp layout recorded by syscall traces (HH:MM:SS.ffffff)
pub const TRACE_TIME_FORMAT: &str = "%H:%M:%S%.f";
