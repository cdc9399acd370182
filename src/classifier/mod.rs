//! Payload classification heuristics.
//!
//! Assigns semantic labels, data categories, and handshake flags to
//! correlated pairs. Everything here is a best guess from length,
//! entropy, and padding signatures - advisory annotations for a
//! reverse-engineer, not an authoritative protocol decode. A payload
//! always receives some label; classification never fails.

use crate::correlator::CommandResponsePair;
use crate::utils::config::{
    ACK, CHANNEL_FREQ_PATTERNS, CONFIG_PAD_PATTERNS, CONTACT_DIGIT_RATIO,
    CONTACT_PRINTABLE_RATIO, EOT, ETX, HANDSHAKE_MAX_LEN, MIN_CHANNEL_BLOCK, MIN_CONFIG_BLOCK,
    MIN_CONTACT_BLOCK, MIN_ZONE_BLOCK, NAK, SHORT_DATA_MAX_LEN, SOH, STX,
};
use log::debug;

/// One entry in the ordered classification cascade
///
/// Rules are evaluated top to bottom; the first whose predicate holds
/// supplies the label. Keeping the cascade as data makes the heuristic
/// set testable without touching call sites.
struct LabelRule {
    applies: fn(&[u8]) -> bool,
    label: fn(&[u8]) -> String,
}

/// Fixed names for the classic transmission-control bytes
fn control_label(byte: u8) -> Option<&'static str> {
    match byte {
        SOH => Some("SOH (Start of Header)"),
        STX => Some("STX (Start of Text)"),
        ETX => Some("ETX (End of Text)"),
        EOT => Some("EOT (End of Transmission)"),
        ACK => Some("ACK (Acknowledge)"),
        NAK => Some("NAK (Negative Acknowledge)"),
        0x7E => Some("Frame Start (~)"),
        _ => None,
    }
}

const COMMAND_RULES: &[LabelRule] = &[
    LabelRule {
        applies: |data| control_label(data[0]).is_some(),
        label: |data| control_label(data[0]).unwrap_or_default().to_string(),
    },
    LabelRule {
        applies: |data| data.len() > SHORT_DATA_MAX_LEN && contains_channel_data(data),
        label: |_| "Channel Data Block".to_string(),
    },
    LabelRule {
        applies: |data| data.len() > SHORT_DATA_MAX_LEN && contains_zone_data(data),
        label: |_| "Zone Data Block".to_string(),
    },
    LabelRule {
        applies: |data| data.len() > SHORT_DATA_MAX_LEN && contains_contact_data(data),
        label: |_| "Contact Data Block".to_string(),
    },
    LabelRule {
        applies: |data| data.len() > SHORT_DATA_MAX_LEN && contains_config_data(data),
        label: |_| "Configuration Block".to_string(),
    },
    LabelRule {
        applies: |data| data.len() > SHORT_DATA_MAX_LEN,
        label: |_| "Large Data Block".to_string(),
    },
    LabelRule {
        applies: |data| data.len() > HANDSHAKE_MAX_LEN,
        label: |_| "Small Data Block".to_string(),
    },
    LabelRule {
        applies: |data| (0x20..=0x7E).contains(&data[0]),
        label: |data| format!("ASCII Command '{}' (0x{:02X})", data[0] as char, data[0]),
    },
    LabelRule {
        applies: |_| true,
        label: |data| format!("Binary Command (0x{:02X})", data[0]),
    },
];

const RESPONSE_RULES: &[LabelRule] = &[
    LabelRule {
        applies: |data| control_label(data[0]).is_some(),
        label: |data| control_label(data[0]).unwrap_or_default().to_string(),
    },
    LabelRule {
        applies: |_| true,
        label: |data| format!("Binary Response (0x{:02X})", data[0]),
    },
];

/// Semantic label for a command payload
///
/// **Public** - first byte dominates; structural heuristics only apply
/// to large payloads with no control-byte match
pub fn label_command(data: &[u8]) -> String {
    if data.is_empty() {
        return "Empty".to_string();
    }
    apply_rules(COMMAND_RULES, data)
}

/// Semantic label for a response payload
pub fn label_response(data: &[u8]) -> String {
    if data.is_empty() {
        return "Empty".to_string();
    }
    apply_rules(RESPONSE_RULES, data)
}

fn apply_rules(rules: &[LabelRule], data: &[u8]) -> String {
    rules
        .iter()
        .find(|rule| (rule.applies)(data))
        .map(|rule| (rule.label)(data))
        .unwrap_or_default()
}

/// Data category of a command payload
///
/// **Public** - length buckets first, then the structural heuristics
pub fn categorize(data: &[u8]) -> String {
    let category = if data.is_empty() {
        "Unknown"
    } else if data.len() <= HANDSHAKE_MAX_LEN {
        "Control Command"
    } else if data.len() <= SHORT_DATA_MAX_LEN {
        "Short Data"
    } else if contains_channel_data(data) {
        "Channel Programming"
    } else if contains_zone_data(data) {
        "Zone Programming"
    } else if contains_contact_data(data) {
        "Contact Programming"
    } else if contains_config_data(data) {
        "System Configuration"
    } else {
        "Bulk Data"
    };
    category.to_string()
}

/// Handshake detection
///
/// **Public** - a known control-byte transition, or any exchange where
/// both sides stayed at or under four bytes. The short-length rule
/// stands on its own: tiny exchanges are handshakes whatever their
/// bytes. A command with no response is never a handshake.
pub fn is_handshake(command: &[u8], response: Option<&[u8]>) -> bool {
    let Some(response) = response else {
        return false;
    };
    if command.is_empty() || response.is_empty() {
        return false;
    }

    let transition = matches!(
        (command[0], response[0]),
        (STX, ACK) | (SOH, ACK) | (EOT, ACK) | (b'P', ACK)
    );

    transition || (command.len() <= HANDSHAKE_MAX_LEN && response.len() <= HANDSHAKE_MAX_LEN)
}

/// Annotate correlated pairs in place
///
/// **Public** - main entry point for classification
pub fn classify_pairs(pairs: &mut [CommandResponsePair]) {
    for pair in pairs.iter_mut() {
        let response_payload = pair.first_response().map(|r| r.payload.clone());
        pair.data_category = categorize(&pair.command.payload);
        pair.is_handshake = is_handshake(&pair.command.payload, response_payload.as_deref());
        pair.description = describe_pair(pair);
    }
    debug!(
        "Classified {} pairs ({} handshakes)",
        pairs.len(),
        pairs.iter().filter(|p| p.is_handshake).count()
    );
}

/// Human-readable summary of a pair
///
/// **Private** - rule cascade; only the first matching phrasing
/// applies
fn describe_pair(pair: &CommandResponsePair) -> String {
    let command_label = label_command(&pair.command.payload);
    let response_label = match pair.first_response() {
        Some(resp) => label_response(&resp.payload),
        None => "No Response".to_string(),
    };

    if pair.is_handshake {
        return format!("Handshake: {} → {}", command_label, response_label);
    }

    match pair.data_category.as_str() {
        "Channel Programming" => "Channel Programming: Writing channel configuration".to_string(),
        "Zone Programming" => "Zone Programming: Writing zone configuration".to_string(),
        "Contact Programming" => "Contact Programming: Writing contact list".to_string(),
        "System Configuration" | "Bulk Data" => {
            if response_label.contains("ACK") {
                "Data Transfer: Configuration data accepted by device".to_string()
            } else if response_label.contains("NAK") {
                "Data Transfer: Configuration data rejected by device".to_string()
            } else {
                "Data Transfer: Sending configuration to device".to_string()
            }
        }
        _ => format!("{} → {}", command_label, response_label),
    }
}

// --- structural heuristics -------------------------------------------------
//
// Best guesses given length, entropy, and padding signatures. None of
// these parse the actual record layouts.

/// Frequency-prefix byte pairs suggest channel records
fn contains_channel_data(data: &[u8]) -> bool {
    if data.len() < MIN_CHANNEL_BLOCK {
        return false;
    }
    CHANNEL_FREQ_PATTERNS
        .iter()
        .any(|pattern| contains_pattern(data, pattern))
}

/// Zone records carry channel-index lists, which show up as repeated
/// 2-byte runs. A cheap repetition detector, not a parser.
fn contains_zone_data(data: &[u8]) -> bool {
    if data.len() < MIN_ZONE_BLOCK {
        return false;
    }
    has_repeating_pairs(data)
}

/// Contact records mix call-sign text with numeric IDs
fn contains_contact_data(data: &[u8]) -> bool {
    if data.len() < MIN_CONTACT_BLOCK {
        return false;
    }
    mostly_printable(data) && has_digit_density(data)
}

/// Configuration blocks tend to carry FF FF / 00 00 padding runs
fn contains_config_data(data: &[u8]) -> bool {
    if data.len() < MIN_CONFIG_BLOCK {
        return false;
    }
    CONFIG_PAD_PATTERNS
        .iter()
        .any(|pattern| contains_pattern(data, pattern))
}

fn contains_pattern(data: &[u8], pattern: &[u8]) -> bool {
    if pattern.is_empty() || pattern.len() > data.len() {
        return false;
    }
    data.windows(pattern.len()).any(|window| window == pattern)
}

/// Any 2-byte run that appears again later in the payload
fn has_repeating_pairs(data: &[u8]) -> bool {
    if data.len() < 4 {
        return false;
    }
    for i in 0..data.len() - 3 {
        let pattern = [data[i], data[i + 1]];
        for j in (i + 2)..data.len() - 1 {
            if data[j] == pattern[0] && data[j + 1] == pattern[1] {
                return true;
            }
        }
    }
    false
}

fn mostly_printable(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let printable = data
        .iter()
        .filter(|&&b| (0x20..=0x7E).contains(&b) || b == b'\t' || b == b'\n' || b == b'\r')
        .count();
    printable as f64 / data.len() as f64 > CONTACT_PRINTABLE_RATIO
}

fn has_digit_density(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let digits = data.iter().filter(|b| b.is_ascii_digit()).count();
    digits as f64 / data.len() as f64 > CONTACT_DIGIT_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_byte_labels() {
        assert_eq!(label_command(&[0x02]), "STX (Start of Text)");
        assert_eq!(label_command(&[0x06]), "ACK (Acknowledge)");
        assert_eq!(label_response(&[0x15]), "NAK (Negative Acknowledge)");
    }

    #[test]
    fn test_ascii_command_label() {
        assert_eq!(label_command(&[b'R']), "ASCII Command 'R' (0x52)");
    }

    #[test]
    fn test_binary_labels() {
        assert_eq!(label_command(&[0xA7]), "Binary Command (0xA7)");
        assert_eq!(label_response(&[0xA7, 0x01]), "Binary Response (0xA7)");
    }

    #[test]
    fn test_first_byte_dominates_over_heuristics() {
        // 20 bytes starting with STX still labels as the control byte
        let mut data = vec![0x02];
        data.extend(std::iter::repeat(0xAA).take(19));
        assert_eq!(label_command(&data), "STX (Start of Text)");
    }

    #[test]
    fn test_zone_repetition_heuristic() {
        // 20 bytes with two AA BB runs classify as zone data
        let mut data = vec![0x31, 0xAA, 0xBB, 0x47, 0x51, 0x63, 0x71, 0x85, 0x93, 0xA1];
        data.extend_from_slice(&[0xB3, 0xC5, 0xD7, 0xAA, 0xBB, 0xE9, 0xF1, 0x2B, 0x3D, 0x4F]);
        assert_eq!(data.len(), 20);
        assert_eq!(categorize(&data), "Zone Programming");
        assert_eq!(label_command(&data), "Zone Data Block");
    }

    #[test]
    fn test_contact_heuristic() {
        // Mostly printable with heavy digit content and no repeated
        // 2-byte run (which would win as zone data first)
        let data = b"AB1C2D3E4F5G6H7I8J9K".to_vec();
        assert_eq!(data.len(), 20);
        assert_eq!(categorize(&data), "Contact Programming");
    }

    #[test]
    fn test_config_padding_heuristic() {
        let mut data: Vec<u8> = (0x80u8..0x92).collect();
        data.extend_from_slice(&[0xFF, 0xFF]);
        assert!(data.len() > 16);
        assert_eq!(categorize(&data), "System Configuration");
    }

    #[test]
    fn test_control_command_category() {
        assert_eq!(categorize(&[0x02]), "Control Command");
        assert_eq!(categorize(&[0x02, 0x41, 0x42, 0x43]), "Control Command");
    }

    #[test]
    fn test_short_data_category() {
        assert_eq!(categorize(&[0x10; 10]), "Short Data");
    }

    #[test]
    fn test_handshake_transition() {
        assert!(is_handshake(&[0x02; 8], Some(&[0x06])));
        assert!(is_handshake(&[b'P'; 8], Some(&[0x06])));
    }

    #[test]
    fn test_handshake_short_rule_dominates() {
        // Arbitrary bytes, no known transition, both sides <= 4 bytes
        assert!(is_handshake(&[0xDE, 0xAD], Some(&[0xBE, 0xEF])));
    }

    #[test]
    fn test_no_response_is_not_handshake() {
        assert!(!is_handshake(&[0x02], None));
    }

    #[test]
    fn test_long_exchange_without_transition_not_handshake() {
        assert!(!is_handshake(&[0x41; 10], Some(&[0x42; 10])));
    }
}
