use serial_trace_studio::classifier::{
    categorize, classify_pairs, is_handshake, label_command, label_response,
};
use serial_trace_studio::correlator::{correlate, PairingMode};
use serial_trace_studio::parser::{parse_trace_time, Direction, Operation};

fn op(direction: Direction, ts: &str, payload: &[u8], line: usize) -> Operation {
    Operation {
        direction,
        timestamp: parse_trace_time(ts),
        timestamp_raw: ts.to_string(),
        channel_id: "3".to_string(),
        payload: payload.to_vec(),
        source_line: line,
    }
}

#[test]
fn test_every_payload_gets_a_label() {
    // Classification is advisory and total: no byte value is ever an
    // error
    for b in 0u8..=255 {
        assert!(!label_command(&[b]).is_empty());
        assert!(!label_response(&[b]).is_empty());
    }
}

#[test]
fn test_control_byte_labels_fixed_names() {
    assert_eq!(label_command(&[0x01]), "SOH (Start of Header)");
    assert_eq!(label_command(&[0x02]), "STX (Start of Text)");
    assert_eq!(label_command(&[0x03]), "ETX (End of Text)");
    assert_eq!(label_command(&[0x04]), "EOT (End of Transmission)");
    assert_eq!(label_response(&[0x06]), "ACK (Acknowledge)");
    assert_eq!(label_response(&[0x15]), "NAK (Negative Acknowledge)");
}

#[test]
fn test_ascii_and_binary_fallback_labels() {
    assert_eq!(label_command(&[b'W', 0x00]), "ASCII Command 'W' (0x57)");
    assert_eq!(label_command(&[0x8F]), "Binary Command (0x8F)");
    assert_eq!(label_response(&[0x8F, 0x10]), "Binary Response (0x8F)");
}

#[test]
fn test_zone_repetition_classifies_twenty_byte_payload() {
    // Two repeated AA BB runs inside a 20-byte payload trip the cheap
    // repetition detector
    let payload: Vec<u8> = vec![
        0x31, 0xAA, 0xBB, 0x47, 0x51, 0x63, 0x71, 0x85, 0x93, 0xA1, 0xB3, 0xC5, 0xD7, 0xAA, 0xBB,
        0xE9, 0xF1, 0x2B, 0x3D, 0x4F,
    ];
    assert_eq!(payload.len(), 20);
    assert_eq!(categorize(&payload), "Zone Programming");
    assert_eq!(label_command(&payload), "Zone Data Block");
}

#[test]
fn test_config_padding_classification() {
    let mut payload: Vec<u8> = (0x81u8..0x93).collect();
    payload.extend_from_slice(&[0x00, 0x00]);
    assert!(payload.len() > 16);
    assert_eq!(categorize(&payload), "System Configuration");
}

#[test]
fn test_handshake_short_rule_overrides_byte_content() {
    // Rule (b): any exchange at or under four bytes per side is a
    // handshake regardless of byte values
    assert!(is_handshake(&[0x99, 0x88, 0x77, 0x66], Some(&[0x11])));
    assert!(is_handshake(&[0x41], Some(&[0x42, 0x43, 0x44, 0x45])));
    assert!(!is_handshake(&[0x99, 0x88, 0x77, 0x66, 0x55], Some(&[0x11, 0x22, 0x33, 0x44, 0x55])));
}

#[test]
fn test_handshake_control_transitions() {
    assert!(is_handshake(&[0x02, 0, 0, 0, 0, 0], Some(&[0x06])));
    assert!(is_handshake(&[0x01, 0, 0, 0, 0, 0], Some(&[0x06])));
    assert!(is_handshake(&[0x04, 0, 0, 0, 0, 0], Some(&[0x06])));
    assert!(is_handshake(&[b'P', 0, 0, 0, 0, 0], Some(&[0x06])));
    // NAK answer to a long STX is not a handshake
    assert!(!is_handshake(&[0x02, 0, 0, 0, 0, 0], Some(&[0x15])));
}

#[test]
fn test_classify_pairs_annotates_in_place() {
    let ops = vec![
        op(Direction::ToDevice, "10:00:00.000000", &[0x02], 1),
        op(Direction::FromDevice, "10:00:00.001000", &[0x06], 2),
    ];
    let mut pairs = correlate(ops, PairingMode::Strict);
    assert!(pairs[0].description.is_empty());

    classify_pairs(&mut pairs);

    assert!(pairs[0].is_handshake);
    assert_eq!(pairs[0].data_category, "Control Command");
    assert_eq!(
        pairs[0].description,
        "Handshake: STX (Start of Text) → ACK (Acknowledge)"
    );
}

#[test]
fn test_description_cascade_data_transfer() {
    let bulk: Vec<u8> = (0u8..40).map(|i| i.wrapping_mul(37).wrapping_add(11)).collect();
    let ops = vec![
        op(Direction::ToDevice, "10:00:00.000000", &bulk, 1),
        op(Direction::FromDevice, "10:00:00.001000", &[0x06], 2),
    ];
    let mut pairs = correlate(ops, PairingMode::Strict);
    classify_pairs(&mut pairs);

    assert!(!pairs[0].is_handshake);
    assert!(pairs[0]
        .description
        .starts_with("Data Transfer: Configuration data accepted"));
}

#[test]
fn test_unanswered_command_description() {
    let ops = vec![op(Direction::ToDevice, "10:00:00.000000", &[0x8F, 0, 0, 0, 0, 0], 1)];
    let mut pairs = correlate(ops, PairingMode::Strict);
    classify_pairs(&mut pairs);

    assert!(!pairs[0].is_handshake);
    assert!(pairs[0].description.contains("No Response"));
}
