//! Unit tests for CLI parsing functions

use reply_escrow_cli::{parse_options, parse_thread_id, parse_u64, required_option};
use std::collections::HashMap;

// ============================================================================
// parse_thread_id TESTS
// ============================================================================

/// What is tested: parse_thread_id with a full 32-byte hex id with 0x prefix
/// Why: This is the format embedded in outgoing message metadata. Incorrect
/// parsing would derive the wrong escrow address.
#[test]
fn test_parse_thread_id_full_length() {
    let input = "0x000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    let result = parse_thread_id(input).unwrap();
    assert_eq!(result[0], 0x00);
    assert_eq!(result[15], 0x0f);
    assert_eq!(result[31], 0x1f);
}

/// What is tested: parse_thread_id without 0x prefix
/// Why: Users may copy ids without the prefix. Rejecting these would cause
/// unnecessary CLI failures.
#[test]
fn test_parse_thread_id_without_prefix() {
    let input = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    let result = parse_thread_id(input).unwrap();
    assert_eq!(result[0], 0x00);
    assert_eq!(result[31], 0x1f);
}

/// What is tested: parse_thread_id left-pads short input with zeros
/// Why: Short ids must still produce a stable 32-byte derivation input.
#[test]
fn test_parse_thread_id_short_input_pads_left() {
    let result = parse_thread_id("0x1234").unwrap();
    for (i, byte) in result.iter().enumerate().take(30) {
        assert_eq!(*byte, 0, "byte {i} should be 0");
    }
    assert_eq!(result[30], 0x12);
    assert_eq!(result[31], 0x34);
}

/// What is tested: parse_thread_id pads odd-length hex strings
/// Why: "0xabc" should parse as 0x0abc, not fail on odd nibble count.
#[test]
fn test_parse_thread_id_odd_length() {
    let result = parse_thread_id("0xabc").unwrap();
    assert_eq!(result[30], 0x0a);
    assert_eq!(result[31], 0xbc);
}

/// What is tested: parse_thread_id rejects ids longer than 32 bytes
/// Why: Accepting oversized input would silently truncate, deriving an
/// unintended escrow address.
#[test]
fn test_parse_thread_id_rejects_too_long() {
    let input = "0x0001020304050607080910111213141516171819202122232425262728293031ff";
    let result = parse_thread_id(input);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("too long"));
}

/// What is tested: parse_thread_id rejects invalid hex characters
/// Why: Invalid hex must propagate as a clear error rather than garbage bytes.
#[test]
fn test_parse_thread_id_rejects_invalid_hex() {
    assert!(parse_thread_id("0xZZZZ").is_err());
}

// ============================================================================
// parse_u64 TESTS
// ============================================================================

/// What is tested: parse_u64 accepts boundary values
/// Why: Lamport amounts use the full u64 range.
#[test]
fn test_parse_u64_valid() {
    assert_eq!(parse_u64("0").unwrap(), 0);
    assert_eq!(parse_u64("1000000").unwrap(), 1_000_000);
    assert_eq!(parse_u64("18446744073709551615").unwrap(), u64::MAX);
}

/// What is tested: parse_u64 rejects negative and non-numeric input
/// Why: Amounts cannot be negative; typos must fail clearly.
#[test]
fn test_parse_u64_rejects_invalid() {
    assert!(parse_u64("-1").is_err());
    assert!(parse_u64("one").is_err());
    assert!(parse_u64("18446744073709551616").is_err());
}

// ============================================================================
// OPTION PARSING TESTS
// ============================================================================

/// What is tested: parse_options maps --key value pairs
/// Why: Every command handler reads its inputs through this map.
#[test]
fn test_parse_options_basic() {
    let args: Vec<String> = ["--thread-id", "0x01", "--amount", "5"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let options = parse_options(&args).unwrap();
    assert_eq!(options.get("thread-id").unwrap(), "0x01");
    assert_eq!(options.get("amount").unwrap(), "5");
}

/// What is tested: parse_options rejects a key without a value
/// Why: A dangling flag indicates a malformed invocation.
#[test]
fn test_parse_options_missing_value() {
    let args: Vec<String> = ["--thread-id"].iter().map(|s| s.to_string()).collect();
    assert!(parse_options(&args).is_err());
}

/// What is tested: parse_options rejects positional arguments
/// Why: All inputs are named; silent positional acceptance would hide typos.
#[test]
fn test_parse_options_rejects_positional() {
    let args: Vec<String> = ["thread-id", "0x01"].iter().map(|s| s.to_string()).collect();
    assert!(parse_options(&args).is_err());
}

/// What is tested: required_option error message names the missing key
/// Why: The operator must see which flag to add.
#[test]
fn test_required_option_missing() {
    let options = HashMap::new();
    let err = required_option(&options, "sender").unwrap_err();
    assert!(err.to_string().contains("--sender"));
}
