//! Configuration tests

use settlement::config::SettlementConfig;

// ============================================================================
// PARSING AND DEFAULTS
// ============================================================================

/// What is tested: a minimal config parses with all defaults applied
/// Why: operators should only have to name the endpoints
#[test]
fn test_minimal_config_uses_defaults() {
    let config = SettlementConfig::from_toml_str(
        r#"
        [chain]
        rpc_url = "http://localhost:8899"

        [scorer]
        url = "http://localhost:9000/score"

        [wallets]
        url = "http://localhost:9100"
        "#,
    )
    .unwrap();

    assert_eq!(config.chain.rpc_url, "http://localhost:8899");
    assert_eq!(config.program_id().unwrap(), reply_escrow::id());
    assert!(config.scorer.fallback_url.is_none());
    assert_eq!(config.scorer.timeout_ms, 30_000);
    assert_eq!(config.confirmation.max_attempts, 30);
    assert_eq!(config.confirmation.interval_ms, 3_000);
    assert_eq!(config.discovery.scan_limit, 25);
}

/// What is tested: every default can be overridden
#[test]
fn test_full_config_overrides_defaults() {
    let config = SettlementConfig::from_toml_str(
        r#"
        [chain]
        rpc_url = "https://api.devnet.solana.com"
        program_id = "11111111111111111111111111111111"

        [scorer]
        url = "https://scorer.example.com/v1/score"
        fallback_url = "https://backup.example.com/v1/score"
        timeout_ms = 5000

        [confirmation]
        max_attempts = 10
        interval_ms = 500

        [discovery]
        scan_limit = 50

        [wallets]
        url = "https://directory.example.com"
        "#,
    )
    .unwrap();

    assert_eq!(
        config.program_id().unwrap(),
        solana_sdk::system_program::id()
    );
    assert_eq!(
        config.scorer.fallback_url.as_deref(),
        Some("https://backup.example.com/v1/score")
    );
    assert_eq!(config.scorer.timeout_ms, 5_000);
    assert_eq!(config.confirmation.max_attempts, 10);
    assert_eq!(config.confirmation.interval_ms, 500);
    assert_eq!(config.discovery.scan_limit, 50);
}

/// What is tested: a bad program id fails at config time, not first use
#[test]
fn test_invalid_program_id_rejected() {
    let config = SettlementConfig::from_toml_str(
        r#"
        [chain]
        rpc_url = "http://localhost:8899"
        program_id = "not-a-pubkey"

        [scorer]
        url = "http://localhost:9000/score"

        [wallets]
        url = "http://localhost:9100"
        "#,
    )
    .unwrap();
    assert!(config.program_id().is_err());
}

/// What is tested: a config missing a required section fails to parse
#[test]
fn test_missing_section_is_an_error() {
    let result = SettlementConfig::from_toml_str(
        r#"
        [chain]
        rpc_url = "http://localhost:8899"
        "#,
    );
    assert!(result.is_err());
}
