// Configuration defaults, file layering and validation

use std::io::Write;
use std::time::Duration;

use live_translate::config::{resolve_api_key, Config, Eagerness, TurnDetection};
use live_translate::StreamError;

#[test]
fn test_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.audio.sample_rate, 24_000);
    assert_eq!(cfg.audio.channels, 1);
    assert_eq!(cfg.audio.frame_size, 2_400);
    assert_eq!(cfg.pump.commit_every, Some(20));
    assert_eq!(cfg.pump.response_every, Some(40));
    assert_eq!(cfg.session.turn_detection, TurnDetection::None);
    assert!(cfg.validate().is_ok());

    let bridge = cfg.bridge_config();
    assert_eq!(bridge.poll_interval, Duration::from_millis(100));
    assert_eq!(bridge.join_timeout, Duration::from_secs(1));
    assert_eq!(bridge.params.frame_bytes(), 4_800);

    let pump = cfg.pump_config();
    assert_eq!(pump.receive_timeout, Duration::from_millis(500));
}

#[test]
fn test_load_from_file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[audio]
frame_size = 4800

[pump]
commit_every = 0
response_every = 10

[session]
turn_detection = "semantic_vad"
eagerness = "low"
"#
    )
    .unwrap();

    let cfg = Config::load(Some(file.path())).unwrap();

    assert_eq!(cfg.audio.frame_size, 4_800);
    assert_eq!(cfg.audio.sample_rate, 24_000, "unset keys keep defaults");
    assert_eq!(cfg.session.turn_detection, TurnDetection::SemanticVad);
    assert_eq!(cfg.session.eagerness, Eagerness::Low);

    let pump = cfg.pump_config();
    assert_eq!(pump.commit_every, None, "zero disables the cadence");
    assert_eq!(pump.response_every, Some(10));
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(Config::load(Some(&missing)).is_err());
}

#[test]
fn test_invalid_file_values_rejected() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[audio]\nchannels = 2").unwrap();

    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("channels"));
}

#[test]
fn test_validate_rejects_zero_frame_size() {
    let mut cfg = Config::default();
    cfg.audio.frame_size = 0;
    assert!(matches!(cfg.validate(), Err(StreamError::Config { .. })));
}

#[test]
fn test_validate_rejects_zero_waits() {
    let mut cfg = Config::default();
    cfg.audio.poll_interval_ms = 0;
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"));

    let mut cfg = Config::default();
    cfg.service.handshake_timeout_ms = 0;
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("handshake_timeout_ms"));
}

#[test]
fn test_environment_overrides_file() {
    std::env::set_var("LIVE_TRANSLATE__SERVICE__MODEL", "gpt-test-model");
    let cfg = Config::load(None).unwrap();
    std::env::remove_var("LIVE_TRANSLATE__SERVICE__MODEL");

    assert_eq!(cfg.service.model, "gpt-test-model");
}

#[test]
fn test_explicit_api_key_wins() {
    assert_eq!(resolve_api_key(Some("sk-explicit".to_string())).unwrap(), "sk-explicit");
    assert!(matches!(
        resolve_api_key(Some("  ".to_string())),
        Err(StreamError::Config { .. })
    ));
}

#[test]
fn test_microphone_capture_enabled_by_default() {
    let manifest =
        std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml")).unwrap();
    let defaults = manifest
        .lines()
        .find(|line| line.trim_start().starts_with("default ="))
        .expect("default feature list");
    assert!(defaults.contains("\"cpal-audio\""), "{}", defaults);
}
