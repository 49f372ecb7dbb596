use std::io::Write;

use super::*;
use crate::cache::FailurePolicy;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.cache.failure_policy, FailurePolicy::Terminal);
    assert_eq!(settings.network.base_url.as_str(), DEFAULT_BASE_URL);
    assert_eq!(settings.network.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    assert!(settings.network.user_agent.starts_with("fetch-cache/"));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.network.timeout_ms = Some(0);

    let err = Settings::from_raw(raw).expect_err("invalid timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "network.timeout_ms",
            ..
        }
    ));
}

#[test]
fn unparseable_base_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.network.base_url = Some("not a url".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "network.base_url",
            ..
        }
    ));
}

#[test]
fn non_base_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.network.base_url = Some("mailto:ops@example.com".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_user_agent_falls_back_to_default() {
    let mut raw = RawSettings::default();
    raw.network.user_agent = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.network.user_agent, DEFAULT_USER_AGENT);
}

#[test]
fn bad_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn json_logging_selects_json_format() {
    let mut raw = RawSettings::default();
    raw.logging.json = Some(true);
    raw.logging.level = Some("debug".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(settings.logging.format, LogFormat::Json));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn explicit_file_is_layered_in() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        r#"
[cache]
failure_policy = "retry"

[network]
base_url = "https://api.example.com/v1/"
timeout_ms = 2500

[logging]
level = "warn"
"#
    )
    .expect("write config");

    let settings = load(Some(file.path())).expect("settings load");

    assert_eq!(settings.cache.failure_policy, FailurePolicy::Retry);
    assert_eq!(
        settings.network.base_url.as_str(),
        "https://api.example.com/v1/"
    );
    assert_eq!(settings.network.timeout, Duration::from_millis(2500));
    assert_eq!(settings.logging.level, LevelFilter::WARN);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.toml");

    assert!(matches!(load(Some(&missing)), Err(LoadError::Build(_))));
}
