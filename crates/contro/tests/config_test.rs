//! Tests for the layered configuration system.

use contro::{ControConfig, Severity};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_bundled_detector_defaults() {
    let config = ControConfig::bundled().unwrap();

    let spam = &config.modules["spam-detector"];
    assert!(spam.enabled);
    assert_eq!(spam.rate_limit("messages_per_window", 0), 5);
    assert_eq!(spam.rate_limit("window_secs", 0), 5);
    assert_eq!(spam.custom_u64("timeout_minutes", 0), 10);

    let raid = &config.modules["raid-detector"];
    assert_eq!(raid.alert_threshold, Severity::High);
    assert_eq!(raid.rate_limit("joins_per_window", 0), 10);
    assert_eq!(raid.rate_limit("lockdown_cooldown_secs", 0), 600);
}

#[test]
fn test_from_file_fills_missing_sections_with_defaults() {
    let file = write_config(
        r#"
[framework]
module_timeout_secs = 5

[modules.spam-detector]
sensitivity = 0.9
blacklist = [1001, 1002]

[modules.spam-detector.rate_limits]
messages_per_window = 3
"#,
    );

    let config = ControConfig::from_file(file.path()).unwrap();
    assert_eq!(config.framework.module_timeout_secs, 5);
    assert_eq!(config.framework.queue_capacity, 1000);
    assert_eq!(config.discord.token_env, "DISCORD_TOKEN");

    let spam = &config.modules["spam-detector"];
    assert_eq!(spam.sensitivity, 0.9);
    assert!(spam.auto_action);
    assert!(spam.blacklist.contains(&1002));
    assert_eq!(spam.rate_limit("messages_per_window", 5), 3);
    assert!(!config.modules.contains_key("raid-detector"));
}

#[test]
fn test_from_file_rejects_out_of_range_sensitivity() {
    let file = write_config(
        r#"
[modules.raid-detector]
sensitivity = 1.5
"#,
    );
    let err = ControConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("raid-detector"));
}

#[test]
fn test_from_file_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(ControConfig::from_file(&missing).is_err());
}

#[test]
fn test_rendered_config_parses_back() {
    let config = ControConfig::bundled().unwrap();
    let rendered = config.to_toml().unwrap();
    assert!(rendered.contains("[framework]"));

    let file = write_config(&rendered);
    let reloaded = ControConfig::from_file(file.path()).unwrap();
    assert_eq!(reloaded, config);
}
