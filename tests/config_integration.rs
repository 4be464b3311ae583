//! Configuration store integration tests.
//!
//! Exercises loading, saving, migration and reset through `ConfigStore`
//! using temporary directories to avoid touching the real config.

use cookalong_lib::config::{ConfigError, ConfigStore, CookAlongConfig, VoiceSettings};
use std::fs;
use tempfile::TempDir;

fn store() -> (TempDir, ConfigStore) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = ConfigStore::new(dir.path().join("config.json"));
    (dir, store)
}

// =============================================================================
// Load and Save
// =============================================================================

#[test]
fn test_load_nonexistent_config_returns_defaults() {
    let (_dir, store) = store();

    let config = store.load().expect("Failed to load");
    assert_eq!(config, CookAlongConfig::default());
    assert!(!store.path().exists());
}

#[test]
fn test_save_and_load_config() {
    let (_dir, store) = store();

    let mut config = CookAlongConfig::default();
    config.voice.rate = 0.7;
    config.voice.voice = Some("com.apple.voice.Samantha".to_string());
    config.listening.hands_free = false;
    config.session.exit_delay_ms = 1000;
    config.assistant.model = "mistral".to_string();

    store.save(&config).expect("Failed to save");
    let loaded = store.load().expect("Failed to load");

    assert_eq!(loaded, config);
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = ConfigStore::new(dir.path().join("nested").join("deeper").join("config.json"));

    store
        .save(&CookAlongConfig::default())
        .expect("Failed to save");
    assert!(store.path().exists());
}

#[test]
fn test_saved_config_is_pretty_printed() {
    let (_dir, store) = store();
    store
        .save(&CookAlongConfig::default())
        .expect("Failed to save");

    let contents = fs::read_to_string(store.path()).expect("Failed to read");
    assert!(contents.contains('\n'));
    assert!(contents.contains("\"listening\""));
    assert!(contents.contains("\"command_debounce_ms\": 2000"));
}

#[test]
fn test_invalid_config_is_not_saved() {
    let (_dir, store) = store();

    let mut config = CookAlongConfig::default();
    config.voice.pitch = 3.0;

    assert!(matches!(
        store.save(&config),
        Err(ConfigError::Invalid {
            field: "voice.pitch",
            ..
        })
    ));
    assert!(!store.path().exists());
}

#[test]
fn test_reset_config() {
    let (_dir, store) = store();

    let mut config = CookAlongConfig::default();
    config.session.announce_timers = false;
    store.save(&config).expect("Failed to save");

    let reset = store.reset().expect("Failed to reset");
    assert_eq!(reset, CookAlongConfig::default());
    assert_eq!(store.load().expect("Failed to load"), reset);
}

#[test]
fn test_multiple_saves_dont_corrupt() {
    let (_dir, store) = store();

    for i in 0..10u64 {
        let mut config = CookAlongConfig::default();
        config.session.command_guard_ms = 100 * i;
        store.save(&config).expect("Failed to save");
    }

    let loaded = store.load().expect("Failed to load");
    assert_eq!(loaded.session.command_guard_ms, 900);
}

// =============================================================================
// Voice Settings
// =============================================================================

#[test]
fn test_voice_settings_saved_without_touching_other_sections() {
    let (_dir, store) = store();

    let mut config = CookAlongConfig::default();
    config.listening.silence_threshold_ms = 2200;
    store.save(&config).expect("Failed to save");

    let voice = VoiceSettings {
        voice: Some("en-GB-female".to_string()),
        language: "en-GB".to_string(),
        rate: 0.4,
        pitch: 1.2,
        volume: 0.8,
    };
    store.save_voice_settings(&voice).expect("Failed to save voice");

    assert_eq!(store.load_voice_settings().expect("Failed to load"), voice);
    let loaded = store.load().expect("Failed to load");
    assert_eq!(loaded.listening.silence_threshold_ms, 2200);
}

// =============================================================================
// Versioning
// =============================================================================

#[test]
fn test_old_version_is_migrated_and_written_back() {
    let (_dir, store) = store();
    fs::write(
        store.path(),
        r#"{"version": 1, "listening": {"listen_timeout_seconds": 0}}"#,
    )
    .expect("Failed to write");

    let config = store.load().expect("Failed to load");
    assert_eq!(config.version, CookAlongConfig::default().version);
    assert_eq!(config.listening.listen_timeout_seconds, 300);

    let on_disk: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).expect("Failed to read"))
            .expect("Failed to parse");
    assert_eq!(on_disk["version"], CookAlongConfig::default().version);
}

#[test]
fn test_future_version_is_rejected() {
    let (_dir, store) = store();
    fs::write(store.path(), r#"{"version": 99}"#).expect("Failed to write");

    assert!(matches!(store.load(), Err(ConfigError::UnknownVersion(99))));
    assert_eq!(store.load_or_default(), CookAlongConfig::default());
}

// =============================================================================
// Edge Cases
// =============================================================================

#[test]
fn test_config_handles_invalid_json() {
    let (_dir, store) = store();
    fs::write(store.path(), "{ not valid json").expect("Failed to write");

    assert!(matches!(store.load(), Err(ConfigError::Parse(_))));
    assert_eq!(store.load_or_default(), CookAlongConfig::default());
}

#[test]
fn test_out_of_range_values_on_disk_are_rejected() {
    let (_dir, store) = store();
    fs::write(store.path(), r#"{"version": 2, "session": {"timer_tick_ms": 0}}"#)
        .expect("Failed to write");

    assert!(matches!(
        store.load(),
        Err(ConfigError::Invalid {
            field: "session.timer_tick_ms",
            ..
        })
    ));
    let config = store.load_or_default();
    assert_eq!(config, CookAlongConfig::default());
    assert!(config.session.timer_tick_ms > 0);
}

#[test]
fn test_config_with_unknown_fields() {
    let (_dir, store) = store();
    fs::write(
        store.path(),
        r#"{"version": 2, "session": {"exit_delay_ms": 4000, "confetti": true}, "theme": "dark"}"#,
    )
    .expect("Failed to write");

    let config = store.load().expect("Failed to load");
    assert_eq!(config.session.exit_delay_ms, 4000);
    assert_eq!(config.session.command_guard_ms, 500);
}
