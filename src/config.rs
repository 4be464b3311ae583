//! Configuration management for cook-along sessions
//!
//! Provides persistent settings storage with schema versioning and migrations.
//! Configuration is stored in `~/.cookalong/config.json` by default. All
//! timing values used by the listening loop, the narrator and the session
//! controller live here so they can be tuned without a rebuild.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current config schema version
const CURRENT_VERSION: u32 = 2;

/// Upper bound for the listening timeout (in seconds)
const MAX_LISTEN_TIMEOUT_SECONDS: u64 = 300;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown config version: {0}")]
    UnknownVersion(u32),

    #[error("Invalid setting {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookAlongConfig {
    /// Schema version for migrations
    pub version: u32,
    /// Text-to-speech voice settings
    pub voice: VoiceSettings,
    /// Hands-free listening loop settings
    pub listening: ListeningConfig,
    /// Narration timeout budget
    pub narration: NarrationConfig,
    /// Session controller settings
    pub session: SessionConfig,
    /// Question answering settings
    pub assistant: AssistantConfig,
}

impl Default for CookAlongConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            voice: VoiceSettings::default(),
            listening: ListeningConfig::default(),
            narration: NarrationConfig::default(),
            session: SessionConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

/// Voice used for speech output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Platform voice identifier (None for system default)
    pub voice: Option<String>,
    /// BCP-47 language tag
    pub language: String,
    /// Speech rate, 0.0 to 1.0
    pub rate: f32,
    /// Pitch multiplier, 0.5 to 2.0
    pub pitch: f32,
    /// Volume, 0.0 to 1.0
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: None,
            language: "en-US".to_string(),
            rate: 0.5,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Hands-free listening loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListeningConfig {
    /// Start listening automatically when a session starts
    pub hands_free: bool,
    /// Silence after a final transcript before the utterance is committed
    pub silence_threshold_ms: u64,
    /// Gap between speech output finishing and listening again
    pub restart_delay_ms: u64,
    /// Window in which a repeated identical command is suppressed
    pub command_debounce_ms: u64,
    /// Maximum length of a single listening session
    pub listen_timeout_seconds: u64,
    /// How long to wait for the controller to finish handling an utterance
    pub dispatch_timeout_seconds: u64,
}

impl Default for ListeningConfig {
    fn default() -> Self {
        Self {
            hands_free: true,
            silence_threshold_ms: 1500,
            restart_delay_ms: 800,
            command_debounce_ms: 2000,
            listen_timeout_seconds: 30,
            dispatch_timeout_seconds: 90,
        }
    }
}

impl ListeningConfig {
    pub fn silence_threshold(&self) -> Duration {
        Duration::from_millis(self.silence_threshold_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn command_debounce(&self) -> Duration {
        Duration::from_millis(self.command_debounce_ms)
    }

    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_seconds)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_seconds)
    }
}

/// Budget for waiting on speech output to finish
///
/// The wait for one utterance is `per_char_ms * chars + buffer_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub per_char_ms: u64,
    pub buffer_ms: u64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            per_char_ms: 80,
            buffer_ms: 5000,
        }
    }
}

impl NarrationConfig {
    /// Maximum time to wait for the given text to be spoken
    pub fn timeout_for(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        Duration::from_millis(
            self.per_char_ms
                .saturating_mul(chars)
                .saturating_add(self.buffer_ms),
        )
    }
}

/// Session controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Commands arriving within this window after the previous one are ignored
    pub command_guard_ms: u64,
    /// Time allowed for the goodbye message before teardown
    pub exit_delay_ms: u64,
    /// Step timer tick interval
    pub timer_tick_ms: u64,
    /// Announce timers when they are created
    pub announce_timers: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_guard_ms: 500,
            exit_delay_ms: 2500,
            timer_tick_ms: 1000,
            announce_timers: true,
        }
    }
}

impl SessionConfig {
    pub fn command_guard(&self) -> Duration {
        Duration::from_millis(self.command_guard_ms)
    }

    pub fn exit_delay(&self) -> Duration {
        Duration::from_millis(self.exit_delay_ms)
    }

    pub fn timer_tick(&self) -> Duration {
        Duration::from_millis(self.timer_tick_ms)
    }
}

/// Question answering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Ollama model used by the default answer service
    pub model: String,
    /// Ollama server URL
    pub base_url: String,
    /// Upper bound on waiting for an answer
    pub answer_timeout_seconds: u64,
    /// Number of previous messages included as conversation context
    pub history_limit: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            base_url: "http://localhost:11434".to_string(),
            answer_timeout_seconds: 30,
            history_limit: 10,
        }
    }
}

impl AssistantConfig {
    pub fn answer_timeout(&self) -> Duration {
        Duration::from_secs(self.answer_timeout_seconds)
    }
}

impl CookAlongConfig {
    /// Check that every value is within its supported range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let listening = &self.listening;
        if listening.listen_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "listening.listen_timeout_seconds",
                message: "must be greater than 0".to_string(),
            });
        }
        if listening.listen_timeout_seconds > MAX_LISTEN_TIMEOUT_SECONDS {
            return Err(ConfigError::Invalid {
                field: "listening.listen_timeout_seconds",
                message: format!("cannot exceed {} seconds", MAX_LISTEN_TIMEOUT_SECONDS),
            });
        }
        if listening.silence_threshold_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "listening.silence_threshold_ms",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.session.timer_tick_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "session.timer_tick_ms",
                message: "must be greater than 0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.voice.rate) {
            return Err(ConfigError::Invalid {
                field: "voice.rate",
                message: format!("{} is outside 0.0..=1.0", self.voice.rate),
            });
        }
        if !(0.5..=2.0).contains(&self.voice.pitch) {
            return Err(ConfigError::Invalid {
                field: "voice.pitch",
                message: format!("{} is outside 0.5..=2.0", self.voice.pitch),
            });
        }
        if !(0.0..=1.0).contains(&self.voice.volume) {
            return Err(ConfigError::Invalid {
                field: "voice.volume",
                message: format!("{} is outside 0.0..=1.0", self.voice.volume),
            });
        }
        Ok(())
    }
}

/// Get the default path to the config file (~/.cookalong/config.json)
pub fn default_config_path() -> PathBuf {
    home_dir_or_fallback().join(".cookalong").join("config.json")
}

/// Get the home directory, falling back to /tmp if unavailable
fn home_dir_or_fallback() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        tracing::error!("Could not determine home directory, using /tmp");
        PathBuf::from("/tmp")
    })
}

/// Reads and writes a config file at a fixed path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(default_config_path())
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the defaults. Older schema versions are migrated
    /// and written back. Out-of-range values are rejected like on save.
    pub fn load(&self) -> Result<CookAlongConfig, ConfigError> {
        if !self.path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", self.path);
            return Ok(CookAlongConfig::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        let config: CookAlongConfig = serde_json::from_str(&contents)?;

        let original_version = config.version;
        let migrated = migrate_config(config)?;
        migrated.validate()?;
        if migrated.version != original_version {
            tracing::info!(
                "Migrated config from version {} to {}",
                original_version,
                migrated.version
            );
            self.save(&migrated)?;
        }

        Ok(migrated)
    }

    /// Load configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> CookAlongConfig {
        self.load().unwrap_or_else(|e| {
            tracing::error!("Failed to load config, using defaults: {}", e);
            CookAlongConfig::default()
        })
    }

    /// Validate and save configuration to disk
    pub fn save(&self, config: &CookAlongConfig) -> Result<(), ConfigError> {
        config.validate()?;

        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let mut config = config.clone();
        config.version = CURRENT_VERSION;
        let contents = serde_json::to_string_pretty(&config)?;
        fs::write(&self.path, contents)?;

        tracing::info!("Config saved to {:?}", self.path);
        Ok(())
    }

    /// Load the stored voice settings
    pub fn load_voice_settings(&self) -> Result<VoiceSettings, ConfigError> {
        Ok(self.load()?.voice)
    }

    /// Replace only the voice settings, keeping everything else on disk
    pub fn save_voice_settings(&self, voice: &VoiceSettings) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.voice = voice.clone();
        self.save(&config)
    }

    /// Reset the stored configuration to defaults
    pub fn reset(&self) -> Result<CookAlongConfig, ConfigError> {
        let config = CookAlongConfig::default();
        self.save(&config)?;
        tracing::info!("Config reset to defaults");
        Ok(config)
    }
}

/// Migrate configuration from older schema versions
fn migrate_config(mut config: CookAlongConfig) -> Result<CookAlongConfig, ConfigError> {
    while config.version < CURRENT_VERSION {
        config = apply_migration(config)?;
    }
    if config.version > CURRENT_VERSION {
        return Err(ConfigError::UnknownVersion(config.version));
    }
    Ok(config)
}

/// Apply a single migration step
fn apply_migration(config: CookAlongConfig) -> Result<CookAlongConfig, ConfigError> {
    match config.version {
        // Version 0 -> 1: initial schema
        0 => {
            let mut migrated = config;
            migrated.version = 1;
            Ok(migrated)
        }
        // Version 1 -> 2: the dispatch timeout was introduced; version 1
        // files carry the serde default. Older builds also allowed a zero
        // listen timeout to mean "no limit", now expressed as the maximum.
        1 => {
            let mut migrated = config;
            if migrated.listening.listen_timeout_seconds == 0 {
                migrated.listening.listen_timeout_seconds = MAX_LISTEN_TIMEOUT_SECONDS;
            }
            migrated.version = 2;
            Ok(migrated)
        }
        v => Err(ConfigError::UnknownVersion(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = CookAlongConfig::default();
        assert_eq!(config.version, CURRENT_VERSION);
        assert_eq!(config.listening.silence_threshold(), Duration::from_millis(1500));
        assert_eq!(config.listening.restart_delay(), Duration::from_millis(800));
        assert_eq!(config.listening.command_debounce(), Duration::from_millis(2000));
        assert_eq!(config.session.command_guard(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_narration_timeout_scales_with_length() {
        let narration = NarrationConfig {
            per_char_ms: 100,
            buffer_ms: 1000,
        };
        assert_eq!(narration.timeout_for(""), Duration::from_millis(1000));
        assert_eq!(narration.timeout_for("hello"), Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"version":2,"voice":{"rate":0.8}}"#;
        let config: CookAlongConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.voice.rate, 0.8);
        assert_eq!(config.voice.language, "en-US");
        assert_eq!(config.listening, ListeningConfig::default());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = CookAlongConfig::default();
        config.listening.listen_timeout_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "listening.listen_timeout_seconds", .. })
        ));

        let mut config = CookAlongConfig::default();
        config.voice.volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = CookAlongConfig::default();
        config.listening.listen_timeout_seconds = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_migrate_from_version_zero() {
        let mut config = CookAlongConfig::default();
        config.version = 0;
        config.listening.listen_timeout_seconds = 0;
        let migrated = migrate_config(config).unwrap();
        assert_eq!(migrated.version, CURRENT_VERSION);
        assert_eq!(
            migrated.listening.listen_timeout_seconds,
            MAX_LISTEN_TIMEOUT_SECONDS
        );
    }

    #[test]
    fn test_future_version_rejected() {
        let mut config = CookAlongConfig::default();
        config.version = CURRENT_VERSION + 1;
        assert!(matches!(
            migrate_config(config),
            Err(ConfigError::UnknownVersion(_))
        ));
    }
}
