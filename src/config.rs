//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::actions::MediaAction;
use crate::binding::BindingSpec;
use crate::engine::EngineConfig;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "GLOBAL_CHORDS_CONFIG";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Where hotkeys were read from, whether or not the file exists
    pub config_path: PathBuf,

    /// Polling loop timing
    pub engine: EngineConfig,

    /// Hotkeys to register at startup
    pub hotkeys: Vec<HotkeyConfig>,
}

/// One configured hotkey
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HotkeyConfig {
    pub action: MediaAction,
    pub binding: BindingSpec,
    #[serde(default = "default_partial_release")]
    pub actuate_on_partial_release: bool,
    /// Disabled hotkeys keep their binding but are not registered
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl HotkeyConfig {
    /// Whether the binding was left blank
    pub fn is_unset(&self) -> bool {
        self.binding.is_unset()
    }
}

fn default_partial_release() -> bool {
    true
}

fn default_enabled() -> bool {
    true
}

/// On-disk layout of `config.json`
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigFile {
    tick_interval_ms: u64,
    restart_delay_ms: u64,
    hotkeys: Vec<HotkeyConfig>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            tick_interval_ms: engine.tick_interval.as_millis() as u64,
            restart_delay_ms: engine.restart_delay.as_millis() as u64,
            hotkeys: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("neither HOME nor USERPROFILE is set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("global-chords");

        let config_path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => data_dir.join("config.json"),
        };

        Self::load_from(data_dir, config_path)
    }

    /// Load using explicit locations. A missing config file yields defaults.
    pub fn load_from(data_dir: PathBuf, config_path: PathBuf) -> Result<Self> {
        let file = read_config_file(&config_path)?;

        if file.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be greater than zero");
        }

        Ok(Self {
            socket_path: data_dir.join("daemon.sock"),
            data_dir,
            config_path,
            engine: EngineConfig {
                tick_interval: Duration::from_millis(file.tick_interval_ms),
                restart_delay: Duration::from_millis(file.restart_delay_ms),
            },
            hotkeys: file.hotkeys,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        debug!(?path, "no config file, using defaults");
        return Ok(ConfigFile::default());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid config in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config =
            Config::load_from(dir.path().to_owned(), dir.path().join("config.json")).unwrap();

        assert_eq!(config.socket_path, dir.path().join("daemon.sock"));
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.hotkeys.is_empty());
    }

    #[test]
    fn test_config_file_parsing() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "tick_interval_ms": 15,
                "hotkeys": [
                    {"action": "play_pause", "binding": "control+alt+p"},
                    {"action": "next_track", "binding": [["control", "k"], ["n"]],
                     "actuate_on_partial_release": false},
                    {"action": "mute", "binding": ""},
                    {"action": "toggle_shuffle", "binding": "control+s", "enabled": false}
                ]
            }"#,
        );

        let config = Config::load_from(dir.path().to_owned(), path).unwrap();
        assert_eq!(config.engine.tick_interval, Duration::from_millis(15));
        assert_eq!(config.engine.restart_delay, Duration::from_millis(700));
        assert_eq!(config.hotkeys.len(), 4);

        let play = &config.hotkeys[0];
        assert_eq!(play.action, MediaAction::PlayPause);
        assert!(play.actuate_on_partial_release);
        assert!(play.enabled);
        assert_eq!(play.binding.resolve().unwrap().to_string(), "control+alt+p");

        let next = &config.hotkeys[1];
        assert!(!next.actuate_on_partial_release);
        assert!(next.binding.resolve().unwrap().is_sequence());

        assert!(config.hotkeys[2].is_unset());

        let shuffle = &config.hotkeys[3];
        assert!(!shuffle.enabled);
        assert_eq!(shuffle.binding.resolve().unwrap().to_string(), "control+s");
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"hotkeys": [{"action": "rewind"}]}"#);
        let err = Config::load_from(dir.path().to_owned(), path).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"tick_interval_ms": 0}"#);
        assert!(Config::load_from(dir.path().to_owned(), path).is_err());
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let config = Config::load_from(data_dir.clone(), data_dir.join("config.json")).unwrap();
        config.ensure_dirs().unwrap();
        assert!(data_dir.is_dir());
    }
}
