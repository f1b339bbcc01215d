//! TOML-based application configuration.
//!
//! Holds the defaults applied to newly created alarms and timers: snooze
//! duration and cap, pre-alarm spacing, volume behavior. Stored at
//! `~/.config/reveille/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::model::Alarm;

/// Defaults for new alarms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmDefaults {
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
    #[serde(default = "default_max_snooze_count")]
    pub max_snooze_count: u32,
    #[serde(default = "default_pre_alarm_interval")]
    pub pre_alarm_interval_minutes: u32,
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default = "default_true")]
    pub gradual_volume: bool,
    #[serde(default = "default_true")]
    pub vibrate: bool,
}

/// Defaults for new timers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerDefaults {
    #[serde(default = "default_true")]
    pub vibrate: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/reveille/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alarm: AlarmDefaults,
    #[serde(default)]
    pub timer: TimerDefaults,
    /// Render clock faces in 24-hour format.
    #[serde(default)]
    pub use_24h: bool,
}

fn default_snooze_minutes() -> u32 {
    10
}
fn default_max_snooze_count() -> u32 {
    3
}
fn default_pre_alarm_interval() -> u32 {
    7
}
fn default_volume() -> u8 {
    80
}
fn default_true() -> bool {
    true
}

impl Default for AlarmDefaults {
    fn default() -> Self {
        Self {
            snooze_minutes: default_snooze_minutes(),
            max_snooze_count: default_max_snooze_count(),
            pre_alarm_interval_minutes: default_pre_alarm_interval(),
            volume: default_volume(),
            gradual_volume: true,
            vibrate: true,
        }
    }
}

impl Default for TimerDefaults {
    fn default() -> Self {
        Self { vibrate: true }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()
            .map_err(|err| ConfigError::LoadFailed {
                path: PathBuf::from("~/.config/reveille"),
                message: err.to_string(),
            })?
            .join("config.toml"))
    }

    /// Load from the default location; a missing file yields the defaults
    /// (and writes them out for the user to edit).
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::LoadFailed {
            path: path.into(),
            message: err.to_string(),
        })?;
        toml::from_str(&content).map_err(|err| ConfigError::ParseFailed(err.to_string()))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|err| ConfigError::SaveFailed {
            path: path.into(),
            message: err.to_string(),
        })?;
        std::fs::write(path, content).map_err(|err| ConfigError::SaveFailed {
            path: path.into(),
            message: err.to_string(),
        })
    }

    /// Stamp the configured defaults onto a new alarm.
    pub fn apply_alarm_defaults(&self, alarm: &mut Alarm) {
        alarm.snooze_minutes = self.alarm.snooze_minutes;
        alarm.max_snooze_count = self.alarm.max_snooze_count;
        alarm.pre_alarm_interval_minutes = self.alarm.pre_alarm_interval_minutes;
        alarm.volume = self.alarm.volume;
        alarm.gradual_volume = self.alarm.gradual_volume;
        alarm.vibrate = self.alarm.vibrate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn defaults_match_the_stock_alarm() {
        let cfg = Config::default();
        assert_eq!(cfg.alarm.snooze_minutes, 10);
        assert_eq!(cfg.alarm.max_snooze_count, 3);
        assert_eq!(cfg.alarm.volume, 80);
        assert!(cfg.alarm.gradual_volume);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.alarm.snooze_minutes = 5;
        cfg.use_24h = true;
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[alarm]\nsnooze_minutes = 15\n").expect("write");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.alarm.snooze_minutes, 15);
        assert_eq!(loaded.alarm.max_snooze_count, 3);
        assert!(loaded.timer.vibrate);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").expect("write");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn applies_defaults_to_new_alarms() {
        let mut cfg = Config::default();
        cfg.alarm.snooze_minutes = 5;
        cfg.alarm.volume = 40;
        cfg.alarm.vibrate = false;

        let mut alarm = Alarm::new(NaiveTime::from_hms_opt(7, 0, 0).expect("valid time"));
        cfg.apply_alarm_defaults(&mut alarm);
        assert_eq!(alarm.snooze_minutes, 5);
        assert_eq!(alarm.volume, 40);
        assert!(!alarm.vibrate);
    }
}
