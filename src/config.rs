use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants::{DEFAULT_ICON_BASE_URL, DEFAULT_WEATHER_URL};
use crate::weather::WeatherQuery;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// How the clock renders the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    Twelve,
    #[serde(rename = "24h")]
    #[default]
    TwentyFour,
}

impl TimeFormat {
    /// chrono pattern for the clock digits
    pub fn pattern(&self) -> &'static str {
        match self {
            TimeFormat::Twelve => "%I:%M",
            TimeFormat::TwentyFour => "%H:%M",
        }
    }
}

/// Top-level app configuration.
///
/// Everything is optional in YAML; the accessors below supply the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub time_format: Option<TimeFormat>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub units: Option<String>,         // metric | imperial | standard
    pub api_key: Option<String>,
    /// every Nth tick drops the weather block, 0 disables
    pub screensaver: Option<u64>,
    pub sprite_dir: Option<PathBuf>,
    pub icon_dir: Option<PathBuf>,
    pub cache_file: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
    pub weather_url: Option<String>,
    pub icon_base_url: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub bus: Option<String>,        // e.g. "/dev/i2c-1"
    pub address: Option<u8>,        // e.g. 0x3C
    pub rotate_deg: Option<u16>,
    pub invert: Option<bool>,
    pub brightness: Option<u8>,     // 0-255
}

impl DisplayConfig {
    pub fn bus(&self) -> &str {
        self.bus.as_deref().unwrap_or("/dev/i2c-1")
    }

    pub fn address(&self) -> u8 {
        self.address.unwrap_or(0x3C)
    }
}

impl Config {
    pub fn time_format(&self) -> TimeFormat {
        self.time_format.unwrap_or_default()
    }

    pub fn screensaver(&self) -> u64 {
        self.screensaver.unwrap_or(0)
    }

    pub fn sprite_dir(&self) -> PathBuf {
        self.sprite_dir.clone().unwrap_or_else(|| PathBuf::from("digits"))
    }

    pub fn icon_dir(&self) -> PathBuf {
        self.icon_dir.clone().unwrap_or_else(|| PathBuf::from("icons"))
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_file.clone().unwrap_or_else(|| PathBuf::from("weather_cache.json"))
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| PathBuf::from("current.png"))
    }

    pub fn weather_url(&self) -> &str {
        self.weather_url.as_deref().unwrap_or(DEFAULT_WEATHER_URL)
    }

    pub fn icon_base_url(&self) -> &str {
        self.icon_base_url.as_deref().unwrap_or(DEFAULT_ICON_BASE_URL)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(5))
    }

    pub fn display(&self) -> DisplayConfig {
        self.display.clone().unwrap_or_default()
    }

    pub fn weather_query(&self) -> WeatherQuery {
        WeatherQuery {
            lat: self.lat.unwrap_or(0.0),
            lon: self.lon.unwrap_or(0.0),
            units: self.units.clone().unwrap_or_else(|| "metric".to_string()),
            api_key: self.api_key.clone().unwrap_or_default(),
        }
    }
}

/// Command line. `store` renders one frame to an image and exits.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "dailyclock", about = "128x32 OLED clock and daily weather", version)]
pub struct Cli {
    /// `store` writes a single frame to the store path, anything else loops
    pub mode: Option<String>,
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Debug logging
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// dump the effective config and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Read YAML (explicit path or search), then validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    let cfg = match cli.config.as_ref() {
        Some(p) if p.exists() => read_yaml(p)?,
        Some(p) => {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        None => match find_config_file() {
            Some(p) => read_yaml(&p)?,
            None => Config::default(),
        },
    };

    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/dailyclock/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/dailyclock.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["config.yaml", "dailyclock.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Ranges and required combinations.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(lat) = cfg.lat {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ConfigError::Validation(format!("lat {} outside -90..=90", lat)));
        }
    }
    if let Some(lon) = cfg.lon {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ConfigError::Validation(format!("lon {} outside -180..=180", lon)));
        }
    }
    if cfg.http_timeout_secs == Some(0) {
        return Err(ConfigError::Validation("http_timeout_secs must be > 0".into()));
    }
    if let Some(units) = cfg.units.as_deref() {
        match units {
            "metric" | "imperial" | "standard" => {},
            _ => return Err(ConfigError::Validation(format!("unknown units '{}'", units))),
        }
    }
    if let Some(display) = cfg.display.as_ref() {
        if let Some(rot) = display.rotate_deg {
            match rot {
                0 | 90 | 180 | 270 => {},
                _ => return Err(ConfigError::Validation("display rotate_deg must be 0|90|180|270".into()))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.time_format(), TimeFormat::TwentyFour);
        assert_eq!(cfg.screensaver(), 0);
        assert_eq!(cfg.sprite_dir(), PathBuf::from("digits"));
        assert_eq!(cfg.icon_dir(), PathBuf::from("icons"));
        assert_eq!(cfg.cache_file(), PathBuf::from("weather_cache.json"));
        assert_eq!(cfg.store_path(), PathBuf::from("current.png"));
        assert_eq!(cfg.http_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.weather_query().units, "metric");
        assert_eq!(cfg.display().address(), 0x3C);
    }

    #[test]
    fn test_read_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "\
time_format: 12h
lat: 48.2
lon: 16.37
api_key: abc
screensaver: 3
display:
  bus: /dev/i2c-3
  address: 61
  rotate_deg: 180
").unwrap();

        let cli = Cli { config: Some(path), ..Default::default() };
        let cfg = load(&cli).unwrap();
        assert_eq!(cfg.time_format(), TimeFormat::Twelve);
        assert_eq!(cfg.screensaver(), 3);
        assert_eq!(cfg.weather_query().api_key, "abc");
        assert_eq!(cfg.display().bus(), "/dev/i2c-3");
        assert_eq!(cfg.display().address(), 0x3D);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "display:\n  invert: true\nlat: 91\n").unwrap();
        let cli = Cli { config: Some(path.clone()), ..Default::default() };
        assert!(matches!(load(&cli), Err(ConfigError::Validation(_))));

        fs::write(&path, "display:\n  invert: true\n").unwrap();
        let cfg = load(&cli).unwrap();
        assert_eq!(cfg.display().invert, Some(true));
        assert_eq!(cfg.display().bus(), "/dev/i2c-1");
        assert_eq!(cfg.time_format(), TimeFormat::TwentyFour);
    }

    #[test]
    fn test_missing_explicit_file() {
        let cli = Cli { config: Some(PathBuf::from("/nonexistent/dailyclock.yaml")), ..Default::default() };
        assert!(matches!(load(&cli), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_bad_time_format_is_rejected() {
        assert!(serde_yaml::from_str::<Config>("time_format: 25h").is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let cfg = Config { lat: Some(91.0), ..Default::default() };
        assert!(validate(&cfg).is_err());

        let cfg = Config { http_timeout_secs: Some(0), ..Default::default() };
        assert!(validate(&cfg).is_err());

        let cfg = Config {
            display: Some(DisplayConfig { rotate_deg: Some(45), ..Default::default() }),
            ..Default::default()
        };
        assert!(validate(&cfg).is_err());

        let cfg = Config { lat: Some(-33.9), lon: Some(151.2), ..Default::default() };
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_time_patterns() {
        assert_eq!(TimeFormat::Twelve.pattern(), "%I:%M");
        assert_eq!(TimeFormat::TwentyFour.pattern(), "%H:%M");
    }
}
