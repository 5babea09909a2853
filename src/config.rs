use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{PressError, Result, Viewport};

/// Environment variable consulted when no explicit config path is given.
pub const CONFIG_ENV_VAR: &str = "PAGEPRESS_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub launch: LaunchConfig,
    pub timeouts: Timeouts,
    pub settle: SettleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Browser executable; auto-detected when absent.
    pub chrome: Option<PathBuf>,
    pub headless: bool,
    pub viewport: Viewport,
    /// Caps concurrently open browser sessions. Unbounded when absent.
    pub max_concurrent_sessions: Option<usize>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            chrome: None,
            headless: true,
            viewport: Viewport::default(),
            max_concurrent_sessions: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub navigation: Duration,
    #[serde(with = "humantime_serde")]
    pub html_export: Duration,
    #[serde(with = "humantime_serde")]
    pub url_export: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            html_export: Duration::from_secs(180),
            url_export: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    /// Pixels scrolled per tick.
    pub step_px: u32,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Share of the job's export timeout that settling may consume.
    pub ceiling_fraction: f64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            step_px: 100,
            interval: Duration::from_millis(100),
            ceiling_fraction: 0.25,
        }
    }
}

impl SettleConfig {
    /// Settling budget for a job whose export may take `export_timeout`.
    ///
    /// A fraction outside (0, 1] falls back to the default share.
    pub fn ceiling(&self, export_timeout: Duration) -> Duration {
        let fraction = self.ceiling_fraction;
        let fraction = if fraction > 0.0 && fraction <= 1.0 {
            fraction
        } else {
            SettleConfig::default().ceiling_fraction
        };
        export_timeout.mul_f64(fraction)
    }
}

impl Config {
    /// Load config from an explicit path, the `PAGEPRESS_CONFIG` path, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PressError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
            .map_err(|e| PressError::config(format!("Invalid config ({}): {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, String> {
        let cfg: Config = toml::from_str(text).map_err(|e| e.to_string())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let timeouts = [
            ("navigation", self.timeouts.navigation),
            ("html_export", self.timeouts.html_export),
            ("url_export", self.timeouts.url_export),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(format!("{name} timeout must be positive"));
            }
        }
        if self.settle.step_px == 0 {
            return Err("settle.step_px must be positive".to_string());
        }
        if self.settle.interval.is_zero() {
            return Err("settle.interval must be positive".to_string());
        }
        let fraction = self.settle.ceiling_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(format!(
                "settle.ceiling_fraction must be in (0, 1], got {fraction}"
            ));
        }
        if self.launch.max_concurrent_sessions == Some(0) {
            return Err("launch.max_concurrent_sessions must be positive".to_string());
        }
        Ok(())
    }
}
