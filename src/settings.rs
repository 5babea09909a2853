use std::path::Path;
use std::time::Duration;

use pagepress_lib::browser::{NavigationScript, PageScript};
use pagepress_lib::{Config, PressError, SourceKind};

use crate::cli::EngineArgs;

/// Any value switches the CLI to the in-process scripted engine.
pub const MOCK_ENGINE_ENV: &str = "PAGEPRESS_MOCK_ENGINE";
/// Main-document status the mock engine reports for URL jobs.
pub const MOCK_STATUS_ENV: &str = "PAGEPRESS_MOCK_STATUS";
/// Engine error text the mock engine fails navigation with.
pub const MOCK_NAV_ERROR_ENV: &str = "PAGEPRESS_MOCK_NAV_ERROR";
/// Launch error text the mock engine fails acquisition with.
pub const MOCK_LAUNCH_ERROR_ENV: &str = "PAGEPRESS_MOCK_LAUNCH_ERROR";

/// Load config from an explicit path, `PAGEPRESS_CONFIG`, or defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, PressError> {
    let cfg = Config::load(path)?;
    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        PressError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Merge engine flags into `config`, preferring flags that were given.
///
/// `--export-timeout` only replaces the export timeout of the job's own source.
pub fn apply_engine_args(
    config: &mut Config,
    args: &EngineArgs,
    source: SourceKind,
) -> Result<(), PressError> {
    if let Some(secs) = args.nav_timeout {
        config.timeouts.navigation = Duration::from_secs(secs);
    }
    if let Some(secs) = args.export_timeout {
        let timeout = Duration::from_secs(secs);
        match source {
            SourceKind::Html => config.timeouts.html_export = timeout,
            SourceKind::Url => config.timeouts.url_export = timeout,
        }
    }
    if let Some(chrome) = &args.chrome {
        config.launch.chrome = Some(chrome.clone());
    }
    if args.headful {
        config.launch.headless = false;
    }
    if let Some(viewport) = args.viewport {
        config.launch.viewport = viewport;
    }
    config
        .validate()
        .map_err(|e| PressError::Config(format!("Invalid settings: {e}")))
}

/// Reads the mock engine script from the process environment.
pub fn mock_script() -> Result<Option<PageScript>, PressError> {
    mock_script_from(|key| std::env::var(key).ok())
}

pub fn mock_script_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<PageScript>, PressError> {
    if lookup(MOCK_ENGINE_ENV).is_none() {
        return Ok(None);
    }
    let mut script = PageScript::default();
    if let Some(status) = lookup(MOCK_STATUS_ENV) {
        let status: u16 = status.trim().parse().map_err(|_| {
            PressError::Config(format!("{MOCK_STATUS_ENV} must be an HTTP status, got '{status}'"))
        })?;
        script.navigation = NavigationScript::Status(status);
    }
    if let Some(message) = lookup(MOCK_NAV_ERROR_ENV) {
        script.navigation = NavigationScript::Fail(message);
    }
    script.launch_error = lookup(MOCK_LAUNCH_ERROR_ENV);
    Ok(Some(script))
}

/// Log effective config to stderr (verbose mode).
pub fn log_effective_config(config_path: Option<&Path>, config: &Config, mock: bool) {
    let config_source = config_path
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| std::env::var(pagepress_lib::config::CONFIG_ENV_VAR).ok())
        .unwrap_or_else(|| "defaults/built-in".to_string());
    eprintln!(
        "Effective config (source: {}): engine {}, viewport {}, headless {}, timeouts nav {}s / html export {}s / url export {}s, settle {}px every {}ms",
        config_source,
        if mock { "scripted (mock)" } else { "chromium" },
        config.launch.viewport,
        config.launch.headless,
        config.timeouts.navigation.as_secs(),
        config.timeouts.html_export.as_secs(),
        config.timeouts.url_export.as_secs(),
        config.settle.step_px,
        config.settle.interval.as_millis(),
    );
}
