//! Configuration loading from TOML files
//!
//! Both binaries take the file path from `--config` (default
//! `config/dev.toml`). Every section and every key is optional; missing
//! values take the defaults below.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Ceiling height (m) used until the user confirms one
    #[serde(default = "default_ceiling_height")]
    pub default_ceiling_height: f64,
    /// Number of recent log entries shown in the on-screen log
    #[serde(default = "default_log_display_lines")]
    pub log_display_lines: usize,
    /// Event log size that triggers a one-time warning
    #[serde(default = "default_log_warn_entries")]
    pub log_warn_entries: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_ceiling_height: default_ceiling_height(),
            log_display_lines: default_log_display_lines(),
            log_warn_entries: default_log_warn_entries(),
        }
    }
}

fn default_ceiling_height() -> f64 {
    2.44 // 8 ft
}

/// Ceiling heights must be finite and positive; anything else falls back to
/// the built-in default.
pub(crate) fn checked_ceiling_height(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        let fallback = default_ceiling_height();
        warn!(value = %value, fallback = %fallback, "default_ceiling_height_invalid");
        fallback
    }
}

fn default_log_display_lines() -> usize {
    120
}

fn default_log_warn_entries() -> usize {
    crate::domain::event_log::DEFAULT_WARN_AFTER
}

#[derive(Debug, Clone, Deserialize)]
pub struct FloorLockConfig {
    /// Lock the floor automatically once the target height settles
    #[serde(default)]
    pub auto: bool,
    #[serde(default = "default_floor_lock_dwell_ms")]
    pub dwell_ms: u64,
    #[serde(default = "default_floor_lock_tolerance_m")]
    pub tolerance_m: f64,
}

impl Default for FloorLockConfig {
    fn default() -> Self {
        Self {
            auto: false,
            dwell_ms: default_floor_lock_dwell_ms(),
            tolerance_m: default_floor_lock_tolerance_m(),
        }
    }
}

fn default_floor_lock_dwell_ms() -> u64 {
    1000
}

fn default_floor_lock_tolerance_m() -> f64 {
    0.02
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Directory for downloaded session documents
    #[serde(default = "default_export_dir")]
    pub dir: String,
    #[serde(default = "default_export_file_prefix")]
    pub file_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { dir: default_export_dir(), file_prefix: default_export_file_prefix() }
    }
}

fn default_export_dir() -> String {
    "exports".to_string()
}

fn default_export_file_prefix() -> String {
    "room_mapper_session".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_submit_url")]
    pub url: String,
    #[serde(default = "default_submit_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self { enabled: false, url: default_submit_url(), timeout_ms: default_submit_timeout_ms() }
    }
}

fn default_submit_url() -> String {
    "http://localhost:8000/api/sessions".to_string()
}

fn default_submit_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Directory for stored session documents
    #[serde(default = "default_server_data_dir")]
    pub data_dir: String,
    /// Directory for client log lines posted to /api/log
    #[serde(default = "default_server_log_dir")]
    pub log_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_server_bind_address(),
            port: default_server_port(),
            data_dir: default_server_data_dir(),
            log_dir: default_server_log_dir(),
        }
    }
}

fn default_server_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_server_data_dir() -> String {
    "data".to_string()
}

fn default_server_log_dir() -> String {
    "logs".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub floor_lock: FloorLockConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub submit: SubmitConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    default_ceiling_height: f64,
    log_display_lines: usize,
    log_warn_entries: usize,
    auto_floor_lock: bool,
    floor_lock_dwell_ms: u64,
    floor_lock_tolerance_m: f64,
    export_dir: String,
    export_file_prefix: String,
    submit_enabled: bool,
    submit_url: String,
    submit_timeout_ms: u64,
    server_bind_address: String,
    server_port: u16,
    server_data_dir: String,
    server_log_dir: String,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            default_ceiling_height: checked_ceiling_height(
                toml_config.capture.default_ceiling_height,
            ),
            log_display_lines: toml_config.capture.log_display_lines,
            log_warn_entries: toml_config.capture.log_warn_entries,
            auto_floor_lock: toml_config.floor_lock.auto,
            floor_lock_dwell_ms: toml_config.floor_lock.dwell_ms,
            floor_lock_tolerance_m: toml_config.floor_lock.tolerance_m,
            export_dir: toml_config.export.dir,
            export_file_prefix: toml_config.export.file_prefix,
            submit_enabled: toml_config.submit.enabled,
            submit_url: toml_config.submit.url,
            submit_timeout_ms: toml_config.submit.timeout_ms,
            server_bind_address: toml_config.server.bind_address,
            server_port: toml_config.server.port,
            server_data_dir: toml_config.server.data_dir,
            server_log_dir: toml_config.server.log_dir,
            config_file,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration from `path`, falling back to defaults on any error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn default_ceiling_height(&self) -> f64 {
        self.default_ceiling_height
    }

    pub fn log_display_lines(&self) -> usize {
        self.log_display_lines
    }

    pub fn log_warn_entries(&self) -> usize {
        self.log_warn_entries
    }

    pub fn auto_floor_lock(&self) -> bool {
        self.auto_floor_lock
    }

    pub fn floor_lock_dwell_ms(&self) -> u64 {
        self.floor_lock_dwell_ms
    }

    pub fn floor_lock_tolerance_m(&self) -> f64 {
        self.floor_lock_tolerance_m
    }

    pub fn export_dir(&self) -> &str {
        &self.export_dir
    }

    pub fn export_file_prefix(&self) -> &str {
        &self.export_file_prefix
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }

    pub fn submit_timeout_ms(&self) -> u64 {
        self.submit_timeout_ms
    }

    pub fn server_bind_address(&self) -> &str {
        &self.server_bind_address
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn server_data_dir(&self) -> &str {
        &self.server_data_dir
    }

    pub fn server_log_dir(&self) -> &str {
        &self.server_log_dir
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to force submission on (e.g. from a CLI flag)
    pub fn with_submit_enabled(mut self, enabled: bool) -> Self {
        self.submit_enabled = enabled;
        self
    }

    /// Builder method for tests and CLI overrides of the export directory
    pub fn with_export_dir(mut self, dir: &str) -> Self {
        self.export_dir = dir.to_string();
        self
    }

    /// Builder method for tests to enable the floor stabilizer
    #[cfg(test)]
    pub fn with_auto_floor_lock(mut self, dwell_ms: u64, tolerance_m: f64) -> Self {
        self.auto_floor_lock = true;
        self.floor_lock_dwell_ms = dwell_ms;
        self.floor_lock_tolerance_m = tolerance_m;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_ceiling_height(), 2.44);
        assert_eq!(config.log_display_lines(), 120);
        assert!(!config.auto_floor_lock());
        assert_eq!(config.floor_lock_dwell_ms(), 1000);
        assert_eq!(config.export_dir(), "exports");
        assert!(!config.submit_enabled());
        assert_eq!(config.submit_url(), "http://localhost:8000/api/sessions");
        assert_eq!(config.server_port(), 8000);
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_invalid_default_ceiling_height_falls_back() {
        for raw in ["-1.0", "0.0", "nan", "inf"] {
            let text = format!("[capture]\ndefault_ceiling_height = {raw}\n");
            let toml_config: TomlConfig = toml::from_str(&text).unwrap();
            let config = Config::from_toml(toml_config, "inline".to_string());
            assert_eq!(config.default_ceiling_height(), 2.44, "input {raw}");
        }

        let toml_config: TomlConfig =
            toml::from_str("[capture]\ndefault_ceiling_height = 3.1\n").unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert_eq!(config.default_ceiling_height(), 3.1);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml_config: TomlConfig = toml::from_str("[submit]\nenabled = true\n").unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert!(config.submit_enabled());
        assert_eq!(config.submit_timeout_ms(), 5000);
        assert_eq!(config.export_file_prefix(), "room_mapper_session");
    }

    #[test]
    fn test_builders() {
        let config = Config::default()
            .with_submit_enabled(true)
            .with_export_dir("/tmp/out")
            .with_auto_floor_lock(500, 0.05);
        assert!(config.submit_enabled());
        assert_eq!(config.export_dir(), "/tmp/out");
        assert!(config.auto_floor_lock());
        assert_eq!(config.floor_lock_dwell_ms(), 500);
    }
}
