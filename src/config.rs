use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub collector: CollectorConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Steady-state delay between collection cycles.
    pub period_ms: u64,
    /// Gap between the two readings of a delta-based sampler.
    pub sample_interval_ms: u64,
    /// Mount point whose usage feeds the disk metric.
    pub disk_mount: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            period_ms: 3000,
            sample_interval_ms: 1000,
            disk_mount: "/".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Clamps out-of-range values back to their defaults instead of
    /// failing the load, so a bad config file degrades rather than keeps
    /// the daemon from starting.
    fn normalize(mut self) -> Self {
        let defaults = CollectorConfig::default();
        if !(500..=3_600_000).contains(&self.collector.period_ms) {
            self.collector.period_ms = defaults.period_ms;
        }
        if !(100..=10_000).contains(&self.collector.sample_interval_ms) {
            self.collector.sample_interval_ms = defaults.sample_interval_ms;
        }
        if self.collector.disk_mount.is_empty() {
            self.collector.disk_mount = defaults.disk_mount;
        }
        self
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hostmon").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    let config = match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    };
    config.normalize()
}
