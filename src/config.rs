//! Configuration management for the procdoctor collector.
//!
//! This module handles loading, merging, and validating configuration from
//! files and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use procdoctor::alerts::AlertConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9610;
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LIVENESS_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_RETENTION_DAYS: u64 = 7;
pub const DEFAULT_RETENTION_SWEEP_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_ALERT_DEDUP_WINDOW_SECS: u64 = 300;

/// Collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Liveness detection
    #[serde(alias = "heartbeat-timeout-secs")]
    pub heartbeat_timeout_secs: Option<u64>,
    #[serde(alias = "liveness-sweep-interval-secs")]
    pub liveness_sweep_interval_secs: Option<u64>,

    // Snapshot retention
    #[serde(alias = "retention-days")]
    pub retention_days: Option<u64>,
    #[serde(alias = "retention-sweep-interval-secs")]
    pub retention_sweep_interval_secs: Option<u64>,

    // Alerting
    #[serde(alias = "alert-dedup-window-secs")]
    pub alert_dedup_window_secs: Option<u64>,
    #[serde(alias = "heap-usage-threshold")]
    pub heap_usage_threshold: Option<f64>,
    #[serde(alias = "cpu-usage-threshold")]
    pub cpu_usage_threshold: Option<f64>,
    #[serde(alias = "gc-time-ratio-threshold")]
    pub gc_time_ratio_threshold: Option<f64>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            heartbeat_timeout_secs: Some(DEFAULT_HEARTBEAT_TIMEOUT_SECS),
            liveness_sweep_interval_secs: Some(DEFAULT_LIVENESS_SWEEP_INTERVAL_SECS),
            retention_days: Some(DEFAULT_RETENTION_DAYS),
            retention_sweep_interval_secs: Some(DEFAULT_RETENTION_SWEEP_INTERVAL_SECS),
            alert_dedup_window_secs: Some(DEFAULT_ALERT_DEDUP_WINDOW_SECS),
            heap_usage_threshold: Some(0.90),
            cpu_usage_threshold: Some(0.80),
            gc_time_ratio_threshold: Some(0.10),
            enable_health: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn heartbeat_timeout_ms(&self) -> i64 {
        self.heartbeat_timeout_secs
            .unwrap_or(DEFAULT_HEARTBEAT_TIMEOUT_SECS) as i64
            * 1000
    }

    pub fn liveness_sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.liveness_sweep_interval_secs
                .unwrap_or(DEFAULT_LIVENESS_SWEEP_INTERVAL_SECS),
        )
    }

    pub fn retention_horizon_ms(&self) -> i64 {
        self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS) as i64 * 24 * 60 * 60 * 1000
    }

    pub fn retention_sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.retention_sweep_interval_secs
                .unwrap_or(DEFAULT_RETENTION_SWEEP_INTERVAL_SECS),
        )
    }

    /// Alert engine configuration derived from the effective values.
    pub fn alert_config(&self) -> AlertConfig {
        let defaults = AlertConfig::default();
        AlertConfig {
            heap_usage_threshold: self
                .heap_usage_threshold
                .unwrap_or(defaults.heap_usage_threshold),
            cpu_usage_threshold: self
                .cpu_usage_threshold
                .unwrap_or(defaults.cpu_usage_threshold),
            gc_time_ratio_threshold: self
                .gc_time_ratio_threshold
                .unwrap_or(defaults.gc_time_ratio_threshold),
            dedup_window_ms: self
                .alert_dedup_window_secs
                .unwrap_or(DEFAULT_ALERT_DEDUP_WINDOW_SECS) as i64
                * 1000,
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.heartbeat_timeout_secs == Some(0) {
        return Err("heartbeat_timeout_secs must be greater than 0".into());
    }
    if cfg.liveness_sweep_interval_secs == Some(0) {
        return Err("liveness_sweep_interval_secs must be greater than 0".into());
    }
    if cfg.retention_sweep_interval_secs == Some(0) {
        return Err("retention_sweep_interval_secs must be greater than 0".into());
    }
    if cfg.retention_days == Some(0) {
        return Err("retention_days must be greater than 0".into());
    }

    for (name, value) in [
        ("heap_usage_threshold", cfg.heap_usage_threshold),
        ("cpu_usage_threshold", cfg.cpu_usage_threshold),
        ("gc_time_ratio_threshold", cfg.gc_time_ratio_threshold),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v <= 0.0 || v > 1.0 {
                return Err(format!("{} must be a ratio in (0, 1], got {}", name, v).into());
            }
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                let cert_path = Path::new(cert);
                let key_path = Path::new(key);

                if !cert_path.exists() {
                    return Err(format!("TLS certificate file not found: {}", cert).into());
                }
                if !key_path.exists() {
                    return Err(format!("TLS private key file not found: {}", key).into());
                }

                match fs::metadata(cert_path) {
                    Ok(meta) if meta.len() == 0 => {
                        return Err(format!("TLS certificate file is empty: {}", cert).into());
                    }
                    Err(e) => {
                        return Err(format!(
                            "TLS certificate file is not readable: {} ({})",
                            cert, e
                        )
                        .into());
                    }
                    Ok(_) => {}
                }

                match fs::metadata(key_path) {
                    Ok(meta) if meta.len() == 0 => {
                        return Err(format!("TLS private key file is empty: {}", key).into());
                    }
                    Err(e) => {
                        return Err(format!(
                            "TLS private key file is not readable: {} ({})",
                            key, e
                        )
                        .into());
                    }
                    Ok(_) => {}
                }
            }
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref().and_then(|p| p.to_str()))?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(timeout) = args.heartbeat_timeout {
        config.heartbeat_timeout_secs = Some(timeout);
    }
    if let Some(interval) = args.liveness_sweep_interval {
        config.liveness_sweep_interval_secs = Some(interval);
    }
    if let Some(days) = args.retention_days {
        config.retention_days = Some(days);
    }
    if let Some(interval) = args.retention_sweep_interval {
        config.retention_sweep_interval_secs = Some(interval);
    }
    if let Some(window) = args.alert_dedup_window {
        config.alert_dedup_window_secs = Some(window);
    }

    if args.disable_health {
        config.enable_health = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        // Try default locations
        let defaults = [
            "/etc/procdoctor/collector.yaml",
            "/etc/procdoctor/collector.yml",
            "/etc/procdoctor/collector.json",
            "./procdoctor.yaml",
            "./procdoctor.yml",
            "./procdoctor.json",
        ];

        defaults
            .iter()
            .find(|p| Path::new(p).exists())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(""))
    };

    if !path.exists() || path.to_string_lossy().is_empty() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}
