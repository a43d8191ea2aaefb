//! CLI arguments for the procdoctor collector.
//!
//! This module defines the command-line interface structure using the clap
//! library, including all flags and options.

use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "procdoctor",
    about = "Telemetry collector for fleets of long-running processes",
    long_about = "Telemetry collector for fleets of long-running processes.\n\n\
                  Receives health snapshots from in-process agents, persists them, \
                  raises threshold alerts with deduplication, and pushes live updates \
                  to WebSocket observers. Includes liveness detection and snapshot \
                  retention sweeps.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Heartbeat timeout in seconds before a process is marked offline
    #[arg(long)]
    pub heartbeat_timeout: Option<u64>,

    /// Liveness sweep period in seconds
    #[arg(long)]
    pub liveness_sweep_interval: Option<u64>,

    /// Snapshot retention horizon in days
    #[arg(long)]
    pub retention_days: Option<u64>,

    /// Retention sweep period in seconds
    #[arg(long)]
    pub retention_sweep_interval: Option<u64>,

    /// Alert dedup window in seconds
    #[arg(long)]
    pub alert_dedup_window: Option<u64>,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Enable TLS (requires --tls-cert and --tls-key)
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate (PEM)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key (PEM)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}
