//! Process-side agent: samples runtime health through a [`MetricSource`]
//! and ships it to the collector.
//!
//! The agent runs inside (or alongside) the monitored process. It registers
//! once, then reports on a fixed interval; every successful report doubles
//! as a heartbeat at the collector. A failed registration disables
//! reporting for the process lifetime (see [`Reporter::start`]).

mod client;
mod config;
mod reporter;
mod source;

pub use client::{AgentError, CollectorClient};
pub use config::AgentConfig;
pub use reporter::{Reporter, ReporterState};
pub use source::MetricSource;
