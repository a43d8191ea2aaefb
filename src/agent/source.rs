//! The metric source seam.

use std::collections::HashMap;

/// Produces a flat key/value snapshot of process health on demand.
///
/// How the values are obtained is the host process's business; the agent
/// only calls `sample` synchronously on each report tick. Keys follow the
/// dotted wire convention the collector understands (`heap.used`,
/// `heap.max`, `gc.count`, `gc.time`, `thread.count`, `thread.daemon`,
/// `cpu.load`, `system.load`, `uptime`); unknown keys are carried but
/// ignored by the collector's typed parse.
pub trait MetricSource: Send + Sync {
    fn sample(&self) -> HashMap<String, f64>;
}

impl<F> MetricSource for F
where
    F: Fn() -> HashMap<String, f64> + Send + Sync,
{
    fn sample(&self) -> HashMap<String, f64> {
        self()
    }
}
