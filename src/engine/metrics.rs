//! Evaluation metrics.
//!
//! Counters are collected on every run; they are a handful of integers and a
//! timestamp pair, so the hot path pays nothing worth measuring. The CLI
//! report and the `trace` log line after each evaluation read them.

use std::time::Duration;

/// What one chain evaluation did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EvalMetrics {
    /// Wall time spent in [`execute`](crate::execute).
    pub duration: Duration,
    /// Rules whose matcher was consulted (halting stops the count).
    pub rules_evaluated: usize,
    /// Rules skipped because the author held an exemption permission.
    pub rules_exempted: usize,
    /// Rules whose matcher applied.
    pub rules_matched: usize,
    /// Actions started, including ones that failed.
    pub actions_executed: usize,
    /// Actions that reported an error and were skipped.
    pub actions_failed: usize,
    /// Actions the author's platform could not perform.
    pub actions_unsupported: usize,
}
