//! Point-based escalation.
//!
//! Every author carries a score that rules raise with the `points` action and
//! that leaks back toward zero over time. Configured thresholds turn the score
//! into enforcement:
//!
//! ```text
//! score
//!   30 ┤━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━  "ban"   ascending: kick
//!      │            ╱╲
//!   10 ┤━━━━━━━━━━━╱━━╲━━━━━━━━━━━━━━━━━  "mute"  ascending: warn   descending: warn
//!      │     ╱╲   ╱    ╲___
//!    5 ┤━━━━╱━━╲━╱━━━━━━━━━╲━━━━━━━━━━━━  "warn"  ascending: warn
//!      │ __╱    V           ╲______
//!    0 ┼────────────────────────────────  time
//! ```
//!
//! An author's *level* is the number of thresholds at or below their score.
//! Only level changes fire actions, so a score wobbling inside one band fires
//! nothing. Rising through several thresholds in one step fires each
//! ascending set lowest first; falling fires descending sets highest first.
//!
//! ## Responsibilities by module
//!
//! - `threshold.rs`: `LeakRate`, `Threshold`, the sorted `Thresholds` table.
//! - `manager.rs`: `PointManager`, the per-author score table.
//! - `leak.rs`: the tokio task that leaks quiet authors.

#[path = "points/leak.rs"]
mod leak;
#[path = "points/manager.rs"]
mod manager;
#[path = "points/threshold.rs"]
mod threshold;

pub use manager::PointManager;
pub use threshold::{LeakRate, Threshold, Thresholds};
