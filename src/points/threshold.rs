//! Leak rate and threshold tables.

use crate::actions::{Action, ActionRegistry};
use crate::config::{LeakConfig, ThresholdConfig};
use crate::error::ConfigError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Points removed per interval of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeakRate {
    pub points: f64,
    pub interval: Duration,
}

impl LeakRate {
    pub fn new(points: f64, interval: Duration) -> Self {
        LeakRate { points, interval }
    }

    /// Points leaked over `elapsed`, proportional to the fraction of an
    /// interval that passed.
    pub fn amount(&self, elapsed: Duration) -> f64 {
        if self.interval.is_zero() {
            return 0.0;
        }
        (self.points * elapsed.as_secs_f64() / self.interval.as_secs_f64()).max(0.0)
    }
}

impl Default for LeakRate {
    fn default() -> Self {
        LeakRate { points: 1.0, interval: Duration::from_secs(30) }
    }
}

impl From<&LeakConfig> for LeakRate {
    fn from(config: &LeakConfig) -> Self {
        LeakRate { points: config.points, interval: Duration::from_secs(config.interval_secs) }
    }
}

/// A score boundary and what happens when it is crossed.
#[derive(Clone)]
pub struct Threshold {
    name: String,
    points: f64,
    ascending: Vec<Arc<dyn Action>>,
    descending: Vec<Arc<dyn Action>>,
}

impl Threshold {
    pub fn new(name: &str, points: f64, ascending: Vec<Arc<dyn Action>>, descending: Vec<Arc<dyn Action>>) -> Self {
        Threshold { name: name.to_string(), points, ascending, descending }
    }

    /// Build from configuration, resolving every action line through `registry`.
    pub fn from_config(config: &ThresholdConfig, registry: &ActionRegistry) -> Result<Self, ConfigError> {
        let build = |lines: &[String]| -> Result<Vec<Arc<dyn Action>>, ConfigError> {
            lines
                .iter()
                .map(|line| {
                    registry
                        .construct_line(line)
                        .map_err(|source| ConfigError::ThresholdAction { threshold: config.name.clone(), source })
                })
                .collect()
        };
        Ok(Threshold::new(&config.name, config.points, build(&config.ascending)?, build(&config.descending)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> f64 {
        self.points
    }

    pub fn ascending(&self) -> &[Arc<dyn Action>] {
        &self.ascending
    }

    pub fn descending(&self) -> &[Arc<dyn Action>] {
        &self.descending
    }
}

impl fmt::Debug for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Threshold")
            .field("name", &self.name)
            .field("points", &self.points)
            .field("ascending", &self.ascending.len())
            .field("descending", &self.descending.len())
            .finish()
    }
}

/// Thresholds sorted by point value, lowest first.
///
/// A threshold is reached while `score >= points`. Its descending actions
/// fire only once the score drops strictly below `points`, so a decay that
/// lands exactly on the boundary keeps it reached.
#[derive(Debug, Clone, Default)]
pub struct Thresholds {
    sorted: Vec<Threshold>,
}

impl Thresholds {
    /// Sort and validate. Values must be positive, finite and distinct.
    pub fn new(mut thresholds: Vec<Threshold>) -> Result<Self, ConfigError> {
        if let Some(bad) = thresholds.iter().find(|t| !(t.points.is_finite() && t.points > 0.0)) {
            return Err(ConfigError::Invalid(format!(
                "threshold '{}' must have a positive point value, found {}",
                bad.name, bad.points
            )));
        }
        thresholds.sort_by(|a, b| a.points.total_cmp(&b.points));
        if let Some(pair) = thresholds.windows(2).find(|w| w[0].points == w[1].points) {
            return Err(ConfigError::Invalid(format!(
                "thresholds '{}' and '{}' share the value {}",
                pair[0].name, pair[1].name, pair[0].points
            )));
        }
        Ok(Thresholds { sorted: thresholds })
    }

    pub fn from_config(configs: &[ThresholdConfig], registry: &ActionRegistry) -> Result<Self, ConfigError> {
        let thresholds = configs.iter().map(|c| Threshold::from_config(c, registry)).collect::<Result<Vec<_>, _>>()?;
        Self::new(thresholds)
    }

    /// Number of thresholds at or below `score`.
    pub fn level_for(&self, score: f64) -> usize {
        self.sorted.partition_point(|t| t.points <= score)
    }

    pub fn get(&self, index: usize) -> Option<&Threshold> {
        self.sorted.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Threshold> {
        self.sorted.iter()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}
