//! Per-author score table.

use super::leak::LeakTask;
use super::threshold::{LeakRate, Thresholds};
use crate::actions::run_isolated;
use crate::api::Services;
use crate::author::{AuthorId, MessageAuthor};
use crate::context::FilterContext;
use crate::error::ConfigError;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::time::Instant;

/// One author's score. Only ever touched under its own mutex.
#[derive(Debug)]
struct ScoreRecord {
    author: Arc<dyn MessageAuthor>,
    points: f64,
    last_update: Instant,
    /// Number of thresholds of `table` currently reached.
    level: usize,
    table: Arc<Thresholds>,
    /// Removed from the table; updates must look the author up again.
    retired: bool,
}

impl ScoreRecord {
    fn new(author: Arc<dyn MessageAuthor>, table: Arc<Thresholds>, now: Instant) -> Self {
        ScoreRecord { author, points: 0.0, last_update: now, level: 0, table, retired: false }
    }

    /// Carry the level over to a reconfigured table without firing anything.
    fn rebase(&mut self, thresholds: &Arc<Thresholds>) {
        if !Arc::ptr_eq(&self.table, thresholds) {
            self.level = thresholds.level_for(self.points);
            self.table = thresholds.clone();
        }
    }

    fn leaked(&self, now: Instant, rate: &LeakRate) -> f64 {
        (self.points - rate.amount(now.saturating_duration_since(self.last_update))).max(0.0)
    }

    fn leak(&mut self, now: Instant, rate: &LeakRate) {
        self.points = self.leaked(now, rate);
        self.last_update = now;
    }

    /// Move to the level matching the current score, recording crossings.
    fn settle(&mut self, thresholds: &Thresholds, out: &mut Vec<Crossing>) {
        let level = thresholds.level_for(self.points);
        if level > self.level {
            out.extend((self.level..level).map(Crossing::Up));
        } else {
            out.extend((level..self.level).rev().map(Crossing::Down));
        }
        self.level = level;
    }

    /// Leak to `now`, add `delta` and collect the crossings. `None` once the
    /// record has been retired.
    fn update(&mut self, delta: f64, settings: &Settings, now: Instant) -> Option<(f64, Vec<Crossing>)> {
        if self.retired {
            return None;
        }
        let mut crossings = Vec::new();
        self.rebase(&settings.thresholds);
        self.leak(now, &settings.leak);
        self.settle(&settings.thresholds, &mut crossings);
        self.points = (self.points + delta).max(0.0);
        self.settle(&settings.thresholds, &mut crossings);
        Some((self.points, crossings))
    }
}

/// A threshold boundary crossed by one update, by index into the sorted table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Crossing {
    Up(usize),
    Down(usize),
}

#[derive(Debug, Clone, Default)]
struct Settings {
    leak: LeakRate,
    thresholds: Arc<Thresholds>,
}

/// Decaying escalation scores, one per author.
///
/// ```text
/// add_points(ctx, delta)
///   lock record ── rebase ── leak to now ── settle ── += delta ── settle ── unlock
///                                             (Down*)                (Up*)
///   fire crossings in order, outside the lock
/// ```
///
/// Records live behind their own mutex inside a read-mostly map, so two
/// authors never contend and the leak task serializes with `add_points`
/// per author. Threshold actions are run after the record lock is released
/// so they are free to call back into the manager.
#[derive(Debug, Default)]
pub struct PointManager {
    enabled: AtomicBool,
    settings: RwLock<Settings>,
    records: RwLock<HashMap<AuthorId, Arc<Mutex<ScoreRecord>>>>,
    task: Mutex<Option<LeakTask>>,
}

impl PointManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn scoring on (or reconfigure it) and (re)start the leak task.
    ///
    /// Existing scores survive a reconfiguration. Each record is placed on
    /// the new threshold table, without firing anything, the next time it is
    /// touched. The task runs on `runtime` if
    /// given, else on the ambient tokio runtime.
    pub fn enable(
        &self,
        services: &Arc<Services>,
        leak: LeakRate,
        thresholds: Thresholds,
        runtime: Option<&Handle>,
    ) -> Result<(), ConfigError> {
        let runtime = match runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };
        if leak.interval.is_zero() {
            return Err(ConfigError::Invalid("leak interval must be positive".to_string()));
        }

        let interval = leak.interval;
        self.install(leak, thresholds);
        let previous = self.task.lock().replace(LeakTask::spawn(&runtime, Arc::downgrade(services), interval));
        if let Some(previous) = previous {
            previous.stop();
        }
        tracing::info!(
            leak_points = leak.points,
            leak_interval = ?interval,
            thresholds = self.settings.read().thresholds.len(),
            "point scoring enabled"
        );
        Ok(())
    }

    /// Turn scoring off, stop the leak task and forget every score.
    pub fn disable(&self) {
        let was_enabled = self.enabled.swap(false, Ordering::AcqRel);
        if let Some(task) = self.task.lock().take() {
            task.stop();
        }
        let dropped = {
            let mut records = self.records.write();
            for record in records.values() {
                record.lock().retired = true;
            }
            let count = records.len();
            records.clear();
            count
        };
        if was_enabled {
            tracing::info!(dropped, "point scoring disabled");
        }
    }

    fn install(&self, leak: LeakRate, thresholds: Thresholds) {
        *self.settings.write() = Settings { leak, thresholds: Arc::new(thresholds) };
        self.enabled.store(true, Ordering::Release);
    }

    /// Add `delta` (possibly negative) to the context author's score and run
    /// the actions of every threshold crossed. Returns the new score.
    ///
    /// A no-op returning zero while scoring is disabled.
    pub fn add_points(&self, ctx: &mut FilterContext, delta: f64, services: &Services) -> f64 {
        self.add_points_at(ctx, delta, services, Instant::now())
    }

    fn add_points_at(&self, ctx: &mut FilterContext, delta: f64, services: &Services, now: Instant) -> f64 {
        if !self.is_enabled() {
            return 0.0;
        }
        let settings = self.settings.read().clone();
        let (score, crossings) = loop {
            let Some(record) = self.record_for(ctx.author(), &settings.thresholds, now) else {
                return 0.0;
            };
            // A concurrent release or disable may retire the record between
            // lookup and lock.
            if let Some(update) = record.lock().update(delta, &settings, now) {
                break update;
            }
        };

        tracing::debug!(author = %ctx.author().name(), delta, score, "points added");
        for crossing in crossings {
            match crossing {
                Crossing::Up(_) => fire(&settings.thresholds, crossing, ctx, services),
                Crossing::Down(_) => {
                    let mut fresh = FilterContext::new("", ctx.author().clone());
                    fire(&settings.thresholds, crossing, &mut fresh, services);
                }
            }
        }
        score
    }

    /// Apply pending leak to every record and fire descending actions for
    /// thresholds left behind. Run by the leak task on every tick.
    pub fn leak_all(&self, services: &Services) {
        self.leak_all_at(services, Instant::now());
    }

    fn leak_all_at(&self, services: &Services, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        let settings = self.settings.read().clone();
        let records: Vec<_> = self.records.read().values().cloned().collect();

        for record in records {
            let mut crossings = Vec::new();
            let author = {
                let mut record = record.lock();
                record.rebase(&settings.thresholds);
                record.leak(now, &settings.leak);
                record.settle(&settings.thresholds, &mut crossings);
                record.author.clone()
            };
            if crossings.is_empty() {
                continue;
            }
            let mut ctx = FilterContext::new("", author);
            for crossing in crossings {
                fire(&settings.thresholds, crossing, &mut ctx, services);
            }
        }
    }

    /// Current score of `author`, with leak applied but not stored.
    pub fn points(&self, author: &AuthorId) -> f64 {
        self.points_at(author, Instant::now())
    }

    fn points_at(&self, author: &AuthorId, now: Instant) -> f64 {
        let leak = self.settings.read().leak;
        match self.records.read().get(author) {
            Some(record) => record.lock().leaked(now, &leak),
            None => 0.0,
        }
    }

    /// Forget `author` if their score has leaked to zero. Hosts call this when
    /// an author goes away; returns whether a record was dropped.
    pub fn release(&self, author: &AuthorId) -> bool {
        let leak = self.settings.read().leak;
        let now = Instant::now();
        let mut records = self.records.write();
        let idle = records.get(author).is_some_and(|record| {
            let mut record = record.lock();
            record.retired = record.leaked(now, &leak) <= 0.0;
            record.retired
        });
        if idle {
            records.remove(author);
        }
        idle
    }

    /// Whether the background leak task is alive.
    pub fn is_leaking(&self) -> bool {
        self.task.lock().as_ref().is_some_and(LeakTask::is_running)
    }

    /// Number of authors with a live record.
    pub fn tracked(&self) -> usize {
        self.records.read().len()
    }

    /// Live record for `author`, created on first use. `None` once scoring
    /// has been turned off, so a racing update cannot outlive `disable`.
    fn record_for(
        &self,
        author: &Arc<dyn MessageAuthor>,
        table: &Arc<Thresholds>,
        now: Instant,
    ) -> Option<Arc<Mutex<ScoreRecord>>> {
        let id = author.id();
        if let Some(record) = self.records.read().get(&id) {
            return Some(record.clone());
        }
        let mut records = self.records.write();
        if !self.is_enabled() {
            return None;
        }
        let record = records
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(ScoreRecord::new(author.clone(), table.clone(), now))));
        Some(record.clone())
    }
}

fn fire(thresholds: &Thresholds, crossing: Crossing, ctx: &mut FilterContext, services: &Services) {
    let (index, up) = match crossing {
        Crossing::Up(index) => (index, true),
        Crossing::Down(index) => (index, false),
    };
    let Some(threshold) = thresholds.get(index) else {
        return;
    };
    tracing::info!(
        author = %ctx.author().name(),
        threshold = threshold.name(),
        points = threshold.points(),
        direction = if up { "ascending" } else { "descending" },
        "threshold crossed"
    );
    let actions = if up { threshold.ascending() } else { threshold.descending() };
    for action in actions {
        run_isolated(action.as_ref(), ctx, services);
    }
}
