//! Replay scheduler: the current index into a timestamp list, plus a timer
//! that advances it at a pace derived from the real gaps between snapshots.
//!
//! The scheduler is owned by one thread and never spawns work of its own. A
//! running replay holds a `crossbeam_channel` timer receiver; the owning loop
//! selects on [`ReplayScheduler::timer`] and calls
//! [`ReplayScheduler::on_tick`] for each tick it receives. Stopping drops the
//! receiver, so no tick can be observed after a stop has returned and at most
//! one timer exists per scheduler.
//!
//! State changes are published as [`ReplayEvent`]s to every subscriber, in the
//! order they were made.
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, after, never, tick, unbounded};
use time::format_description::well_known::Rfc3339;
use time::macros::{date, format_description};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::{debug, trace, warn};

use crate::config::{Pacing, ReplayConfig};

/// Calendar day time-of-day stamps are pinned to before differencing.
const REFERENCE_DATE: Date = date!(2023-01-01);

/// Shortest timer period handed to crossbeam.
const MIN_PERIOD_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayEvent {
    Index(usize),
    Replaying(bool),
}

fn parse_time_of_day(ts: &str) -> Option<Time> {
    let hms_frac = format_description!("[hour]:[minute]:[second].[subsecond]");
    let hms = format_description!("[hour]:[minute]:[second]");
    let hm = format_description!("[hour]:[minute]");
    Time::parse(ts, &hms_frac)
        .or_else(|_| Time::parse(ts, &hms))
        .or_else(|_| Time::parse(ts, &hm))
        .ok()
}

/// Milliseconds for a snapshot timestamp: a time of day on the reference
/// date, or an RFC 3339 date-time.
pub fn timestamp_millis(ts: &str) -> Option<f64> {
    let ts = ts.trim();
    let at = match parse_time_of_day(ts) {
        Some(t) => PrimitiveDateTime::new(REFERENCE_DATE, t).assume_utc(),
        None => OffsetDateTime::parse(ts, &Rfc3339).ok()?,
    };
    // whole milliseconds, exact in an f64
    Some((at.unix_timestamp_nanos() / 1_000_000) as f64)
}

/// Gap in ms between each adjacent pair of timestamps, followed by the mean
/// gap. With fewer than two timestamps the table is just `fallback`.
///
/// Pairs with an unparsable side count as 0, and so do gaps that go
/// backwards.
pub fn time_deltas(timestamps: &[String], fallback: Duration) -> Vec<f64> {
    let millis: Vec<Option<f64>> = timestamps
        .iter()
        .map(|ts| {
            let ms = timestamp_millis(ts);
            if ms.is_none() {
                warn!(timestamp = %ts, "unparsable snapshot timestamp, its gaps count as zero");
            }
            ms
        })
        .collect();

    let mut deltas: Vec<f64> = millis
        .windows(2)
        .map(|pair| match (pair[0], pair[1]) {
            (Some(from), Some(to)) => (to - from).max(0.0),
            _ => 0.0,
        })
        .collect();

    if deltas.is_empty() {
        deltas.push(fallback.as_secs_f64() * 1000.0);
    } else {
        let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
        deltas.push(mean);
    }
    deltas
}

/// Delta table of one replay run and the factor that maps it onto the
/// configured replay duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayPlan {
    deltas_ms: Vec<f64>,
    scale_factor: f64,
    even_period_ms: f64,
}

impl ReplayPlan {
    pub fn new(timestamps: &[String], config: &ReplayConfig) -> Self {
        let deltas_ms = time_deltas(timestamps, config.fallback_delta);
        let total_ms = config.total_duration.as_secs_f64() * 1000.0;
        let sum: f64 = deltas_ms.iter().sum();
        let scale_factor = if sum > 0.0 { total_ms / sum } else { 0.0 };
        let steps = timestamps.len().saturating_sub(1).max(1);
        Self {
            deltas_ms,
            scale_factor,
            even_period_ms: total_ms / steps as f64,
        }
    }

    pub fn deltas_ms(&self) -> &[f64] {
        &self.deltas_ms
    }

    /// `total_duration / sum(deltas)`, 0 when every delta is 0.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Scaled wait before leaving `step`. A zero or missing delta falls back
    /// to an even split of the replay duration.
    pub fn period(&self, step: usize) -> Duration {
        let scaled = self.deltas_ms.get(step).copied().unwrap_or(0.0) * self.scale_factor;
        let ms = if scaled > 0.0 && scaled.is_finite() { scaled } else { self.even_period_ms };
        Duration::from_secs_f64(ms.max(MIN_PERIOD_MS) / 1000.0)
    }
}

struct ActiveRun {
    plan: ReplayPlan,
    timer: Receiver<Instant>,
}

pub struct ReplayScheduler {
    config: ReplayConfig,
    timestamps: Vec<String>,
    current_index: usize,
    run: Option<ActiveRun>,
    observers: Vec<Sender<ReplayEvent>>,
}

impl Default for ReplayScheduler {
    fn default() -> Self {
        Self::new(ReplayConfig::default())
    }
}

impl ReplayScheduler {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            timestamps: Vec::new(),
            current_index: 0,
            run: None,
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// New channel of state changes. It starts with the current index and
    /// replay flag.
    pub fn subscribe(&mut self) -> Receiver<ReplayEvent> {
        let (tx, rx) = unbounded();
        let _ = tx.send(ReplayEvent::Index(self.current_index));
        let _ = tx.send(ReplayEvent::Replaying(self.is_replaying()));
        self.observers.push(tx);
        rx
    }

    fn publish(&mut self, event: ReplayEvent) {
        self.observers.retain(|tx| tx.send(event).is_ok());
    }

    fn set_index(&mut self, index: usize) {
        self.current_index = index;
        self.publish(ReplayEvent::Index(index));
    }

    pub fn timestamps(&self) -> &[String] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_replaying(&self) -> bool {
        self.run.is_some()
    }

    /// `None` when there are no timestamps.
    pub fn current_timestamp(&self) -> Option<&str> {
        self.timestamps.get(self.current_index).map(String::as_str)
    }

    /// Plan of the run in progress.
    pub fn plan(&self) -> Option<&ReplayPlan> {
        self.run.as_ref().map(|run| &run.plan)
    }

    /// Replace the timestamp list. Any running replay is stopped first so no
    /// timer outlives the list it was planned for.
    pub fn set_timestamps(&mut self, timestamps: Vec<String>) {
        self.stop();
        debug!(count = timestamps.len(), "timestamps replaced");
        self.timestamps = timestamps;
        self.set_index(0);
    }

    /// Step and seek requests are ignored while replaying.
    fn accepts_manual(&self, what: &str) -> bool {
        if self.is_replaying() {
            debug!(request = what, "ignored while replaying");
            return false;
        }
        true
    }

    pub fn go_to_previous(&mut self) {
        if !self.accepts_manual("previous") {
            return;
        }
        if self.current_index > 0 {
            self.set_index(self.current_index - 1);
        }
    }

    pub fn go_to_next(&mut self) {
        if !self.accepts_manual("next") {
            return;
        }
        if self.current_index + 1 < self.timestamps.len() {
            self.set_index(self.current_index + 1);
        }
    }

    pub fn select_index(&mut self, index: usize) {
        if !self.accepts_manual("seek") {
            return;
        }
        if index < self.timestamps.len() {
            self.set_index(index);
        } else {
            debug!(index, len = self.timestamps.len(), "seek out of range");
        }
    }

    pub fn toggle_replay(&mut self) {
        if self.is_replaying() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Begin a run from the first timestamp.
    fn start(&mut self) {
        self.stop();
        let plan = ReplayPlan::new(&self.timestamps, &self.config);
        let first = plan.period(0);
        let timer = match self.config.pacing {
            Pacing::Fixed => tick(first),
            Pacing::Proportional => after(first),
        };
        debug!(
            snapshots = self.timestamps.len(),
            scale_factor = plan.scale_factor(),
            period_ms = first.as_millis() as u64,
            pacing = ?self.config.pacing,
            "replay started"
        );
        self.run = Some(ActiveRun { plan, timer });
        self.publish(ReplayEvent::Replaying(true));
        self.set_index(0);
    }

    /// Cancel the timer and leave the index where it is. Safe to call when
    /// idle.
    pub fn stop(&mut self) {
        if self.run.take().is_some() {
            debug!(index = self.current_index, "replay stopped");
            self.publish(ReplayEvent::Replaying(false));
        }
    }

    /// Receiver of the running timer, or one that never fires when idle.
    /// Fetch it again after every state change.
    pub fn timer(&self) -> Receiver<Instant> {
        match &self.run {
            Some(run) => run.timer.clone(),
            None => never(),
        }
    }

    /// Advance one step. The run ends right after the last index has been
    /// published, or at once if it was already there.
    pub fn on_tick(&mut self) {
        if self.run.is_none() {
            return;
        }
        let next = self.current_index + 1;
        if next >= self.timestamps.len() {
            self.stop();
            return;
        }
        trace!(index = next, "replay tick");
        self.set_index(next);
        if next + 1 == self.timestamps.len() {
            self.stop();
            return;
        }
        if self.config.pacing == Pacing::Proportional {
            if let Some(run) = self.run.as_mut() {
                run.timer = after(run.plan.period(next));
            }
        }
    }

    /// Block for the next tick and apply it. `false` when idle.
    pub fn wait_tick(&mut self) -> bool {
        let Some(run) = &self.run else { return false };
        if run.timer.recv().is_err() {
            return false;
        }
        self.on_tick();
        true
    }

    /// Block until the current run finishes; returns the number of ticks.
    pub fn run_to_end(&mut self) -> usize {
        let mut ticks = 0;
        while self.wait_tick() {
            ticks += 1;
        }
        ticks
    }
}
