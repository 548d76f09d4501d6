//! Repeater — re-fires the last played percussion sound on a fixed period.

use serde::Serialize;
use tracing::debug;

use crate::percussion::PercussionKind;

pub const MIN_INTERVAL_MS: f64 = 50.0;
pub const MAX_INTERVAL_MS: f64 = 1000.0;
pub const DEFAULT_INTERVAL_MS: f64 = 200.0;

pub fn clamp_interval(ms: f64) -> f64 {
    if ms.is_finite() {
        ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
    } else {
        DEFAULT_INTERVAL_MS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeaterPhase {
    /// Nothing has been played yet.
    Idle,
    /// A sound is known but the repeat loop is off.
    Armed,
    Repeating,
}

/// The repeat loop is a pending deadline on the audio clock; each tick
/// advances it by exactly one interval from the previous deadline.
#[derive(Debug, Clone)]
pub struct Repeater {
    interval_ms: f64,
    last_kind: Option<PercussionKind>,
    next_fire: Option<f64>,
}

impl Default for Repeater {
    fn default() -> Self {
        Repeater::new(DEFAULT_INTERVAL_MS)
    }
}

impl Repeater {
    pub fn new(interval_ms: f64) -> Self {
        Repeater {
            interval_ms: clamp_interval(interval_ms),
            last_kind: None,
            next_fire: None,
        }
    }

    pub fn phase(&self) -> RepeaterPhase {
        match (self.next_fire, self.last_kind) {
            (Some(_), _) => RepeaterPhase::Repeating,
            (None, Some(_)) => RepeaterPhase::Armed,
            (None, None) => RepeaterPhase::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.next_fire.is_some()
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn last_kind(&self) -> Option<PercussionKind> {
        self.last_kind
    }

    /// Due time of the next tick while repeating.
    pub fn deadline(&self) -> Option<f64> {
        self.next_fire
    }

    fn interval_secs(&self) -> f64 {
        self.interval_ms / 1000.0
    }

    /// Start or stop repeating. Does nothing if no sound was ever played.
    pub fn toggle(&mut self, now: f64) -> RepeaterPhase {
        if self.next_fire.take().is_some() {
            debug!("Repeater stopped");
        } else if let Some(kind) = self.last_kind {
            self.next_fire = Some(now + self.interval_secs());
            debug!("Repeater started: {} every {} ms", kind, self.interval_ms);
        }
        self.phase()
    }

    /// Change the period; a running loop restarts from `now` with the new interval.
    pub fn set_interval(&mut self, ms: f64, now: f64) {
        self.interval_ms = clamp_interval(ms);
        if self.next_fire.is_some() {
            self.next_fire = Some(now + self.interval_secs());
        }
    }

    /// Record a pad hit; the next tick plays this sound.
    pub fn note_played(&mut self, kind: PercussionKind) {
        self.last_kind = Some(kind);
    }

    /// Consume one tick if it is due at or before `now`.
    pub fn poll(&mut self, now: f64) -> Option<PercussionKind> {
        let due = self.next_fire.filter(|&due| due <= now)?;
        self.next_fire = Some(due + self.interval_secs());
        self.last_kind
    }
}
