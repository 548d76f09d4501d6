//! Percussion synthesis library.
//!
//! Every sound is a stateless recipe that builds a one-shot graph fragment
//! on the shared graph, starts it, and schedules its own stop. Hits are not
//! registered anywhere; the caller frees their nodes once `duration` has
//! elapsed.

mod clap;
mod cowbell;
mod cymbal;
mod kick;
mod laser;
mod rimshot;
mod siren;
mod snare;
mod tom;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GraphError, WorkstationError};
use crate::graph::{AudioGraph, NodeId, ParamKind, Patch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercussionKind {
    Kick,
    Kick2,
    Snare,
    Snare2,
    Cymbal,
    Tom,
    Siren,
    OpenHiHat,
    Clap,
    Cowbell,
    Rimshot,
    Laser,
}

impl PercussionKind {
    pub const ALL: [PercussionKind; 12] = [
        PercussionKind::Kick,
        PercussionKind::Kick2,
        PercussionKind::Snare,
        PercussionKind::Snare2,
        PercussionKind::Cymbal,
        PercussionKind::Tom,
        PercussionKind::Siren,
        PercussionKind::OpenHiHat,
        PercussionKind::Clap,
        PercussionKind::Cowbell,
        PercussionKind::Rimshot,
        PercussionKind::Laser,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PercussionKind::Kick => "kick",
            PercussionKind::Kick2 => "kick2",
            PercussionKind::Snare => "snare",
            PercussionKind::Snare2 => "snare2",
            PercussionKind::Cymbal => "cymbal",
            PercussionKind::Tom => "tom",
            PercussionKind::Siren => "siren",
            PercussionKind::OpenHiHat => "openhihat",
            PercussionKind::Clap => "clap",
            PercussionKind::Cowbell => "cowbell",
            PercussionKind::Rimshot => "rimshot",
            PercussionKind::Laser => "laser",
        }
    }

    fn recipe(self) -> Recipe {
        match self {
            PercussionKind::Kick => kick::kick,
            PercussionKind::Kick2 => kick::kick2,
            PercussionKind::Snare => snare::snare,
            PercussionKind::Snare2 => snare::snare2,
            PercussionKind::Cymbal => cymbal::cymbal,
            PercussionKind::Tom => tom::tom,
            PercussionKind::Siren => siren::siren,
            PercussionKind::OpenHiHat => cymbal::open_hihat,
            PercussionKind::Clap => clap::clap,
            PercussionKind::Cowbell => cowbell::cowbell,
            PercussionKind::Rimshot => rimshot::rimshot,
            PercussionKind::Laser => laser::laser,
        }
    }
}

impl fmt::Display for PercussionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PercussionKind {
    type Err = WorkstationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        PercussionKind::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| WorkstationError::UnknownPercussion(s.to_string()))
    }
}

/// A fired one-shot sound.
#[derive(Debug, Clone, PartialEq)]
pub struct PercussionHit {
    pub kind: PercussionKind,
    pub nodes: Vec<NodeId>,
    /// Seconds from `started_at` until every source has stopped.
    pub duration: f64,
    pub started_at: f64,
}

impl PercussionHit {
    pub fn ends_at(&self) -> f64 {
        self.started_at + self.duration
    }
}

/// Builds the fragment, connects it to the destination, starts and stops
/// its sources, and returns the hit duration.
type Recipe = fn(&mut Patch<'_>, NodeId, f64) -> Result<f64, GraphError>;

/// Build and fire `kind`; a failed build leaves nothing behind in the graph.
pub fn build(
    kind: PercussionKind,
    graph: &mut AudioGraph,
    destination: NodeId,
) -> Result<PercussionHit, GraphError> {
    let now = graph.current_time();
    let recipe = kind.recipe();
    let (duration, nodes) = graph.patch(|p| recipe(p, destination, now))?;
    Ok(PercussionHit {
        kind,
        nodes,
        duration,
        started_at: now,
    })
}

/// Fire `kind`, logging instead of propagating construction failures.
pub fn fire(
    kind: PercussionKind,
    graph: &mut AudioGraph,
    destination: NodeId,
) -> Option<PercussionHit> {
    build(kind, graph, destination)
        .inspect_err(|e| warn!("Failed to play {}: {}", kind, e))
        .ok()
}

// ── Shared recipe helpers ───────────────────────────────────────

/// Level that exponential percussion decays end on.
pub(crate) const DECAY_FLOOR: f64 = 0.001;

/// A gain stage that starts at `peak` and decays exponentially over `length`.
fn decaying_gain(p: &mut Patch<'_>, peak: f64, at: f64, length: f64) -> Result<NodeId, GraphError> {
    let gain = p.gain(peak)?;
    let param = p.param(gain, ParamKind::Gain)?;
    param.set_value_at_time(peak, at)?;
    param.exponential_ramp_to_value_at_time(DECAY_FLOOR, at + length)?;
    Ok(gain)
}

/// Exponential frequency sweep on an oscillator or filter.
fn sweep(
    p: &mut Patch<'_>,
    node: NodeId,
    from: f64,
    to: f64,
    at: f64,
    length: f64,
) -> Result<(), GraphError> {
    let param = p.param(node, ParamKind::Frequency)?;
    param.set_value_at_time(from, at)?;
    param.exponential_ramp_to_value_at_time(to, at + length)?;
    Ok(())
}

/// Schedule a source to sound from `at` for `length` seconds.
fn play(p: &mut Patch<'_>, source: NodeId, at: f64, length: f64) -> Result<(), GraphError> {
    p.start(source, at)?;
    p.stop(source, at + length)
}
