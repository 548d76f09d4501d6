//! Voice — the graph fragment behind one sounding melodic note.

use std::fmt;

use tracing::warn;

use crate::dsp::oscillator::Waveform;
use crate::graph::{AudioGraph, NodeId};

/// Identity of one voice instance; a retriggered note gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice-{}", self.0)
    }
}

/// One oscillator feeding the voice output through its own gain stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub waveform: Waveform,
    pub frequency: f64,
    /// Level relative to the voice output.
    pub gain: f64,
    pub oscillator: NodeId,
    pub gain_node: NodeId,
    pub started: bool,
}

/// Short filtered noise burst layered under low notes.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseTransient {
    pub source: NodeId,
    pub filter: NodeId,
    pub gain: NodeId,
    pub started: bool,
}

#[derive(Debug, Clone)]
pub struct Voice {
    pub id: VoiceId,
    pub note_id: String,
    pub components: Vec<Component>,
    pub noise: Option<NoiseTransient>,
    /// Voice-level gain stage carrying the envelope.
    pub output: NodeId,
    /// Audio-clock time at which the voice was built.
    pub created_at: f64,
    pub(crate) nodes: Vec<NodeId>,
}

impl Voice {
    /// Every node owned by this voice, for teardown.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Source nodes that were started successfully.
    pub fn started_sources(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.components
            .iter()
            .filter(|c| c.started)
            .map(|c| c.oscillator)
            .chain(self.noise.iter().filter(|n| n.started).map(|n| n.source))
    }

    /// Start every source at `when`.
    ///
    /// A source that cannot start is logged and skipped; the rest of the
    /// voice still sounds. Returns how many sources started.
    pub fn start(&mut self, graph: &mut AudioGraph, when: f64) -> usize {
        let mut started = 0;
        for component in &mut self.components {
            match graph.start(component.oscillator, when) {
                Ok(()) => {
                    component.started = true;
                    started += 1;
                }
                Err(e) => warn!(
                    "Failed to start {:?} oscillator at {:.2} Hz for {}: {}",
                    component.waveform, component.frequency, self.note_id, e
                ),
            }
        }
        if let Some(noise) = self.noise.as_mut() {
            match graph.start(noise.source, when) {
                Ok(()) => {
                    noise.started = true;
                    started += 1;
                }
                Err(e) => warn!("Failed to start noise transient for {}: {}", self.note_id, e),
            }
        }
        started
    }
}
