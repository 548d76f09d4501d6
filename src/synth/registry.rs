//! Voice registry — the single record of which melodic notes are sounding.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::GraphError;
use crate::graph::{AudioGraph, NodeId};
use crate::settings::{SoundMode, SynthesisSettings};

use super::harmonic::{build_oscillator_voice, build_piano_voice};
use super::release::{RETRIGGER_RELEASE, TeardownPlan, force_stop, stop_voice};
use super::voice::{Voice, VoiceId};

type VoiceBuilder = fn(
    &mut AudioGraph,
    NodeId,
    VoiceId,
    &str,
    f64,
    &SynthesisSettings,
) -> Result<Voice, GraphError>;

/// Maps note identifiers to their live voice.
///
/// Membership reflects logical note state: a released voice leaves the
/// registry at once even though its tail keeps sounding. Every release
/// produces a [`TeardownPlan`] which the owner collects with
/// [`VoiceRegistry::take_released`].
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: HashMap<String, Voice>,
    released: Vec<TeardownPlan>,
    next_id: u64,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a note, first releasing any voice already playing `note_id`.
    ///
    /// The old voice goes through the normal release path but with
    /// [`RETRIGGER_RELEASE`] instead of the configured release, so its tail
    /// does not smear over the new attack.
    pub fn note_on(
        &mut self,
        graph: &mut AudioGraph,
        destination: NodeId,
        note_id: &str,
        frequency: f64,
        settings: &SynthesisSettings,
        mode: SoundMode,
    ) -> Result<VoiceId, GraphError> {
        if let Some(previous) = self.voices.remove(note_id) {
            debug!("Retrigger of {} releases {}", note_id, previous.id);
            self.released
                .push(stop_voice(graph, &previous, RETRIGGER_RELEASE));
        }

        self.next_id += 1;
        let id = VoiceId(self.next_id);
        let build: VoiceBuilder = match mode {
            SoundMode::Piano => build_piano_voice,
            SoundMode::Oscillator => build_oscillator_voice,
        };
        let voice = build(graph, destination, id, note_id, frequency, settings).inspect_err(|e| {
            warn!("Failed to build voice for {} at {:.2} Hz: {}", note_id, frequency, e)
        })?;
        self.voices.insert(note_id.to_string(), voice);
        Ok(id)
    }

    /// Release `note_id`. Returns `false` if the note was not playing.
    pub fn note_off(&mut self, graph: &mut AudioGraph, note_id: &str, release: f64) -> bool {
        match self.voices.remove(note_id) {
            Some(voice) => {
                self.released.push(stop_voice(graph, &voice, release));
                true
            }
            None => false,
        }
    }

    /// Release every voice and clear the registry. Returns how many were released.
    pub fn stop_all(&mut self, graph: &mut AudioGraph, release: f64) -> usize {
        let count = self.voices.len();
        for (_, voice) in self.voices.drain() {
            self.released.push(stop_voice(graph, &voice, release));
        }
        count
    }

    /// Silence every voice immediately and clear the registry.
    pub fn emergency_stop(&mut self, graph: &mut AudioGraph) -> usize {
        let count = self.voices.len();
        for (_, voice) in self.voices.drain() {
            self.released.push(force_stop(graph, &voice));
        }
        count
    }

    /// Teardown plans produced since the last call.
    pub fn take_released(&mut self) -> Vec<TeardownPlan> {
        std::mem::take(&mut self.released)
    }

    pub fn get(&self, note_id: &str) -> Option<&Voice> {
        self.voices.get(note_id)
    }

    pub fn contains(&self, note_id: &str) -> bool {
        self.voices.contains_key(note_id)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Sounding note identifiers, sorted.
    pub fn active_notes(&self) -> Vec<String> {
        let mut notes: Vec<String> = self.voices.keys().cloned().collect();
        notes.sort();
        notes
    }
}
