//! Release & cleanup scheduling for melodic voices.
//!
//! Stopping a voice ramps its output gain down from wherever it currently
//! is, schedules source stops a little after the ramp ends, and returns a
//! [`TeardownPlan`] that the owner executes later from its timer queue.
//! If the graceful path fails the voice is silenced on the spot instead.

use tracing::{debug, error};

use crate::error::GraphError;
use crate::graph::{AudioGraph, NodeId, ParamKind};

use super::voice::{Voice, VoiceId};

/// Longest release tail, whatever the settings ask for.
pub const RELEASE_CEILING: f64 = 3.0;
/// Releases shorter than this ramp linearly.
pub const LINEAR_RELEASE_THRESHOLD: f64 = 0.1;
/// Target of exponential release ramps.
pub const GAIN_FLOOR: f64 = 0.0001;
/// Oscillators stop this long after the ramp ends.
pub const STOP_GUARD: f64 = 0.1;
/// Noise transients are stopped this soon after release starts.
pub const NOISE_STOP_AFTER: f64 = 0.1;
/// Nodes are freed this long after the ramp ends.
pub const TEARDOWN_GUARD: f64 = 0.2;
/// Release used when a note is retriggered while still sounding.
pub const RETRIGGER_RELEASE: f64 = 0.015;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleasePath {
    Graceful { release: f64, linear: bool },
    Emergency,
}

/// Deferred disconnect-and-free of a released voice's nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TeardownPlan {
    pub voice: VoiceId,
    pub note_id: String,
    /// Audio-clock time at which the nodes may be removed.
    pub due: f64,
    pub nodes: Vec<NodeId>,
    pub path: ReleasePath,
}

impl TeardownPlan {
    /// Remove the captured nodes. Ids freed earlier are skipped, so a
    /// plan can never touch a voice built later for the same note.
    pub fn execute(&self, graph: &mut AudioGraph) -> usize {
        let freed = graph.remove_all(&self.nodes);
        debug!(
            "Tore down {} ({}): {} of {} nodes freed",
            self.note_id,
            self.voice,
            freed,
            self.nodes.len()
        );
        freed
    }
}

/// Clamp a requested release into `[0, RELEASE_CEILING]`.
pub fn clamp_release(release: f64) -> f64 {
    if release.is_finite() {
        release.clamp(0.0, RELEASE_CEILING)
    } else {
        RELEASE_CEILING
    }
}

/// Begin the release of `voice`, falling back to [`force_stop`] on failure.
pub fn stop_voice(graph: &mut AudioGraph, voice: &Voice, release: f64) -> TeardownPlan {
    let now = graph.current_time();
    let release = clamp_release(release);

    let path = match graceful_release(graph, voice, now, release) {
        Ok(path) => path,
        Err(e) => {
            error!(
                "Release of {} ({}) failed, silencing immediately: {}",
                voice.note_id, voice.id, e
            );
            silence(graph, voice, now);
            ReleasePath::Emergency
        }
    };

    TeardownPlan {
        voice: voice.id,
        note_id: voice.note_id.clone(),
        due: now + release + TEARDOWN_GUARD,
        nodes: voice.nodes().to_vec(),
        path,
    }
}

/// Zero the voice and stop every source now, ignoring errors.
pub fn force_stop(graph: &mut AudioGraph, voice: &Voice) -> TeardownPlan {
    let now = graph.current_time();
    silence(graph, voice, now);
    TeardownPlan {
        voice: voice.id,
        note_id: voice.note_id.clone(),
        due: now + TEARDOWN_GUARD,
        nodes: voice.nodes().to_vec(),
        path: ReleasePath::Emergency,
    }
}

fn graceful_release(
    graph: &mut AudioGraph,
    voice: &Voice,
    now: f64,
    release: f64,
) -> Result<ReleasePath, GraphError> {
    let gain = graph.param_mut(voice.output, ParamKind::Gain)?;
    let current = gain.value_at(now);
    gain.cancel_scheduled_values(now);
    gain.set_value_at_time(current, now)?;

    let end = now + release;
    let linear = release < LINEAR_RELEASE_THRESHOLD || current <= GAIN_FLOOR;
    if linear {
        gain.linear_ramp_to_value_at_time(0.0, end)?;
    } else {
        gain.exponential_ramp_to_value_at_time(GAIN_FLOOR, end)?;
    }

    for component in voice.components.iter().filter(|c| c.started) {
        graph.stop(component.oscillator, end + STOP_GUARD)?;
    }
    if let Some(noise) = voice.noise.as_ref().filter(|n| n.started) {
        graph.stop(noise.source, now + NOISE_STOP_AFTER)?;
    }

    Ok(ReleasePath::Graceful { release, linear })
}

fn silence(graph: &mut AudioGraph, voice: &Voice, now: f64) {
    if let Ok(gain) = graph.param_mut(voice.output, ParamKind::Gain) {
        gain.set_value_immediately(0.0);
    }
    for source in voice.started_sources() {
        let _ = graph.stop(source, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AutomationEvent, GraphConfig};
    use crate::settings::SynthesisSettings;
    use crate::synth::harmonic::build_piano_voice;

    fn voice_at(graph: &mut AudioGraph, frequency: f64) -> Voice {
        let dest = graph.destination();
        build_piano_voice(
            graph,
            dest,
            VoiceId(7),
            "C4",
            frequency,
            &SynthesisSettings::default(),
        )
        .unwrap()
    }

    fn advance(graph: &mut AudioGraph, frames: usize) {
        let mut block = vec![0.0; frames];
        graph.render(&mut block);
    }

    #[test]
    fn release_is_clamped_to_the_ceiling() {
        assert_eq!(clamp_release(10.0), RELEASE_CEILING);
        assert_eq!(clamp_release(-1.0), 0.0);
        assert_eq!(clamp_release(f64::INFINITY), RELEASE_CEILING);
        assert_eq!(clamp_release(1.5), 1.5);
    }

    #[test]
    fn long_release_ramps_exponentially_to_the_floor() {
        let mut graph = AudioGraph::new(GraphConfig::default());
        let voice = voice_at(&mut graph, 261.63);
        advance(&mut graph, 4410);
        let now = graph.current_time();

        let plan = stop_voice(&mut graph, &voice, 10.0);
        assert_eq!(
            plan.path,
            ReleasePath::Graceful {
                release: RELEASE_CEILING,
                linear: false
            }
        );
        assert!((plan.due - (now + 3.2)).abs() < 1e-9);

        let gain = graph.param(voice.output, ParamKind::Gain).unwrap();
        match gain.events().last() {
            Some(AutomationEvent::ExponentialRamp { time, value }) => {
                assert!((time - (now + 3.0)).abs() < 1e-9);
                assert_eq!(*value, GAIN_FLOOR);
            }
            other => panic!("expected exponential ramp, got {other:?}"),
        }

        for c in &voice.components {
            let stop = graph.source_schedule(c.oscillator).unwrap().stop.unwrap();
            assert!((stop - (now + 3.1)).abs() < 1e-9);
        }
    }

    #[test]
    fn short_release_ramps_linearly_to_zero() {
        let mut graph = AudioGraph::new(GraphConfig::default());
        let voice = voice_at(&mut graph, 261.63);
        advance(&mut graph, 4410);

        let plan = stop_voice(&mut graph, &voice, 0.05);
        assert!(matches!(plan.path, ReleasePath::Graceful { linear: true, .. }));
        let gain = graph.param(voice.output, ParamKind::Gain).unwrap();
        assert!(matches!(
            gain.events().last(),
            Some(AutomationEvent::LinearRamp { value, .. }) if *value == 0.0
        ));
    }

    #[test]
    fn release_mid_attack_starts_from_the_current_gain() {
        let mut graph = AudioGraph::new(GraphConfig::default());
        let dest = graph.destination();
        let settings = SynthesisSettings {
            volume: 1.0,
            attack: 1.0,
            ..SynthesisSettings::default()
        };
        let voice =
            build_piano_voice(&mut graph, dest, VoiceId(1), "C4", 261.63, &settings).unwrap();
        advance(&mut graph, 22050);
        let now = graph.current_time();

        stop_voice(&mut graph, &voice, 1.0);
        let gain = graph.param(voice.output, ParamKind::Gain).unwrap();
        assert!((gain.value_at(now) - 0.5).abs() < 1e-9);
        assert!(gain.value_at(now + 0.5) < 0.5);
    }

    #[test]
    fn noise_transient_stops_early() {
        let mut graph = AudioGraph::new(GraphConfig::default());
        let voice = voice_at(&mut graph, 220.0);
        let now = graph.current_time();
        stop_voice(&mut graph, &voice, 2.0);

        let noise = voice.noise.as_ref().unwrap();
        let stop = graph.source_schedule(noise.source).unwrap().stop.unwrap();
        assert!((stop - (now + NOISE_STOP_AFTER)).abs() < 1e-9);
    }

    #[test]
    fn failure_falls_back_to_emergency_silence() {
        let mut graph = AudioGraph::new(GraphConfig::default());
        let voice = voice_at(&mut graph, 261.63);
        advance(&mut graph, 441);
        // Output stage already gone: the graceful path cannot run.
        graph.remove(voice.output).unwrap();

        let plan = stop_voice(&mut graph, &voice, 1.0);
        assert_eq!(plan.path, ReleasePath::Emergency);
        let now = graph.current_time();
        for c in &voice.components {
            assert_eq!(graph.source_schedule(c.oscillator).unwrap().stop, Some(now));
        }
    }

    #[test]
    fn force_stop_zeroes_gain_immediately() {
        let mut graph = AudioGraph::new(GraphConfig::default());
        let voice = voice_at(&mut graph, 261.63);
        advance(&mut graph, 4410);

        let plan = force_stop(&mut graph, &voice);
        assert_eq!(plan.path, ReleasePath::Emergency);
        let gain = graph.param(voice.output, ParamKind::Gain).unwrap();
        assert!(gain.events().is_empty());
        assert_eq!(gain.value(), 0.0);

        advance(&mut graph, 1);
        assert!(voice.components.iter().all(|c| graph.has_ended(c.oscillator)));
    }

    #[test]
    fn teardown_frees_only_the_captured_nodes() {
        let mut graph = AudioGraph::new(GraphConfig::default());
        let before = graph.node_count();
        let voice = voice_at(&mut graph, 261.63);
        let plan = stop_voice(&mut graph, &voice, 0.5);

        let survivor = voice_at(&mut graph, 261.63);
        assert_eq!(plan.execute(&mut graph), voice.nodes().len());
        assert_eq!(graph.node_count(), before + survivor.nodes().len());
        assert!(survivor.nodes().iter().all(|&id| graph.contains(id)));

        assert_eq!(plan.execute(&mut graph), 0);
    }
}
