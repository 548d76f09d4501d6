//! Harmonic synthesizer — builds melodic voices on the graph.
//!
//! Piano mode stacks a fundamental, three harmonics and a slightly detuned
//! companion, adds a filtered noise "hammer" transient to low notes, and
//! shapes the sum with a two-stage envelope: a linear attack to the
//! volume followed by a short exponential fall to 70% of it. Oscillator
//! mode is a single waveform with a linear attack and hold.

use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::error::GraphError;
use crate::graph::{AudioGraph, NodeId, ParamKind, Patch};
use crate::settings::SynthesisSettings;

use super::voice::{Component, NoiseTransient, Voice, VoiceId};

/// One oscillator layer of a piano voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    pub waveform: Waveform,
    /// Multiple of the note frequency.
    pub ratio: f64,
    pub gain: f64,
}

pub const PARTIALS: [Partial; 5] = [
    Partial { waveform: Waveform::Triangle, ratio: 1.0, gain: 0.8 },
    Partial { waveform: Waveform::Triangle, ratio: 2.0, gain: 0.3 },
    Partial { waveform: Waveform::Sine, ratio: 3.0, gain: 0.15 },
    Partial { waveform: Waveform::Sine, ratio: 4.0, gain: 0.08 },
    Partial { waveform: Waveform::Triangle, ratio: 1.002, gain: 0.2 },
];

/// Notes at or above this frequency get no noise transient.
pub const NOISE_CUTOFF_HZ: f64 = 1000.0;
pub const NOISE_DURATION: f64 = 0.1;
pub const NOISE_PEAK: f32 = 0.1;
pub const NOISE_LEVEL: f64 = 0.05;
pub const NOISE_FLOOR: f64 = 0.0001;

/// Time of the post-attack fall.
pub const DECAY_TIME: f64 = 0.1;
pub const SUSTAIN_RATIO: f64 = 0.7;

pub const OSCILLATOR_MODE_GAIN: f64 = 0.5;

pub fn has_noise_transient(frequency: f64) -> bool {
    frequency < NOISE_CUTOFF_HZ
}

/// Build and start a piano voice feeding `destination`.
pub fn build_piano_voice(
    graph: &mut AudioGraph,
    destination: NodeId,
    id: VoiceId,
    note_id: &str,
    frequency: f64,
    settings: &SynthesisSettings,
) -> Result<Voice, GraphError> {
    let now = graph.current_time();
    let ((output, components, noise), nodes) = graph.patch(|p| {
        let output = p.gain(0.0)?;
        p.connect(output, destination)?;

        let components = PARTIALS
            .iter()
            .map(|partial| component(p, output, partial.waveform, frequency * partial.ratio, partial.gain))
            .collect::<Result<Vec<_>, _>>()?;

        let noise = if has_noise_transient(frequency) {
            Some(noise_transient(p, output, frequency, now)?)
        } else {
            None
        };

        let gain = p.param(output, ParamKind::Gain)?;
        gain.set_value_at_time(0.0, now)?;
        gain.linear_ramp_to_value_at_time(settings.volume, now + settings.attack)?;
        let sustain = settings.volume * SUSTAIN_RATIO;
        let decay_end = now + settings.attack + DECAY_TIME;
        if sustain > 0.0 {
            gain.exponential_ramp_to_value_at_time(sustain, decay_end)?;
        } else {
            gain.linear_ramp_to_value_at_time(sustain, decay_end)?;
        }

        Ok((output, components, noise))
    })?;

    let mut voice = Voice {
        id,
        note_id: note_id.to_string(),
        components,
        noise,
        output,
        created_at: now,
        nodes,
    };
    voice.start(graph, now);
    Ok(voice)
}

/// Build and start a single-oscillator voice using `settings.oscillator_waveform`.
pub fn build_oscillator_voice(
    graph: &mut AudioGraph,
    destination: NodeId,
    id: VoiceId,
    note_id: &str,
    frequency: f64,
    settings: &SynthesisSettings,
) -> Result<Voice, GraphError> {
    let now = graph.current_time();
    let ((output, components), nodes) = graph.patch(|p| {
        let output = p.gain(0.0)?;
        p.connect(output, destination)?;
        let single = component(
            p,
            output,
            settings.oscillator_waveform,
            frequency,
            OSCILLATOR_MODE_GAIN,
        )?;

        let gain = p.param(output, ParamKind::Gain)?;
        gain.set_value_at_time(0.0, now)?;
        gain.linear_ramp_to_value_at_time(settings.volume, now + settings.attack)?;
        Ok((output, vec![single]))
    })?;

    let mut voice = Voice {
        id,
        note_id: note_id.to_string(),
        components,
        noise: None,
        output,
        created_at: now,
        nodes,
    };
    voice.start(graph, now);
    Ok(voice)
}

fn component(
    p: &mut Patch<'_>,
    output: NodeId,
    waveform: Waveform,
    frequency: f64,
    gain: f64,
) -> Result<Component, GraphError> {
    let oscillator = p.oscillator(waveform, frequency)?;
    let gain_node = p.gain(gain)?;
    p.connect(oscillator, gain_node)?;
    p.connect(gain_node, output)?;
    Ok(Component {
        waveform,
        frequency,
        gain,
        oscillator,
        gain_node,
        started: false,
    })
}

fn noise_transient(
    p: &mut Patch<'_>,
    output: NodeId,
    frequency: f64,
    now: f64,
) -> Result<NoiseTransient, GraphError> {
    let source = p.noise(NOISE_DURATION, NOISE_PEAK)?;
    let filter = p.biquad(FilterType::Lowpass, frequency * 4.0, 1.0)?;
    let gain = p.gain(NOISE_LEVEL)?;
    p.connect(source, filter)?;
    p.connect(filter, gain)?;
    p.connect(gain, output)?;

    let level = p.param(gain, ParamKind::Gain)?;
    level.set_value_at_time(NOISE_LEVEL, now)?;
    level.exponential_ramp_to_value_at_time(NOISE_FLOOR, now + NOISE_DURATION)?;

    Ok(NoiseTransient {
        source,
        filter,
        gain,
        started: false,
    })
}
