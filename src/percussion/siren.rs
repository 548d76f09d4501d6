use crate::dsp::oscillator::Waveform;
use crate::error::GraphError;
use crate::graph::{NodeId, ParamKind, Patch};

use super::play;

const LENGTH: f64 = 2.0;
const LFO_RATE: f64 = 5.0;
const LFO_DEPTH: f64 = 400.0;

/// Two detuned saws wobbled by a 5 Hz LFO, faded in, held, faded out.
pub(super) fn siren(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let lfo = p.oscillator(Waveform::Sine, LFO_RATE)?;
    let depth = p.gain(LFO_DEPTH)?;
    p.connect(lfo, depth)?;

    let amp = p.gain(0.0)?;
    let gain = p.param(amp, ParamKind::Gain)?;
    gain.set_value_at_time(0.0, now)?;
    gain.linear_ramp_to_value_at_time(0.5, now + 0.05)?;
    gain.set_value_at_time(0.5, now + 1.5)?;
    gain.linear_ramp_to_value_at_time(0.0, now + LENGTH)?;
    p.connect(amp, destination)?;

    for frequency in [800.0, 805.0] {
        let osc = p.oscillator(Waveform::Sawtooth, frequency)?;
        p.connect_param(depth, osc, ParamKind::Frequency)?;
        p.connect(osc, amp)?;
        play(p, osc, now, LENGTH)?;
    }
    play(p, lfo, now, LENGTH)?;
    Ok(LENGTH)
}
