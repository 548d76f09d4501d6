use crate::dsp::oscillator::Waveform;
use crate::error::GraphError;
use crate::graph::{NodeId, ParamKind, Patch};

use super::{decaying_gain, play, sweep};

const KICK_LENGTH: f64 = 0.5;
const KICK2_LENGTH: f64 = 0.3;

/// Sine dropping from 150 Hz to near zero, with a matching amplitude decay.
pub(super) fn kick(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let osc = p.oscillator(Waveform::Sine, 150.0)?;
    sweep(p, osc, 150.0, 0.01, now, KICK_LENGTH)?;
    let amp = decaying_gain(p, 1.0, now, KICK_LENGTH)?;

    p.connect(osc, amp)?;
    p.connect(amp, destination)?;
    play(p, osc, now, KICK_LENGTH)?;
    Ok(KICK_LENGTH)
}

/// Layered kick: a swept sine body and a short 60 Hz triangle thump, each
/// with its own envelope, both decayed again by the output stage.
pub(super) fn kick2(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let body = p.oscillator(Waveform::Sine, 80.0)?;
    sweep(p, body, 80.0, 40.0, now, 0.05)?;
    p.param(body, ParamKind::Frequency)?
        .exponential_ramp_to_value_at_time(0.01, now + KICK2_LENGTH)?;
    let body_amp = decaying_gain(p, 1.0, now, KICK2_LENGTH)?;

    let thump = p.oscillator(Waveform::Triangle, 60.0)?;
    let thump_amp = decaying_gain(p, 0.6, now, 0.15)?;

    let out = decaying_gain(p, 1.0, now, KICK2_LENGTH)?;

    p.connect(body, body_amp)?;
    p.connect(thump, thump_amp)?;
    p.connect(body_amp, out)?;
    p.connect(thump_amp, out)?;
    p.connect(out, destination)?;

    play(p, body, now, KICK2_LENGTH)?;
    play(p, thump, now, KICK2_LENGTH)?;
    Ok(KICK2_LENGTH)
}
