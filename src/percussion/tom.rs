use crate::dsp::oscillator::Waveform;
use crate::error::GraphError;
use crate::graph::{NodeId, Patch};

use super::{decaying_gain, play, sweep};

const LENGTH: f64 = 0.3;

/// Sine swept from 220 Hz down to 50 Hz.
pub(super) fn tom(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let osc = p.oscillator(Waveform::Sine, 220.0)?;
    sweep(p, osc, 220.0, 50.0, now, LENGTH)?;
    let amp = decaying_gain(p, 1.0, now, LENGTH)?;

    p.connect(osc, amp)?;
    p.connect(amp, destination)?;
    play(p, osc, now, LENGTH)?;
    Ok(LENGTH)
}
