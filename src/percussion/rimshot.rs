use crate::dsp::oscillator::Waveform;
use crate::error::GraphError;
use crate::graph::{NodeId, Patch};

use super::{decaying_gain, play, sweep};

const LENGTH: f64 = 0.08;

/// A sine dropping 500 Hz to 200 Hz over 50 ms over a static 800 Hz triangle.
pub(super) fn rimshot(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let knock = p.oscillator(Waveform::Sine, 500.0)?;
    sweep(p, knock, 500.0, 200.0, now, 0.05)?;
    let click = p.oscillator(Waveform::Triangle, 800.0)?;
    let amp = decaying_gain(p, 0.6, now, LENGTH)?;

    p.connect(knock, amp)?;
    p.connect(click, amp)?;
    p.connect(amp, destination)?;
    play(p, knock, now, LENGTH)?;
    play(p, click, now, LENGTH)?;
    Ok(LENGTH)
}
