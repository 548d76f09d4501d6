use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::error::GraphError;
use crate::graph::{NodeId, Patch};

use super::{decaying_gain, play};

const LENGTH: f64 = 0.4;

/// 900 Hz sine plus 1200 Hz square, with a resonant 1 kHz band tapped in
/// parallel to the dry sum.
pub(super) fn cowbell(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let low = p.oscillator(Waveform::Sine, 900.0)?;
    let high = p.oscillator(Waveform::Square, 1200.0)?;
    let amp = decaying_gain(p, 0.3, now, LENGTH)?;
    let ring = p.biquad(FilterType::Bandpass, 1000.0, 5.0)?;

    p.connect(low, amp)?;
    p.connect(high, amp)?;
    p.connect(amp, destination)?;
    p.connect(amp, ring)?;
    p.connect(ring, destination)?;
    play(p, low, now, LENGTH)?;
    play(p, high, now, LENGTH)?;
    Ok(LENGTH)
}
