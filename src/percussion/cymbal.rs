use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::error::GraphError;
use crate::graph::{NodeId, ParamKind, Patch};

use super::{decaying_gain, play};

/// Inharmonic partial ratios; the mismatch is what reads as metal.
pub(crate) const CYMBAL_RATIOS: [f64; 5] = [1.0, 1.34, 1.71, 2.08, 2.76];
const CYMBAL_BASE: f64 = 300.0;
const CYMBAL_LENGTH: f64 = 0.3;

const HIHAT_LENGTH: f64 = 0.4;

pub(super) fn cymbal(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let level = 0.3 / CYMBAL_RATIOS.len() as f64;
    for ratio in CYMBAL_RATIOS {
        let osc = p.oscillator(Waveform::Square, CYMBAL_BASE * ratio)?;
        let amp = decaying_gain(p, level, now, CYMBAL_LENGTH)?;
        p.connect(osc, amp)?;
        p.connect(amp, destination)?;
        play(p, osc, now, CYMBAL_LENGTH)?;
    }
    Ok(CYMBAL_LENGTH)
}

/// Noise through a 6 kHz highpass and a +10 dB presence peak at 8 kHz.
pub(super) fn open_hihat(
    p: &mut Patch<'_>,
    destination: NodeId,
    now: f64,
) -> Result<f64, GraphError> {
    let noise = p.noise(HIHAT_LENGTH, 1.0)?;
    let highpass = p.biquad(FilterType::Highpass, 6000.0, 0.707)?;
    let peak = p.biquad(FilterType::Peaking, 8000.0, 2.0)?;
    p.param(peak, ParamKind::Gain)?.set_value_immediately(10.0);
    let amp = decaying_gain(p, 0.3, now, HIHAT_LENGTH)?;

    p.connect(noise, highpass)?;
    p.connect(highpass, peak)?;
    p.connect(peak, amp)?;
    p.connect(amp, destination)?;
    play(p, noise, now, HIHAT_LENGTH)?;
    Ok(HIHAT_LENGTH)
}
