use crate::dsp::filter::FilterType;
use crate::error::GraphError;
use crate::graph::{NodeId, Patch};

use super::{decaying_gain, play};

const BURSTS: usize = 3;
const BURST_LENGTH: f64 = 0.05;
const BURST_SPACING: f64 = 0.01;

/// Bandpass centre of burst `i`.
pub(crate) fn burst_center(i: usize) -> f64 {
    1200.0 + 200.0 * i as f64
}

/// Three staggered noise bursts, each in its own band, smeared together.
pub(super) fn clap(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    for i in 0..BURSTS {
        let at = now + BURST_SPACING * i as f64;
        let noise = p.noise(BURST_LENGTH, 1.0)?;
        let band = p.biquad(FilterType::Bandpass, burst_center(i), 1.0)?;
        let amp = decaying_gain(p, 0.8, at, BURST_LENGTH)?;

        p.connect(noise, band)?;
        p.connect(band, amp)?;
        p.connect(amp, destination)?;
        play(p, noise, at, BURST_LENGTH)?;
    }
    Ok(BURST_SPACING * (BURSTS - 1) as f64 + BURST_LENGTH)
}
