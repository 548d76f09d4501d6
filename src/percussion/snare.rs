use crate::dsp::compressor::CompressorConfig;
use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::error::GraphError;
use crate::graph::{NodeId, Patch};

use super::{decaying_gain, play};

const SNARE_LENGTH: f64 = 0.2;
const SNARE2_LENGTH: f64 = 0.25;

/// Compression applied to the punchier snare.
pub(crate) const SNARE2_COMPRESSION: CompressorConfig = CompressorConfig {
    threshold: -24.0,
    knee: 30.0,
    ratio: 12.0,
    attack: 0.003,
    release: 0.25,
};

/// Highpassed noise over a 180 Hz triangle body.
pub(super) fn snare(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let noise = p.noise(SNARE_LENGTH, 1.0)?;
    let highpass = p.biquad(FilterType::Highpass, 1000.0, 0.707)?;
    let noise_amp = decaying_gain(p, 0.8, now, SNARE_LENGTH)?;
    p.connect(noise, highpass)?;
    p.connect(highpass, noise_amp)?;
    p.connect(noise_amp, destination)?;

    let body = p.oscillator(Waveform::Triangle, 180.0)?;
    let body_amp = decaying_gain(p, 0.7, now, 0.1)?;
    p.connect(body, body_amp)?;
    p.connect(body_amp, destination)?;

    play(p, noise, now, SNARE_LENGTH)?;
    play(p, body, now, SNARE_LENGTH)?;
    Ok(SNARE_LENGTH)
}

/// Bandpassed noise and a 90 Hz saw body, squashed by a compressor.
pub(super) fn snare2(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let comp = p.compressor(SNARE2_COMPRESSION)?;
    p.connect(comp, destination)?;

    let noise = p.noise(SNARE2_LENGTH, 1.0)?;
    let band = p.biquad(FilterType::Bandpass, 3000.0, 0.7)?;
    let noise_amp = decaying_gain(p, 1.0, now, 0.15)?;
    p.connect(noise, band)?;
    p.connect(band, noise_amp)?;
    p.connect(noise_amp, comp)?;

    let body = p.oscillator(Waveform::Sawtooth, 90.0)?;
    let body_amp = decaying_gain(p, 0.5, now, 0.1)?;
    p.connect(body, body_amp)?;
    p.connect(body_amp, comp)?;

    play(p, noise, now, SNARE2_LENGTH)?;
    play(p, body, now, SNARE2_LENGTH)?;
    Ok(SNARE2_LENGTH)
}
