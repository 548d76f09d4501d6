//! Anti-aliased oscillators using PolyBLEP.
//!
//! The frequency is supplied per sample so that automation and audio-rate
//! modulation (pitch sweeps, LFO vibrato) are applied without a separate
//! control path.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Parse a waveform name, ignoring case and accepting "saw" as shorthand.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Some(Waveform::Sine),
            "square" => Some(Waveform::Square),
            "sawtooth" | "saw" => Some(Waveform::Sawtooth),
            "triangle" => Some(Waveform::Triangle),
            _ => None,
        }
    }
}

/// A band-limited oscillator with anti-aliasing (PolyBLEP).
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Generate the next sample at `frequency` Hz.
    ///
    /// Negative frequencies (deep FM) run the phase backwards.
    pub fn next_sample(&mut self, frequency: f64) -> f64 {
        let inc = frequency / self.sample_rate;
        let dt = inc.abs().min(0.5);
        let sample = match self.waveform {
            Waveform::Sine => self.sine(),
            Waveform::Sawtooth => self.sawtooth(dt),
            Waveform::Square => self.square(dt),
            Waveform::Triangle => self.triangle(),
        };

        self.phase = (self.phase + inc).rem_euclid(1.0);
        sample
    }

    fn sine(&self) -> f64 {
        (2.0 * PI * self.phase).sin()
    }

    /// Naive sawtooth: rises from -1 to +1, then drops.
    /// PolyBLEP corrects the discontinuity at the wrap.
    fn sawtooth(&self, dt: f64) -> f64 {
        let naive = 2.0 * self.phase - 1.0;
        naive - poly_blep(self.phase, dt)
    }

    fn square(&self, dt: f64) -> f64 {
        let mut value = if self.phase < 0.5 { 1.0 } else { -1.0 };
        value += poly_blep(self.phase, dt);
        value -= poly_blep((self.phase + 0.5) % 1.0, dt);
        value
    }

    /// Piecewise linear: -1→+1 in [0, 0.5], +1→-1 in [0.5, 1].
    fn triangle(&self) -> f64 {
        if self.phase < 0.5 {
            4.0 * self.phase - 1.0
        } else {
            3.0 - 4.0 * self.phase
        }
    }
}

/// PolyBLEP (Polynomial Band-Limited Step) anti-aliasing correction.
///
/// `t` is the phase [0, 1), `dt` is the phase increment per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}
