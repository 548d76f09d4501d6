//! Biquad filter — matches WebAudio BiquadFilterNode coefficients.

use std::f64::consts::PI;

/// Filter type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
    Peaking,
}

/// A biquad IIR filter (2nd order).
///
/// Implements the standard Direct Form II Transposed structure.
/// Coefficient formulas from the Audio EQ Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    frequency: f64,
    q: f64,
    gain_db: f64, // only used for Peaking

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
    dirty: bool,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency: 1000.0,
            q: 0.707, // Butterworth
            gain_db: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
            dirty: true,
        };
        f.update_coefficients();
        f
    }

    /// Recompute filter coefficients from current parameters.
    pub fn update_coefficients(&mut self) {
        let nyquist = self.sample_rate / 2.0;
        let frequency = self.frequency.clamp(1.0, nyquist * 0.999);
        let q = self.q.max(1e-4);

        let w0 = 2.0 * PI * frequency / self.sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                let b0 = b1 / 2.0;
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                let b1 = -(1.0 + cos_w0);
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Bandpass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Peaking => {
                let a_lin = (10.0_f64).powf(self.gain_db / 40.0);
                (
                    1.0 + alpha * a_lin,
                    -2.0 * cos_w0,
                    1.0 - alpha * a_lin,
                    1.0 + alpha / a_lin,
                    -2.0 * cos_w0,
                    1.0 - alpha / a_lin,
                )
            }
        };

        // Normalize by a0
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
        self.dirty = false;
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        if self.dirty {
            self.update_coefficients();
        }

        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Update all automatable parameters; coefficients are only
    /// recomputed when something actually moved.
    pub fn set_params(&mut self, frequency: f64, q: f64, gain_db: f64) {
        if frequency != self.frequency || q != self.q || gain_db != self.gain_db {
            self.frequency = frequency;
            self.q = q;
            self.gain_db = gain_db;
            self.dirty = true;
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }
}
