//! Compressor — dynamics processing for percussion transients.
//!
//! Feed-forward peak compressor with threshold, ratio, knee, attack and
//! release, following the WebAudio DynamicsCompressorNode parameter set.

/// Static compressor parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorConfig {
    /// Threshold in dB.
    pub threshold: f64,
    /// Knee width in dB (0 = hard knee).
    pub knee: f64,
    /// Compression ratio (e.g. 12.0 = 12:1).
    pub ratio: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Release time in seconds.
    pub release: f64,
}

impl Default for CompressorConfig {
    /// WebAudio defaults.
    fn default() -> Self {
        Self {
            threshold: -24.0,
            knee: 30.0,
            ratio: 12.0,
            attack: 0.003,
            release: 0.25,
        }
    }
}

/// A mono dynamics compressor.
#[derive(Debug, Clone)]
pub struct Compressor {
    config: CompressorConfig,
    attack_coef: f64,
    release_coef: f64,
    envelope: f64,
}

impl Compressor {
    pub fn new(sample_rate: f64, config: CompressorConfig) -> Self {
        let config = CompressorConfig {
            threshold: config.threshold.clamp(-100.0, 0.0),
            knee: config.knee.clamp(0.0, 40.0),
            ratio: config.ratio.clamp(1.0, 20.0),
            attack: config.attack.clamp(0.0001, 1.0),
            release: config.release.clamp(0.001, 1.0),
        };
        Self {
            attack_coef: (-1.0 / (config.attack * sample_rate)).exp(),
            release_coef: (-1.0 / (config.release * sample_rate)).exp(),
            config,
            envelope: 0.0,
        }
    }

    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Gain change in dB (≤ 0) for an input level in dB.
    #[inline]
    fn compute_gain(&self, input_db: f64) -> f64 {
        let CompressorConfig {
            threshold,
            knee,
            ratio,
            ..
        } = self.config;
        let slope = 1.0 - 1.0 / ratio;

        if knee <= 0.0 {
            if input_db <= threshold {
                0.0
            } else {
                (threshold - input_db) * slope
            }
        } else {
            let half_knee = knee / 2.0;
            let knee_start = threshold - half_knee;
            let knee_end = threshold + half_knee;

            if input_db <= knee_start {
                0.0
            } else if input_db >= knee_end {
                (threshold - input_db) * slope
            } else {
                // Quadratic interpolation through the knee
                let x = input_db - knee_start;
                -slope * x * x / (2.0 * knee)
            }
        }
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let level = input.abs();
        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        let gain_db = self.compute_gain(Self::linear_to_db(self.envelope));
        input * Self::db_to_linear(gain_db)
    }
}
