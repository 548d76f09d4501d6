//! Reverb — Schroeder/Freeverb-style algorithmic reverb for the master stage.
//!
//! Parallel damped comb filters followed by series allpass filters. The
//! graph is mono, so a single comb/allpass bank is used.

/// A comb filter delay line with damped feedback.
#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damp1: f32,
    damp2: f32,
    filterstore: f32,
}

impl CombFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            feedback: 0.84,
            damp1: 0.2,
            damp2: 0.8,
            filterstore: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filterstore = output * self.damp2 + self.filterstore * self.damp1;
        self.buffer[self.index] = input + self.filterstore * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn tune(&mut self, feedback: f32, damp: f32) {
        self.feedback = feedback;
        self.damp1 = damp;
        self.damp2 = 1.0 - damp;
    }
}

#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    const FEEDBACK: f32 = 0.5;

    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let bufout = self.buffer[self.index];
        self.buffer[self.index] = input + bufout * Self::FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        bufout - input
    }
}

// Tuning constants (scaled for 44100 Hz sample rate)
const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const INPUT_GAIN: f32 = 0.015;
const ROOM_SIZE: f32 = 0.5;
const DAMPING: f32 = 0.5;

/// A mono algorithmic reverb.
#[derive(Debug, Clone)]
pub struct Reverb {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl Reverb {
    pub fn new(sample_rate: f64) -> Self {
        let scale = sample_rate / 44100.0;
        let scaled = |t: usize| ((t as f64) * scale) as usize;

        let feedback = ROOM_SIZE * 0.28 + 0.7;
        let combs = COMB_TUNING
            .iter()
            .map(|&t| {
                let mut comb = CombFilter::new(scaled(t));
                comb.tune(feedback, DAMPING);
                comb
            })
            .collect();

        Self {
            combs,
            allpasses: ALLPASS_TUNING
                .iter()
                .map(|&t| AllpassFilter::new(scaled(t)))
                .collect(),
        }
    }

    /// Process one sample, blending `mix` (0 = dry, 1 = wet).
    #[inline]
    pub fn process(&mut self, input: f64, mix: f64) -> f64 {
        let dry = input as f32;
        let feed = dry * INPUT_GAIN;

        let mut wet: f32 = self.combs.iter_mut().map(|c| c.process(feed)).sum();
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }

        let mix = mix.clamp(0.0, 1.0) as f32;
        (dry * (1.0 - mix) + wet * mix) as f64
    }
}
