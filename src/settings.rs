//! Synthesis settings and workstation configuration.

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::error::{ConfigError, SettingsError};
use crate::graph::GraphConfig;

pub const VOLUME_RANGE: (f64, f64) = (0.0, 1.0);
pub const ATTACK_RANGE: (f64, f64) = (0.01, 1.0);
pub const RELEASE_RANGE: (f64, f64) = (0.01, 3.0);
pub const CUTOFF_RANGE: (f64, f64) = (20.0, 20000.0);
pub const REVERB_MIX_RANGE: (f64, f64) = (0.0, 1.0);

/// Longest loop the recorder will capture, in seconds.
pub const MAX_RECORDING_SECS: f64 = 10.0;

/// User-facing synthesis parameters, shared by voice construction and the
/// master stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthesisSettings {
    pub volume: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Release time in seconds.
    pub release: f64,
    /// Master lowpass cutoff in Hz.
    pub filter_cutoff: f64,
    pub reverb_mix: f64,
    /// Waveform used in oscillator sound mode.
    pub oscillator_waveform: Waveform,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        SynthesisSettings {
            volume: 0.7,
            attack: 0.01,
            release: 1.5,
            filter_cutoff: 20000.0,
            reverb_mix: 0.2,
            oscillator_waveform: Waveform::Sine,
        }
    }
}

impl SynthesisSettings {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check("volume", self.volume, VOLUME_RANGE)?;
        check("attack", self.attack, ATTACK_RANGE)?;
        check("release", self.release, RELEASE_RANGE)?;
        check("filterCutoff", self.filter_cutoff, CUTOFF_RANGE)?;
        check("reverbMix", self.reverb_mix, REVERB_MIX_RANGE)?;
        Ok(())
    }

    /// A copy with every field pulled into range. Non-finite values fall
    /// back to the defaults.
    pub fn clamped(&self) -> Self {
        let defaults = SynthesisSettings::default();
        SynthesisSettings {
            volume: clamp(self.volume, VOLUME_RANGE, defaults.volume),
            attack: clamp(self.attack, ATTACK_RANGE, defaults.attack),
            release: clamp(self.release, RELEASE_RANGE, defaults.release),
            filter_cutoff: clamp(self.filter_cutoff, CUTOFF_RANGE, defaults.filter_cutoff),
            reverb_mix: clamp(self.reverb_mix, REVERB_MIX_RANGE, defaults.reverb_mix),
            oscillator_waveform: self.oscillator_waveform,
        }
    }
}

/// A partial settings change from the UI. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub volume: Option<f64>,
    pub attack: Option<f64>,
    pub release: Option<f64>,
    pub filter_cutoff: Option<f64>,
    pub reverb_mix: Option<f64>,
    pub oscillator_waveform: Option<Waveform>,
}

impl SettingsUpdate {
    /// `base` with every present field replaced.
    pub fn apply_to(&self, base: &SynthesisSettings) -> SynthesisSettings {
        SynthesisSettings {
            volume: self.volume.unwrap_or(base.volume),
            attack: self.attack.unwrap_or(base.attack),
            release: self.release.unwrap_or(base.release),
            filter_cutoff: self.filter_cutoff.unwrap_or(base.filter_cutoff),
            reverb_mix: self.reverb_mix.unwrap_or(base.reverb_mix),
            oscillator_waveform: self.oscillator_waveform.unwrap_or(base.oscillator_waveform),
        }
    }
}

fn check(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), SettingsError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn clamp(value: f64, (min, max): (f64, f64), fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Which melodic voice builder `note_on` uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundMode {
    #[default]
    Piano,
    Oscillator,
}

impl SoundMode {
    /// Parse a mode name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "piano" => Some(SoundMode::Piano),
            "oscillator" => Some(SoundMode::Oscillator),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SoundMode::Piano => "piano",
            SoundMode::Oscillator => "oscillator",
        }
    }
}

/// Everything needed to construct a [`crate::engine::Workstation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkstationConfig {
    pub sample_rate: f64,
    pub max_nodes: usize,
    pub max_active_sources: usize,
    pub noise_seed: u64,
    pub recording_ceiling_secs: f64,
    pub repeater_interval_ms: f64,
    pub sound_mode: SoundMode,
    pub settings: SynthesisSettings,
}

impl Default for WorkstationConfig {
    fn default() -> Self {
        let graph = GraphConfig::default();
        WorkstationConfig {
            sample_rate: graph.sample_rate,
            max_nodes: graph.max_nodes,
            max_active_sources: graph.max_active_sources,
            noise_seed: graph.noise_seed,
            recording_ceiling_secs: MAX_RECORDING_SECS,
            repeater_interval_ms: 200.0,
            sound_mode: SoundMode::Piano,
            settings: SynthesisSettings::default(),
        }
    }
}

impl WorkstationConfig {
    /// Parse a camelCase JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: WorkstationConfig = serde_json::from_str(json)?;
        config.validated()
    }

    /// Reject unusable values and pull soft limits into range.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if !(8000.0..=192000.0).contains(&self.sample_rate) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        self.settings.validate()?;
        self.recording_ceiling_secs = if self.recording_ceiling_secs.is_finite() {
            self.recording_ceiling_secs.clamp(0.1, MAX_RECORDING_SECS)
        } else {
            MAX_RECORDING_SECS
        };
        self.repeater_interval_ms = crate::repeater::clamp_interval(self.repeater_interval_ms);
        Ok(self)
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            sample_rate: self.sample_rate,
            max_nodes: self.max_nodes,
            max_active_sources: self.max_active_sources,
            noise_seed: self.noise_seed,
        }
    }
}
