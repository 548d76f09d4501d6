//! Workstation — the facade the UI talks to.
//!
//! Owns the graph, the master stage (volume → lowpass → reverb), the voice
//! registry, the repeater, the loop recorder and a timer queue for deferred
//! work. Everything runs on the audio clock: control calls take effect at
//! the next rendered sample, and `render` splits each block at the next
//! deadline so teardowns, repeater ticks and the recording ceiling land on
//! exact sample boundaries.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info};

use crate::dsp::filter::FilterType;
use crate::error::{LoopError, WorkstationError};
use crate::graph::{AudioGraph, NodeId, ParamKind};
use crate::looper::{LoopRecorder, LoopState};
use crate::percussion::{self, PercussionHit, PercussionKind};
use crate::repeater::{Repeater, RepeaterPhase};
use crate::dsp::oscillator::Waveform;
use crate::settings::{SettingsUpdate, SoundMode, SynthesisSettings, WorkstationConfig};
use crate::synth::release::TEARDOWN_GUARD;
use crate::synth::{TeardownPlan, VoiceId, VoiceRegistry};
use crate::timer::TimerQueue;

/// How long a UI pulse stays lit.
pub const PULSE_SECS: f64 = 0.15;

/// Undrained UI events kept; older ones are dropped first.
pub const MAX_UI_EVENTS: usize = 256;

/// Signals for the UI layer, drained with [`Workstation::drain_ui_events`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiEvent {
    NotePulse { note: String, active: bool },
    PadPulse { pad: PercussionKind, active: bool },
    /// The recording ended, by request or at the ceiling. `duration` is
    /// `None` when nothing usable was captured.
    RecordingStopped { duration: Option<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkstationStatus {
    pub time: f64,
    pub sound_mode: SoundMode,
    pub active_notes: Vec<String>,
    pub repeater_active: bool,
    pub repeater_phase: RepeaterPhase,
    pub repeater_interval_ms: f64,
    pub last_percussion: Option<PercussionKind>,
    pub loop_state: LoopState,
    pub loop_playing: bool,
    pub loop_duration: Option<f64>,
    pub recording_elapsed: Option<f64>,
    pub pending_teardowns: usize,
    pub node_count: usize,
    pub active_sources: usize,
}

/// Node ids of the shared output stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterStage {
    /// Voices, hits and loop playback connect here; its gain is the volume.
    pub input: NodeId,
    pub filter: NodeId,
    pub reverb: NodeId,
}

#[derive(Debug)]
enum Task {
    Teardown(TeardownPlan),
    Collect(PercussionKind, Vec<NodeId>),
    PulseEnd(UiEvent),
}

pub struct Workstation {
    graph: AudioGraph,
    master: MasterStage,
    settings: SynthesisSettings,
    mode: SoundMode,
    registry: VoiceRegistry,
    repeater: Repeater,
    looper: LoopRecorder,
    timers: TimerQueue<Task>,
    ui_events: VecDeque<UiEvent>,
}

impl Workstation {
    pub fn new(config: WorkstationConfig) -> Result<Self, WorkstationError> {
        let config = config.validated()?;
        let mut graph = AudioGraph::new(config.graph_config());
        let settings = config.settings.clone();

        let input = graph.create_gain(settings.volume)?;
        let filter = graph.create_biquad(FilterType::Lowpass, settings.filter_cutoff, 0.707)?;
        let reverb = graph.create_reverb(settings.reverb_mix)?;
        let destination = graph.destination();
        graph.connect(input, filter)?;
        graph.connect(filter, reverb)?;
        graph.connect(reverb, destination)?;

        let looper = LoopRecorder::new(
            config.sample_rate.round() as u32,
            config.recording_ceiling_secs,
        );

        info!(
            "Workstation ready at {} Hz ({} mode)",
            config.sample_rate,
            config.sound_mode.name()
        );
        Ok(Workstation {
            graph,
            master: MasterStage {
                input,
                filter,
                reverb,
            },
            settings,
            mode: config.sound_mode,
            registry: VoiceRegistry::new(),
            repeater: Repeater::new(config.repeater_interval_ms),
            looper,
            timers: TimerQueue::new(),
            ui_events: VecDeque::new(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, WorkstationError> {
        Self::new(WorkstationConfig::from_json(json)?)
    }

    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    pub fn master(&self) -> MasterStage {
        self.master
    }

    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    pub fn sound_mode(&self) -> SoundMode {
        self.mode
    }

    pub fn registry(&self) -> &VoiceRegistry {
        &self.registry
    }

    pub fn repeater(&self) -> &Repeater {
        &self.repeater
    }

    pub fn looper(&self) -> &LoopRecorder {
        &self.looper
    }

    pub fn current_time(&self) -> f64 {
        self.graph.current_time()
    }

    // ── Melodic voices ──────────────────────────────────────────

    /// Start a note. A note already sounding under `note_id` is released
    /// early with a short ramp rather than the configured release.
    pub fn note_on(&mut self, note_id: &str, frequency: f64) -> Result<VoiceId, WorkstationError> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(WorkstationError::InvalidFrequency(frequency));
        }
        let result = self.registry.note_on(
            &mut self.graph,
            self.master.input,
            note_id,
            frequency,
            &self.settings,
            self.mode,
        );
        self.schedule_released();
        let id = result?;
        self.pulse(UiEvent::NotePulse {
            note: note_id.to_string(),
            active: true,
        });
        Ok(id)
    }

    /// Release a note. Returns `false` if it was not sounding.
    pub fn note_off(&mut self, note_id: &str) -> bool {
        let released = self
            .registry
            .note_off(&mut self.graph, note_id, self.settings.release);
        self.schedule_released();
        released
    }

    /// Release every melodic voice. Percussion and loop playback keep running.
    pub fn stop_all(&mut self) -> usize {
        let count = self.registry.stop_all(&mut self.graph, self.settings.release);
        self.schedule_released();
        count
    }

    /// Silence every melodic voice at once.
    pub fn emergency_stop(&mut self) -> usize {
        let count = self.registry.emergency_stop(&mut self.graph);
        self.schedule_released();
        info!("Emergency stop silenced {} voices", count);
        count
    }

    fn schedule_released(&mut self) {
        for plan in self.registry.take_released() {
            self.timers.schedule(plan.due, Task::Teardown(plan));
        }
    }

    // ── Percussion ──────────────────────────────────────────────

    /// Play a pad. The repeater remembers the sound even if the hit fails.
    pub fn play_percussion(&mut self, kind: PercussionKind) -> bool {
        self.repeater.note_played(kind);
        self.fire_percussion(kind).is_some()
    }

    pub fn play_percussion_named(&mut self, name: &str) -> Result<bool, WorkstationError> {
        Ok(self.play_percussion(name.parse()?))
    }

    fn fire_percussion(&mut self, kind: PercussionKind) -> Option<PercussionHit> {
        self.pulse(UiEvent::PadPulse {
            pad: kind,
            active: true,
        });
        let hit = percussion::fire(kind, &mut self.graph, self.master.input)?;
        self.timers.schedule(
            hit.ends_at() + TEARDOWN_GUARD,
            Task::Collect(kind, hit.nodes.clone()),
        );
        Some(hit)
    }

    // ── Settings ────────────────────────────────────────────────

    /// Apply new settings. Values are clamped into range; the master stage
    /// follows immediately so sustaining notes hear the change.
    pub fn update_settings(&mut self, settings: SynthesisSettings) -> &SynthesisSettings {
        self.settings = settings.clamped();
        let master = self.master;
        let live = [
            (master.input, ParamKind::Gain, self.settings.volume),
            (master.filter, ParamKind::Frequency, self.settings.filter_cutoff),
            (master.reverb, ParamKind::Mix, self.settings.reverb_mix),
        ];
        for (node, param, value) in live {
            if let Ok(param) = self.graph.param_mut(node, param) {
                param.set_value_immediately(value);
            }
        }
        &self.settings
    }

    /// Merge a partial change onto the current settings and apply it.
    pub fn apply_settings_update(&mut self, update: &SettingsUpdate) -> &SynthesisSettings {
        let merged = update.apply_to(&self.settings);
        self.update_settings(merged)
    }

    /// Waveform for voices started in oscillator mode from now on.
    pub fn set_oscillator_waveform_named(&mut self, name: &str) -> Result<(), WorkstationError> {
        let waveform =
            Waveform::parse(name).ok_or_else(|| WorkstationError::UnknownWaveform(name.to_string()))?;
        self.settings.oscillator_waveform = waveform;
        Ok(())
    }

    /// Switch sound mode; sounding voices are released on a change.
    pub fn set_sound_mode(&mut self, mode: SoundMode) {
        if mode != self.mode {
            self.stop_all();
            self.mode = mode;
            debug!("Sound mode set to {}", mode.name());
        }
    }

    pub fn set_sound_mode_named(&mut self, name: &str) -> Result<(), WorkstationError> {
        let mode =
            SoundMode::parse(name).ok_or_else(|| WorkstationError::UnknownSoundMode(name.to_string()))?;
        self.set_sound_mode(mode);
        Ok(())
    }

    // ── Repeater ────────────────────────────────────────────────

    /// Toggle the repeat loop; returns whether it is now running.
    pub fn toggle_repeater(&mut self) -> bool {
        let now = self.graph.current_time();
        self.repeater.toggle(now) == RepeaterPhase::Repeating
    }

    pub fn set_repeater_interval(&mut self, ms: f64) {
        let now = self.graph.current_time();
        self.repeater.set_interval(ms, now);
    }

    // ── Loop ────────────────────────────────────────────────────

    pub fn start_recording(&mut self) -> Result<(), WorkstationError> {
        Ok(self.looper.start_recording(&mut self.graph)?)
    }

    /// Stop recording; returns the loop duration in seconds.
    pub fn stop_recording(&mut self) -> Result<f64, WorkstationError> {
        let result = self.looper.stop_recording();
        if !matches!(result, Err(LoopError::NotRecording)) {
            self.push_event(UiEvent::RecordingStopped {
                duration: result.as_ref().ok().copied(),
            });
        }
        Ok(result?)
    }

    pub fn play_loop(&mut self) -> Result<(), WorkstationError> {
        Ok(self.looper.play(&mut self.graph, self.master.input)?)
    }

    pub fn stop_loop(&mut self) -> bool {
        self.looper.stop(&mut self.graph)
    }

    /// Replace the loop buffer with a decoded WAV file.
    pub fn import_loop(&mut self, bytes: &[u8]) -> Result<f64, WorkstationError> {
        Ok(self.looper.import(&mut self.graph, bytes)?)
    }

    // ── UI ──────────────────────────────────────────────────────

    /// Events since the last drain, oldest first. The host should drain
    /// after each `render`; at most [`MAX_UI_EVENTS`] are held.
    pub fn drain_ui_events(&mut self) -> Vec<UiEvent> {
        self.ui_events.drain(..).collect()
    }

    fn push_event(&mut self, event: UiEvent) {
        if self.ui_events.len() == MAX_UI_EVENTS {
            self.ui_events.pop_front();
        }
        self.ui_events.push_back(event);
    }

    pub fn pending_teardowns(&self) -> usize {
        self.timers
            .pending()
            .filter(|t| matches!(t, Task::Teardown(_)))
            .count()
    }

    pub fn status(&self) -> WorkstationStatus {
        WorkstationStatus {
            time: self.graph.current_time(),
            sound_mode: self.mode,
            active_notes: self.registry.active_notes(),
            repeater_active: self.repeater.is_active(),
            repeater_phase: self.repeater.phase(),
            repeater_interval_ms: self.repeater.interval_ms(),
            last_percussion: self.repeater.last_kind(),
            loop_state: self.looper.state(),
            loop_playing: self.looper.is_playing(),
            loop_duration: self.looper.buffer().map(|b| b.duration()),
            recording_elapsed: self.looper.recording_elapsed(),
            pending_teardowns: self.pending_teardowns(),
            node_count: self.graph.node_count(),
            active_sources: self.graph.active_sources(),
        }
    }

    /// Push the "on" half of a pulse now and queue the "off" half.
    fn pulse(&mut self, on: UiEvent) {
        let off = match &on {
            UiEvent::NotePulse { note, .. } => UiEvent::NotePulse {
                note: note.clone(),
                active: false,
            },
            UiEvent::PadPulse { pad, .. } => UiEvent::PadPulse {
                pad: *pad,
                active: false,
            },
            UiEvent::RecordingStopped { .. } => return,
        };
        self.push_event(on);
        let due = self.graph.current_time() + PULSE_SECS;
        self.timers.schedule(due, Task::PulseEnd(off));
    }

    // ── Rendering ───────────────────────────────────────────────

    /// Render the next mono block of master output. UI events raised while
    /// rendering queue up until [`Workstation::drain_ui_events`].
    pub fn render(&mut self, out: &mut [f32]) {
        let mut offset = 0;
        while offset < out.len() {
            self.run_due();
            let remaining = out.len() - offset;
            let frames = self
                .frames_to_next_deadline()
                .map_or(remaining, |n| n.clamp(1, remaining));

            let block = &mut out[offset..offset + frames];
            self.graph.render(block);
            if self.looper.capture(block) {
                info!("Recording reached its ceiling");
                // The outcome is reported through the UI event either way.
                let _ = self.stop_recording();
            }
            offset += frames;
        }
        self.run_due();
    }

    /// Frame index at which a deadline at `t` seconds fires: the first
    /// frame within half a sample of it.
    fn deadline_frame(&self, t: f64) -> u64 {
        (t * self.graph.sample_rate() - 0.5).ceil().max(0.0) as u64
    }

    fn frames_to_next_deadline(&self) -> Option<usize> {
        let frame = self.graph.current_frame();
        let timer = self.timers.next_due();
        let tick = self.repeater.deadline();
        let by_time = [timer, tick]
            .into_iter()
            .flatten()
            .map(|t| self.deadline_frame(t).saturating_sub(frame) as usize)
            .min();
        [by_time, self.looper.remaining_frames()]
            .into_iter()
            .flatten()
            .min()
    }

    fn run_due(&mut self) {
        let now = self.graph.current_time();
        let horizon = now + 0.5 / self.graph.sample_rate();

        while let Some((_, task)) = self.timers.pop_due(horizon) {
            match task {
                Task::Teardown(plan) => {
                    plan.execute(&mut self.graph);
                }
                Task::Collect(kind, nodes) => {
                    let freed = self.graph.remove_all(&nodes);
                    debug!("Collected {} hit: {} nodes", kind, freed);
                }
                Task::PulseEnd(event) => self.push_event(event),
            }
        }
        while let Some(kind) = self.repeater.poll(horizon) {
            self.fire_percussion(kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AutomationEvent;
    use crate::synth::release::GAIN_FLOOR;

    const SR: f64 = 8000.0;

    fn workstation() -> Workstation {
        Workstation::new(WorkstationConfig {
            sample_rate: SR,
            ..WorkstationConfig::default()
        })
        .unwrap()
    }

    fn run(ws: &mut Workstation, seconds: f64) -> Vec<f32> {
        let mut out = vec![0.0; (seconds * SR).round() as usize];
        for block in out.chunks_mut(128) {
            ws.render(block);
        }
        out
    }

    fn baseline_nodes() -> usize {
        // destination + master input, filter, reverb
        4
    }

    #[test]
    fn c4_scenario_builds_releases_and_tears_down() {
        let mut ws = workstation();
        ws.update_settings(SynthesisSettings {
            attack: 0.01,
            release: 1.5,
            volume: 0.8,
            ..SynthesisSettings::default()
        });

        ws.note_on("C4", 261.63).unwrap();
        let voice = ws.registry().get("C4").unwrap().clone();
        assert_eq!(voice.components.len(), 5);
        assert!(voice.noise.is_some());

        let gain = ws.graph().param(voice.output, ParamKind::Gain).unwrap();
        assert!((gain.value_at(0.01) - 0.8).abs() < 1e-12);
        assert!((gain.value_at(0.11) - 0.56).abs() < 1e-9);

        run(&mut ws, 0.5);
        let released_at = ws.current_time();
        assert!(ws.note_off("C4"));
        assert!(ws.registry().is_empty());

        let gain = ws.graph().param(voice.output, ParamKind::Gain).unwrap();
        match gain.events().last() {
            Some(AutomationEvent::ExponentialRamp { time, value }) => {
                assert!((time - (released_at + 1.5)).abs() < 1e-9);
                assert_eq!(*value, GAIN_FLOOR);
            }
            other => panic!("expected exponential release, got {other:?}"),
        }
        let stop = ws
            .graph()
            .source_schedule(voice.components[0].oscillator)
            .unwrap()
            .stop
            .unwrap();
        assert!((stop - (released_at + 1.6)).abs() < 1e-9);
        assert_eq!(ws.pending_teardowns(), 1);

        run(&mut ws, 1.69);
        assert!(ws.graph().contains(voice.output));
        run(&mut ws, 0.02);
        assert!(!ws.graph().contains(voice.output));
        assert_eq!(ws.pending_teardowns(), 0);
        assert_eq!(ws.graph().node_count(), baseline_nodes());
    }

    #[test]
    fn release_never_exceeds_the_ceiling() {
        let mut ws = workstation();
        ws.update_settings(SynthesisSettings {
            release: 3.0,
            ..SynthesisSettings::default()
        });
        ws.note_on("A2", 110.0).unwrap();
        run(&mut ws, 0.2);
        let voice = ws.registry().get("A2").unwrap().clone();
        let released_at = ws.current_time();
        ws.note_off("A2");

        let gain = ws.graph().param(voice.output, ParamKind::Gain).unwrap();
        let last = gain.events().last().unwrap().time();
        assert!(last - released_at <= 3.0 + 1e-9);

        run(&mut ws, 3.3);
        assert_eq!(ws.graph().node_count(), baseline_nodes());
    }

    #[test]
    fn double_note_on_keeps_a_single_voice() {
        let mut ws = workstation();
        let first = ws.note_on("C4", 261.63).unwrap();
        let second = ws.note_on("C4", 261.63).unwrap();
        assert_ne!(first, second);
        assert_eq!(ws.registry().len(), 1);
        assert_eq!(ws.pending_teardowns(), 1);
    }

    #[test]
    fn teardown_after_retrigger_spares_the_new_voice() {
        let mut ws = workstation();
        ws.note_on("E4", 329.63).unwrap();
        ws.note_off("E4");
        ws.note_on("E4", 329.63).unwrap();
        let survivor = ws.registry().get("E4").unwrap().clone();

        run(&mut ws, 2.0);
        assert!(survivor.nodes().iter().all(|&id| ws.graph().contains(id)));
        assert_eq!(ws.registry().active_notes(), vec!["E4"]);
        assert_eq!(
            ws.graph().node_count(),
            baseline_nodes() + survivor.nodes().len()
        );
    }

    #[test]
    fn volume_change_reaches_the_master_immediately() {
        let mut ws = workstation();
        ws.note_on("G4", 392.0).unwrap();
        run(&mut ws, 0.3);

        let current = ws.settings().clone();
        ws.update_settings(SynthesisSettings {
            volume: 0.2,
            filter_cutoff: 500.0,
            ..current
        });
        let master = ws.master();
        let gain = ws.graph().param(master.input, ParamKind::Gain).unwrap();
        assert_eq!(gain.value(), 0.2);
        assert_eq!(gain.value_at(ws.current_time()), 0.2);
        let cutoff = ws.graph().param(master.filter, ParamKind::Frequency).unwrap();
        assert_eq!(cutoff.value(), 500.0);
        assert_eq!(ws.registry().len(), 1);
    }

    #[test]
    fn settings_are_clamped_on_update() {
        let mut ws = workstation();
        let applied = ws.update_settings(SynthesisSettings {
            release: 9.0,
            volume: -1.0,
            ..SynthesisSettings::default()
        });
        assert_eq!(applied.release, 3.0);
        assert_eq!(applied.volume, 0.0);
    }

    #[test]
    fn partial_update_keeps_other_settings() {
        let mut ws = workstation();
        ws.update_settings(SynthesisSettings {
            attack: 0.5,
            release: 3.0,
            reverb_mix: 0.9,
            ..SynthesisSettings::default()
        });
        let update: SettingsUpdate = serde_json::from_str(r#"{ "volume": 0.3 }"#).unwrap();
        let applied = ws.apply_settings_update(&update).clone();
        assert_eq!(applied.volume, 0.3);
        assert_eq!(applied.release, 3.0);
        assert_eq!(applied.attack, 0.5);
        assert_eq!(applied.reverb_mix, 0.9);

        let master = ws.master();
        let gain = ws.graph().param(master.input, ParamKind::Gain).unwrap();
        assert_eq!(gain.value(), 0.3);
    }

    #[test]
    fn oscillator_waveform_applies_to_new_voices() {
        let mut ws = workstation();
        ws.set_sound_mode(SoundMode::Oscillator);
        ws.set_oscillator_waveform_named("Saw").unwrap();
        assert_eq!(ws.settings().oscillator_waveform, Waveform::Sawtooth);

        ws.note_on("A3", 220.0).unwrap();
        let voice = ws.registry().get("A3").unwrap();
        assert_eq!(voice.components[0].waveform, Waveform::Sawtooth);
        assert!(matches!(
            ws.set_oscillator_waveform_named("noise"),
            Err(WorkstationError::UnknownWaveform(_))
        ));
    }

    #[test]
    fn undrained_events_are_capped() {
        let mut ws = workstation();
        ws.set_repeater_interval(50.0);
        ws.play_percussion(PercussionKind::Rimshot);
        ws.toggle_repeater();

        run(&mut ws, 10.0);
        let events = ws.drain_ui_events();
        assert_eq!(events.len(), MAX_UI_EVENTS);
        assert!(ws.drain_ui_events().is_empty());
    }

    #[test]
    fn stop_all_leaves_loop_playback_running() {
        let mut ws = workstation();
        ws.start_recording().unwrap();
        ws.play_percussion(PercussionKind::Kick);
        run(&mut ws, 0.5);
        ws.stop_recording().unwrap();
        ws.play_loop().unwrap();

        for (note, hz) in [("C4", 261.63), ("E4", 329.63), ("G4", 392.0)] {
            ws.note_on(note, hz).unwrap();
        }
        assert_eq!(ws.stop_all(), 3);
        assert!(ws.registry().is_empty());
        assert_eq!(ws.pending_teardowns(), 3);
        assert!(ws.status().loop_playing);

        run(&mut ws, 2.0);
        assert_eq!(ws.looper().state(), LoopState::Playing);
    }

    #[test]
    fn recording_stops_itself_at_exactly_ten_seconds() {
        let mut ws = workstation();
        ws.start_recording().unwrap();
        ws.drain_ui_events();

        let mut out = vec![0.0; 1000];
        for _ in 0..85 {
            ws.render(&mut out);
        }
        assert_eq!(ws.looper().state(), LoopState::Ready);
        let buffer = ws.looper().buffer().unwrap();
        assert_eq!(buffer.len(), (10.0 * SR) as usize);
        assert_eq!(
            ws.drain_ui_events(),
            vec![UiEvent::RecordingStopped {
                duration: Some(10.0)
            }]
        );
    }

    #[test]
    fn stop_recording_twice_is_an_error() {
        let mut ws = workstation();
        ws.start_recording().unwrap();
        run(&mut ws, 0.1);
        assert!(ws.stop_recording().is_ok());
        assert!(matches!(
            ws.stop_recording(),
            Err(WorkstationError::Loop(LoopError::NotRecording))
        ));
    }

    #[test]
    fn repeater_needs_a_sound_first() {
        let mut ws = workstation();
        assert!(!ws.toggle_repeater());
        assert_eq!(ws.status().repeater_phase, RepeaterPhase::Idle);
    }

    #[test]
    fn repeater_ticks_on_its_interval() {
        let mut ws = workstation();
        ws.set_repeater_interval(250.0);
        ws.play_percussion(PercussionKind::Cowbell);
        assert!(ws.toggle_repeater());

        let mut out = vec![0.0; SR as usize];
        ws.render(&mut out);
        let hits = ws
            .drain_ui_events()
            .into_iter()
            .filter(|e| matches!(e, UiEvent::PadPulse { active: true, .. }))
            .count();
        assert_eq!(hits, 5);

        assert!(!ws.toggle_repeater());
        run(&mut ws, 1.0);
        let later = ws
            .drain_ui_events()
            .into_iter()
            .filter(|e| matches!(e, UiEvent::PadPulse { active: true, .. }))
            .count();
        assert_eq!(later, 0);
    }

    #[test]
    fn repeater_follows_the_latest_pad() {
        let mut ws = workstation();
        ws.set_repeater_interval(100.0);
        ws.play_percussion(PercussionKind::Kick);
        ws.toggle_repeater();
        ws.play_percussion(PercussionKind::Clap);
        ws.drain_ui_events();

        run(&mut ws, 0.1);
        let pads: Vec<PercussionKind> = ws
            .drain_ui_events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::PadPulse { pad, active: true } => Some(pad),
                _ => None,
            })
            .collect();
        assert_eq!(pads, vec![PercussionKind::Clap]);
    }

    #[test]
    fn kick2_double_trigger_collects_both_hits() {
        let mut ws = workstation();
        assert!(ws.play_percussion(PercussionKind::Kick2));
        run(&mut ws, 0.01);
        assert!(ws.play_percussion(PercussionKind::Kick2));
        assert_eq!(ws.graph().active_sources(), 4);

        run(&mut ws, 0.32);
        assert_eq!(ws.graph().active_sources(), 0);
        run(&mut ws, 0.25);
        assert_eq!(ws.graph().node_count(), baseline_nodes());
    }

    #[test]
    fn pulses_switch_off_after_150ms() {
        let mut ws = workstation();
        ws.note_on("A4", 440.0).unwrap();
        assert_eq!(
            ws.drain_ui_events(),
            vec![UiEvent::NotePulse {
                note: "A4".into(),
                active: true
            }]
        );
        run(&mut ws, 0.14);
        assert!(ws.drain_ui_events().is_empty());
        run(&mut ws, 0.02);
        assert_eq!(
            ws.drain_ui_events(),
            vec![UiEvent::NotePulse {
                note: "A4".into(),
                active: false
            }]
        );
    }

    #[test]
    fn changing_sound_mode_releases_voices() {
        let mut ws = workstation();
        ws.note_on("C4", 261.63).unwrap();
        ws.set_sound_mode_named("oscillator").unwrap();
        assert!(ws.registry().is_empty());
        assert_eq!(ws.sound_mode(), SoundMode::Oscillator);

        ws.note_on("C4", 261.63).unwrap();
        assert_eq!(ws.registry().get("C4").unwrap().components.len(), 1);
        assert!(matches!(
            ws.set_sound_mode_named("harpsichord"),
            Err(WorkstationError::UnknownSoundMode(_))
        ));
    }

    #[test]
    fn emergency_stop_silences_output() {
        let mut ws = workstation();
        for (note, hz) in [("C4", 261.63), ("E4", 329.63)] {
            ws.note_on(note, hz).unwrap();
        }
        run(&mut ws, 0.3);
        assert_eq!(ws.emergency_stop(), 2);
        let current = ws.settings().clone();
        ws.update_settings(SynthesisSettings {
            reverb_mix: 0.0,
            filter_cutoff: 1000.0,
            ..current
        });

        let out = run(&mut ws, 0.05);
        assert!(out[80..].iter().all(|s| s.abs() < 1e-3));
        assert_eq!(ws.emergency_stop(), 0);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let mut ws = workstation();
        assert!(matches!(
            ws.note_on("X", f64::NAN),
            Err(WorkstationError::InvalidFrequency(_))
        ));
        assert!(matches!(
            ws.play_percussion_named("gong"),
            Err(WorkstationError::UnknownPercussion(_))
        ));
        assert!(!ws.note_off("never-played"));
        assert!(!ws.stop_loop());
        assert!(matches!(
            ws.play_loop(),
            Err(WorkstationError::Loop(LoopError::NoRecording))
        ));
    }

    #[test]
    fn imported_loop_can_be_played() {
        let mut ws = workstation();
        let pcm = vec![4000_i16; 800];
        let bytes = crate::dsp::buffer::encode_wav(&pcm, 8000).unwrap();
        assert_eq!(ws.import_loop(&bytes).unwrap(), 0.1);
        ws.play_loop().unwrap();
        let out = run(&mut ws, 0.2);
        assert!(out.iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn status_serializes_as_camel_case() {
        let mut ws = workstation();
        ws.note_on("C4", 261.63).unwrap();
        let json = serde_json::to_value(ws.status()).unwrap();
        assert_eq!(json["activeNotes"][0], "C4");
        assert_eq!(json["soundMode"], "piano");
        assert_eq!(json["loopState"], "idle");
        assert_eq!(json["repeaterPhase"], "idle");
    }
}
