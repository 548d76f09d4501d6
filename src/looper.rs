//! Loop capture and playback.
//!
//! Recording taps the master output block by block into 16-bit PCM chunks.
//! Stopping encodes the chunks into a WAV stream and decodes it back into
//! a sample buffer, the same path an imported file takes. Playback is a
//! single looping buffer source feeding the master input.

use serde::Serialize;
use tracing::{info, warn};

use crate::dsp::buffer::{SampleBuffer, decode_wav, encode_wav, to_pcm16};
use crate::error::LoopError;
use crate::graph::{AudioGraph, NodeId};
use crate::settings::MAX_RECORDING_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Recording,
    Ready,
    Playing,
}

#[derive(Debug)]
pub struct LoopRecorder {
    state: LoopState,
    sample_rate: u32,
    ceiling_frames: usize,
    chunks: Vec<Vec<i16>>,
    captured: usize,
    buffer: Option<SampleBuffer>,
    playback: Option<NodeId>,
}

impl LoopRecorder {
    /// `ceiling_secs` is capped at [`MAX_RECORDING_SECS`].
    pub fn new(sample_rate: u32, ceiling_secs: f64) -> Self {
        let ceiling = ceiling_secs.clamp(0.0, MAX_RECORDING_SECS);
        LoopRecorder {
            state: LoopState::Idle,
            sample_rate,
            ceiling_frames: (ceiling * sample_rate as f64).round() as usize,
            chunks: Vec::new(),
            captured: 0,
            buffer: None,
            playback: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == LoopState::Recording
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_ref()
    }

    /// Seconds of audio captured by the current recording.
    pub fn recording_elapsed(&self) -> Option<f64> {
        self.is_recording()
            .then(|| self.captured as f64 / self.sample_rate as f64)
    }

    /// Frames left before the recording ceiling is reached.
    pub fn remaining_frames(&self) -> Option<usize> {
        self.is_recording()
            .then(|| self.ceiling_frames.saturating_sub(self.captured))
    }

    /// Begin capturing. Playback stops; the previous buffer is kept until
    /// the new recording replaces it.
    pub fn start_recording(&mut self, graph: &mut AudioGraph) -> Result<(), LoopError> {
        if self.is_recording() {
            return Err(LoopError::AlreadyRecording);
        }
        self.stop(graph);
        self.chunks.clear();
        self.captured = 0;
        self.state = LoopState::Recording;
        info!("Loop recording started");
        Ok(())
    }

    /// Append a rendered block. Returns `true` once the ceiling is reached;
    /// anything past it is dropped.
    pub fn capture(&mut self, block: &[f32]) -> bool {
        if !self.is_recording() {
            return false;
        }
        let take = block.len().min(self.ceiling_frames - self.captured);
        if take > 0 {
            self.chunks
                .push(block[..take].iter().copied().map(to_pcm16).collect());
            self.captured += take;
        }
        self.captured >= self.ceiling_frames
    }

    /// Finish the recording and decode it into the loop buffer.
    ///
    /// On failure the buffer is cleared and the recorder returns to idle.
    pub fn stop_recording(&mut self) -> Result<f64, LoopError> {
        if !self.is_recording() {
            return Err(LoopError::NotRecording);
        }
        let pcm: Vec<i16> = self.chunks.drain(..).flatten().collect();
        self.captured = 0;

        let decoded = encode_wav(&pcm, self.sample_rate)
            .map_err(LoopError::Encode)
            .and_then(|bytes| decode_wav(&bytes).map_err(LoopError::from));
        self.install(decoded)
    }

    /// Load an external WAV file as the loop buffer.
    pub fn import(&mut self, graph: &mut AudioGraph, bytes: &[u8]) -> Result<f64, LoopError> {
        if self.is_recording() {
            return Err(LoopError::AlreadyRecording);
        }
        self.stop(graph);
        let decoded = decode_wav(bytes).map_err(LoopError::from).map(|buffer| {
            let limit = (MAX_RECORDING_SECS * buffer.sample_rate() as f64) as usize;
            if buffer.len() > limit {
                SampleBuffer::new(buffer.samples()[..limit].to_vec(), buffer.sample_rate())
            } else {
                buffer
            }
        });
        self.install(decoded)
    }

    fn install(&mut self, decoded: Result<SampleBuffer, LoopError>) -> Result<f64, LoopError> {
        match decoded {
            Ok(buffer) => {
                let duration = buffer.duration();
                info!("Loop ready: {:.2}s", duration);
                self.buffer = Some(buffer);
                self.state = LoopState::Ready;
                Ok(duration)
            }
            Err(e) => {
                warn!("Loop decode failed, no recording available: {}", e);
                self.buffer = None;
                self.state = LoopState::Idle;
                Err(e)
            }
        }
    }

    /// Start looping the buffer into `destination`, replacing any current playback.
    pub fn play(&mut self, graph: &mut AudioGraph, destination: NodeId) -> Result<(), LoopError> {
        if self.is_recording() {
            return Err(LoopError::AlreadyRecording);
        }
        let buffer = self.buffer.clone().ok_or(LoopError::NoRecording)?;
        self.stop(graph);

        let now = graph.current_time();
        let (source, _) = graph.patch(|p| {
            let source = p.buffer_source(buffer, true)?;
            p.connect(source, destination)?;
            p.start(source, now)?;
            Ok(source)
        })?;

        self.playback = Some(source);
        self.state = LoopState::Playing;
        info!("Loop playback started");
        Ok(())
    }

    /// Stop playback. Returns `false` if nothing was playing.
    pub fn stop(&mut self, graph: &mut AudioGraph) -> bool {
        let Some(source) = self.playback.take() else {
            return false;
        };
        let _ = graph.stop(source, graph.current_time());
        let _ = graph.remove(source);
        if self.state == LoopState::Playing {
            self.state = if self.buffer.is_some() {
                LoopState::Ready
            } else {
                LoopState::Idle
            };
        }
        info!("Loop playback stopped");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphConfig;

    const SR: u32 = 8000;

    fn setup() -> (AudioGraph, LoopRecorder) {
        let graph = AudioGraph::new(GraphConfig {
            sample_rate: SR as f64,
            ..GraphConfig::default()
        });
        (graph, LoopRecorder::new(SR, MAX_RECORDING_SECS))
    }

    fn tone(frames: usize) -> Vec<f32> {
        (0..frames).map(|i| ((i % 16) as f32 / 16.0) - 0.5).collect()
    }

    #[test]
    fn records_and_decodes_captured_audio() {
        let (mut graph, mut rec) = setup();
        rec.start_recording(&mut graph).unwrap();
        rec.capture(&tone(4000));
        rec.capture(&tone(4000));
        assert_eq!(rec.recording_elapsed(), Some(1.0));

        let duration = rec.stop_recording().unwrap();
        assert!((duration - 1.0).abs() < 1e-9);
        assert_eq!(rec.state(), LoopState::Ready);
        let buffer = rec.buffer().unwrap();
        assert!((buffer.samples()[1] - (1.0 / 16.0 - 0.5)).abs() < 1e-3);
    }

    #[test]
    fn capture_stops_exactly_at_the_ceiling() {
        let (mut graph, mut rec) = setup();
        rec.start_recording(&mut graph).unwrap();
        let block = tone(SR as usize * 3);
        assert!(!rec.capture(&block));
        assert!(!rec.capture(&block));
        assert!(!rec.capture(&block));
        assert_eq!(rec.remaining_frames(), Some(SR as usize));
        assert!(rec.capture(&block));
        assert_eq!(rec.remaining_frames(), Some(0));

        let duration = rec.stop_recording().unwrap();
        assert_eq!(duration, MAX_RECORDING_SECS);
    }

    #[test]
    fn empty_recording_leaves_no_buffer() {
        let (mut graph, mut rec) = setup();
        rec.start_recording(&mut graph).unwrap();
        assert!(matches!(rec.stop_recording(), Err(LoopError::Decode(_))));
        assert_eq!(rec.state(), LoopState::Idle);
        assert!(rec.buffer().is_none());
        let dest = graph.destination();
        assert!(matches!(rec.play(&mut graph, dest), Err(LoopError::NoRecording)));
    }

    #[test]
    fn stop_recording_requires_a_recording() {
        let (_, mut rec) = setup();
        assert!(matches!(rec.stop_recording(), Err(LoopError::NotRecording)));
    }

    #[test]
    fn play_replaces_the_previous_source() {
        let (mut graph, mut rec) = setup();
        rec.start_recording(&mut graph).unwrap();
        rec.capture(&tone(800));
        rec.stop_recording().unwrap();

        let dest = graph.destination();
        rec.play(&mut graph, dest).unwrap();
        let first = rec.playback.unwrap();
        rec.play(&mut graph, dest).unwrap();
        let second = rec.playback.unwrap();

        assert!(!graph.contains(first));
        assert!(graph.contains(second));
        assert_eq!(rec.state(), LoopState::Playing);

        let mut out = vec![0.0; 2000];
        graph.render(&mut out);
        assert!(out[1500].abs() > 0.0);
        assert!(!graph.has_ended(second));
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut graph, mut rec) = setup();
        assert!(!rec.stop(&mut graph));
        rec.start_recording(&mut graph).unwrap();
        rec.capture(&tone(100));
        rec.stop_recording().unwrap();
        let dest = graph.destination();
        rec.play(&mut graph, dest).unwrap();

        assert!(rec.stop(&mut graph));
        assert!(!rec.stop(&mut graph));
        assert_eq!(rec.state(), LoopState::Ready);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn start_recording_stops_playback_but_keeps_the_buffer() {
        let (mut graph, mut rec) = setup();
        rec.start_recording(&mut graph).unwrap();
        rec.capture(&tone(100));
        rec.stop_recording().unwrap();
        let dest = graph.destination();
        rec.play(&mut graph, dest).unwrap();

        rec.start_recording(&mut graph).unwrap();
        assert!(!rec.is_playing());
        assert!(rec.buffer().is_some());
        assert!(matches!(
            rec.start_recording(&mut graph),
            Err(LoopError::AlreadyRecording)
        ));
    }

    #[test]
    fn import_truncates_to_the_ceiling() {
        let (mut graph, mut rec) = setup();
        let pcm = vec![1000_i16; 12 * 100];
        let bytes = encode_wav(&pcm, 100).unwrap();
        let duration = rec.import(&mut graph, &bytes).unwrap();
        assert_eq!(duration, MAX_RECORDING_SECS);
        assert_eq!(rec.state(), LoopState::Ready);

        assert!(rec.import(&mut graph, b"junk").is_err());
        assert_eq!(rec.state(), LoopState::Idle);
    }
}
