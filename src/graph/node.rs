//! Node identities, kinds and the per-node processing state.

use std::fmt;

use crate::dsp::buffer::BufferPlayer;
use crate::dsp::compressor::Compressor;
use crate::dsp::filter::{BiquadFilter, FilterType};
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::reverb::Reverb;

use super::param::{AudioParam, ParamKind};

/// Generation-checked handle into the graph arena.
///
/// A slot's generation is bumped when its node is removed, so ids held by
/// deferred teardown never alias a node created later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Public description of what a node is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Oscillator(Waveform),
    Gain,
    Biquad(FilterType),
    BufferSource,
    Compressor,
    Reverb,
    Destination,
}

impl NodeKind {
    pub fn is_source(self) -> bool {
        matches!(self, NodeKind::Oscillator(_) | NodeKind::BufferSource)
    }
}

/// Where a node's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Node(NodeId),
    Param(NodeId, ParamKind),
}

impl Connection {
    pub fn target(self) -> NodeId {
        match self {
            Connection::Node(id) | Connection::Param(id, _) => id,
        }
    }
}

/// Start/stop bookkeeping of a scheduled source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceSchedule {
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub ended: bool,
}

impl SourceSchedule {
    pub(crate) fn is_active(&self) -> bool {
        self.start.is_some() && !self.ended
    }

    /// Whether the source produces sound at `t`; marks it ended once the stop time passes.
    pub(crate) fn playing_at(&mut self, t: f64) -> bool {
        let Some(start) = self.start else {
            return false;
        };
        if self.ended {
            return false;
        }
        if let Some(stop) = self.stop
            && t >= stop
        {
            self.ended = true;
            return false;
        }
        t >= start
    }
}

#[derive(Debug)]
pub(crate) enum Processor {
    Oscillator(Oscillator),
    Gain,
    Biquad(BiquadFilter),
    BufferSource(BufferPlayer),
    Compressor(Compressor),
    Reverb(Reverb),
    Destination,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) processor: Processor,
    pub(crate) params: Vec<AudioParam>,
    pub(crate) outputs: Vec<Connection>,
    pub(crate) schedule: Option<SourceSchedule>,
}

impl Node {
    pub(crate) fn new(processor: Processor, params: Vec<AudioParam>) -> Self {
        let schedule = matches!(
            processor,
            Processor::Oscillator(_) | Processor::BufferSource(_)
        )
        .then(SourceSchedule::default);
        Node {
            processor,
            params,
            outputs: Vec::new(),
            schedule,
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match &self.processor {
            Processor::Oscillator(osc) => NodeKind::Oscillator(osc.waveform),
            Processor::Gain => NodeKind::Gain,
            Processor::Biquad(filter) => NodeKind::Biquad(filter.filter_type),
            Processor::BufferSource(_) => NodeKind::BufferSource,
            Processor::Compressor(_) => NodeKind::Compressor,
            Processor::Reverb(_) => NodeKind::Reverb,
            Processor::Destination => NodeKind::Destination,
        }
    }

    pub(crate) fn param(&self, kind: ParamKind) -> Option<&AudioParam> {
        self.params.iter().find(|p| p.kind() == kind)
    }

    pub(crate) fn param_mut(&mut self, kind: ParamKind) -> Option<&mut AudioParam> {
        self.params.iter_mut().find(|p| p.kind() == kind)
    }

    /// Produce one output sample at time `t`.
    ///
    /// `input` is the summed signal of upstream nodes, `modulation` the
    /// audio-rate signal summed into each parameter slot.
    pub(crate) fn process(
        &mut self,
        t: f64,
        input: f64,
        modulation: &[f64; ParamKind::COUNT],
    ) -> f64 {
        let mut values = [0.0; ParamKind::COUNT];
        for param in &mut self.params {
            let slot = param.kind().slot();
            values[slot] = param.advance(t) + modulation[slot];
        }
        let frequency = values[ParamKind::Frequency.slot()];
        let gain = values[ParamKind::Gain.slot()];

        let playing = self.schedule.as_mut().is_some_and(|s| s.playing_at(t));

        match &mut self.processor {
            Processor::Oscillator(osc) => {
                if playing {
                    osc.next_sample(frequency)
                } else {
                    0.0
                }
            }
            Processor::BufferSource(player) => {
                if !playing {
                    return 0.0;
                }
                let sample = player.next_sample();
                if player.is_finished()
                    && let Some(schedule) = self.schedule.as_mut()
                {
                    schedule.ended = true;
                }
                sample
            }
            Processor::Gain => input * gain,
            Processor::Biquad(filter) => {
                filter.set_params(frequency, values[ParamKind::Q.slot()], gain);
                filter.process(input)
            }
            Processor::Compressor(comp) => comp.process(input),
            Processor::Reverb(reverb) => reverb.process(input, values[ParamKind::Mix.slot()]),
            Processor::Destination => input,
        }
    }
}
