//! Audio graph runtime.
//!
//! Nodes live in a generation-checked arena and are rendered sample by
//! sample in topological order. Each node sums its inputs, advances its
//! parameter automation, and pushes its output to downstream nodes or
//! downstream parameters (audio-rate modulation). The destination's
//! output is soft clipped and written to the caller's block.

mod node;
mod param;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::dsp::buffer::{BufferPlayer, SampleBuffer};
use crate::dsp::compressor::{Compressor, CompressorConfig};
use crate::dsp::filter::{BiquadFilter, FilterType};
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::dsp::reverb::Reverb;
use crate::error::GraphError;

pub use node::{Connection, NodeId, NodeKind, SourceSchedule};
pub use param::{AudioParam, AutomationEvent, ParamKind};

use node::{Node, Processor};

/// Runtime limits and rendering parameters of a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    pub sample_rate: f64,
    /// Creating a node beyond this count fails with [`GraphError::NodeLimit`].
    pub max_nodes: usize,
    /// Starting a source beyond this count fails with [`GraphError::SourceLimit`].
    pub max_active_sources: usize,
    pub noise_seed: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            sample_rate: 44100.0,
            max_nodes: 4096,
            max_active_sources: 512,
            noise_seed: 0x5eed,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

pub struct AudioGraph {
    config: GraphConfig,
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
    destination: NodeId,
    frame: u64,
    order: Vec<usize>,
    order_dirty: bool,
    inputs: Vec<f64>,
    modulation: Vec<[f64; ParamKind::COUNT]>,
    rng: SmallRng,
}

impl AudioGraph {
    pub fn new(config: GraphConfig) -> Self {
        let rng = SmallRng::seed_from_u64(config.noise_seed);
        let mut graph = AudioGraph {
            config,
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            destination: NodeId {
                index: 0,
                generation: 0,
            },
            frame: 0,
            order: Vec::new(),
            order_dirty: true,
            inputs: Vec::new(),
            modulation: Vec::new(),
            rng,
        };
        graph.destination = graph.insert(Node::new(Processor::Destination, Vec::new()));
        graph
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Audio clock in seconds: the time of the next sample to be rendered.
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.config.sample_rate
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn node_count(&self) -> usize {
        self.len
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Sources that have been started and have not yet ended.
    pub fn active_sources(&self) -> usize {
        self.nodes()
            .filter(|n| n.schedule.is_some_and(|s| s.is_active()))
            .count()
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind, GraphError> {
        Ok(self.node(id)?.kind())
    }

    pub fn source_schedule(&self, id: NodeId) -> Result<SourceSchedule, GraphError> {
        self.node(id)?.schedule.ok_or(GraphError::NotASource(id))
    }

    pub fn has_ended(&self, id: NodeId) -> bool {
        self.node(id)
            .ok()
            .and_then(|n| n.schedule)
            .is_some_and(|s| s.ended)
    }

    pub fn outputs(&self, id: NodeId) -> Result<&[Connection], GraphError> {
        Ok(&self.node(id)?.outputs)
    }

    // ── Node creation ───────────────────────────────────────────────

    pub fn create_oscillator(
        &mut self,
        waveform: Waveform,
        frequency: f64,
    ) -> Result<NodeId, GraphError> {
        let sr = self.config.sample_rate;
        self.try_insert(Node::new(
            Processor::Oscillator(Oscillator::new(waveform, sr)),
            vec![AudioParam::new(ParamKind::Frequency, frequency)],
        ))
    }

    pub fn create_gain(&mut self, gain: f64) -> Result<NodeId, GraphError> {
        self.try_insert(Node::new(
            Processor::Gain,
            vec![AudioParam::new(ParamKind::Gain, gain)],
        ))
    }

    /// A biquad; its `Gain` parameter is the peaking gain in dB.
    pub fn create_biquad(
        &mut self,
        filter_type: FilterType,
        frequency: f64,
        q: f64,
    ) -> Result<NodeId, GraphError> {
        let sr = self.config.sample_rate;
        self.try_insert(Node::new(
            Processor::Biquad(BiquadFilter::new(filter_type, sr)),
            vec![
                AudioParam::new(ParamKind::Frequency, frequency),
                AudioParam::new(ParamKind::Q, q),
                AudioParam::new(ParamKind::Gain, 0.0),
            ],
        ))
    }

    pub fn create_buffer_source(
        &mut self,
        buffer: SampleBuffer,
        looping: bool,
    ) -> Result<NodeId, GraphError> {
        let sr = self.config.sample_rate;
        self.try_insert(Node::new(
            Processor::BufferSource(BufferPlayer::new(buffer, sr, looping)),
            Vec::new(),
        ))
    }

    /// A one-shot buffer source over freshly generated white noise.
    pub fn create_noise(&mut self, duration: f64, peak: f32) -> Result<NodeId, GraphError> {
        self.check_capacity()?;
        let sr = self.config.sample_rate.round() as u32;
        let buffer = SampleBuffer::white_noise(&mut self.rng, duration, sr, peak);
        self.create_buffer_source(buffer, false)
    }

    pub fn create_compressor(&mut self, config: CompressorConfig) -> Result<NodeId, GraphError> {
        let sr = self.config.sample_rate;
        self.try_insert(Node::new(
            Processor::Compressor(Compressor::new(sr, config)),
            Vec::new(),
        ))
    }

    pub fn create_reverb(&mut self, mix: f64) -> Result<NodeId, GraphError> {
        let sr = self.config.sample_rate;
        self.try_insert(Node::new(
            Processor::Reverb(Reverb::new(sr)),
            vec![AudioParam::new(ParamKind::Mix, mix)],
        ))
    }

    // ── Wiring ──────────────────────────────────────────────────────

    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.add_connection(from, Connection::Node(to))
    }

    /// Route `from`'s output into a parameter of `to`, summed with its automation.
    pub fn connect_param(
        &mut self,
        from: NodeId,
        to: NodeId,
        param: ParamKind,
    ) -> Result<(), GraphError> {
        if self.node(to)?.param(param).is_none() {
            return Err(GraphError::MissingParam { node: to, param });
        }
        self.add_connection(from, Connection::Param(to, param))
    }

    /// Drop every outgoing connection of `id`.
    pub fn disconnect(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.node_mut(id)?.outputs.clear();
        self.order_dirty = true;
        Ok(())
    }

    pub fn param(&self, id: NodeId, kind: ParamKind) -> Result<&AudioParam, GraphError> {
        self.node(id)?
            .param(kind)
            .ok_or(GraphError::MissingParam {
                node: id,
                param: kind,
            })
    }

    pub fn param_mut(
        &mut self,
        id: NodeId,
        kind: ParamKind,
    ) -> Result<&mut AudioParam, GraphError> {
        self.node_mut(id)?
            .param_mut(kind)
            .ok_or(GraphError::MissingParam {
                node: id,
                param: kind,
            })
    }

    // ── Source scheduling ───────────────────────────────────────────

    pub fn start(&mut self, id: NodeId, when: f64) -> Result<(), GraphError> {
        let limit = self.config.max_active_sources;
        let active = self.active_sources();
        let schedule = self.schedule_mut(id)?;
        if schedule.start.is_some() {
            return Err(GraphError::InvalidState {
                node: id,
                reason: "source already started",
            });
        }
        if active >= limit {
            return Err(GraphError::SourceLimit { limit });
        }
        schedule.start = Some(when);
        Ok(())
    }

    /// Schedule a stop. A later call replaces the earlier stop time; stopping
    /// a source that already ended does nothing.
    pub fn stop(&mut self, id: NodeId, when: f64) -> Result<(), GraphError> {
        let schedule = self.schedule_mut(id)?;
        if schedule.ended {
            return Ok(());
        }
        if schedule.start.is_none() {
            return Err(GraphError::InvalidState {
                node: id,
                reason: "source stopped before start",
            });
        }
        schedule.stop = Some(when);
        Ok(())
    }

    // ── Removal ─────────────────────────────────────────────────────

    /// Free a node and strip every connection that points at it.
    pub fn remove(&mut self, id: NodeId) -> Result<(), GraphError> {
        if id == self.destination {
            return Err(GraphError::InvalidState {
                node: id,
                reason: "the destination cannot be removed",
            });
        }
        self.node(id)?;

        let slot = &mut self.slots[id.index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;

        for slot in &mut self.slots {
            if let Some(node) = slot.node.as_mut() {
                node.outputs.retain(|c| c.target() != id);
            }
        }
        self.order_dirty = true;
        Ok(())
    }

    /// Remove every id that is still live; stale ids are skipped.
    /// Returns how many nodes were actually freed.
    pub fn remove_all(&mut self, ids: &[NodeId]) -> usize {
        ids.iter().filter(|&&id| self.remove(id).is_ok()).count()
    }

    // ── Rendering ───────────────────────────────────────────────────

    /// Render a mono block, advancing the audio clock by `out.len()` frames.
    pub fn render(&mut self, out: &mut [f32]) {
        if self.order_dirty {
            self.rebuild_order();
        }
        let sr = self.config.sample_rate;
        let dest = self.destination.index as usize;

        for sample in out.iter_mut() {
            let t = self.frame as f64 / sr;
            self.inputs.iter_mut().for_each(|v| *v = 0.0);
            self.modulation.iter_mut().for_each(|m| *m = [0.0; ParamKind::COUNT]);

            for &idx in &self.order {
                let Some(node) = self.slots[idx].node.as_mut() else {
                    continue;
                };
                let value = node.process(t, self.inputs[idx], &self.modulation[idx]);
                if idx == dest {
                    *sample = value.tanh() as f32;
                    continue;
                }
                for connection in &node.outputs {
                    match *connection {
                        Connection::Node(to) => self.inputs[to.index as usize] += value,
                        Connection::Param(to, kind) => {
                            self.modulation[to.index as usize][kind.slot()] += value
                        }
                    }
                }
            }
            self.frame += 1;
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().filter_map(|s| s.node.as_ref())
    }

    fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
            .ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
            .ok_or(GraphError::UnknownNode(id))
    }

    fn schedule_mut(&mut self, id: NodeId) -> Result<&mut SourceSchedule, GraphError> {
        self.node_mut(id)?
            .schedule
            .as_mut()
            .ok_or(GraphError::NotASource(id))
    }

    fn check_capacity(&self) -> Result<(), GraphError> {
        if self.len >= self.config.max_nodes {
            return Err(GraphError::NodeLimit {
                limit: self.config.max_nodes,
            });
        }
        Ok(())
    }

    fn try_insert(&mut self, node: Node) -> Result<NodeId, GraphError> {
        self.check_capacity()?;
        Ok(self.insert(node))
    }

    fn insert(&mut self, node: Node) -> NodeId {
        self.len += 1;
        self.order_dirty = true;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        self.inputs.push(0.0);
        self.modulation.push([0.0; ParamKind::COUNT]);
        NodeId {
            index,
            generation: 0,
        }
    }

    fn add_connection(&mut self, from: NodeId, connection: Connection) -> Result<(), GraphError> {
        let to = connection.target();
        self.node(to)?;
        if from == to || self.reaches(to, from) {
            return Err(GraphError::Cycle { from, to });
        }
        let node = self.node_mut(from)?;
        if !node.outputs.contains(&connection) {
            node.outputs.push(connection);
            self.order_dirty = true;
        }
        Ok(())
    }

    /// Depth-first search along outgoing connections.
    fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.slots.len()];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            let idx = id.index as usize;
            if std::mem::replace(&mut seen[idx], true) {
                continue;
            }
            if let Ok(node) = self.node(id) {
                stack.extend(node.outputs.iter().map(|c| c.target()));
            }
        }
        false
    }

    /// Kahn's algorithm over live slots.
    fn rebuild_order(&mut self) {
        let mut in_degree = vec![0usize; self.slots.len()];
        for node in self.nodes() {
            for connection in &node.outputs {
                in_degree[connection.target().index as usize] += 1;
            }
        }

        let mut ready: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(i, s)| s.node.is_some() && in_degree[*i] == 0)
            .map(|(i, _)| i)
            .collect();

        self.order.clear();
        while let Some(idx) = ready.pop() {
            self.order.push(idx);
            if let Some(node) = self.slots[idx].node.as_ref() {
                for connection in &node.outputs {
                    let target = connection.target().index as usize;
                    in_degree[target] -= 1;
                    if in_degree[target] == 0 {
                        ready.push(target);
                    }
                }
            }
        }
        self.order_dirty = false;
    }
}

/// Tracks the nodes created while building one voice or hit.
///
/// Use [`AudioGraph::patch`]: if the build closure fails every node it
/// created is removed again, so a failed construction leaves no residue.
pub struct Patch<'g> {
    graph: &'g mut AudioGraph,
    nodes: Vec<NodeId>,
}

impl<'g> Patch<'g> {
    pub fn graph(&mut self) -> &mut AudioGraph {
        &mut *self.graph
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn now(&self) -> f64 {
        self.graph.current_time()
    }

    fn track(&mut self, id: Result<NodeId, GraphError>) -> Result<NodeId, GraphError> {
        let id = id?;
        self.nodes.push(id);
        Ok(id)
    }

    pub fn oscillator(&mut self, waveform: Waveform, frequency: f64) -> Result<NodeId, GraphError> {
        let id = self.graph.create_oscillator(waveform, frequency);
        self.track(id)
    }

    pub fn gain(&mut self, gain: f64) -> Result<NodeId, GraphError> {
        let id = self.graph.create_gain(gain);
        self.track(id)
    }

    pub fn biquad(
        &mut self,
        filter_type: FilterType,
        frequency: f64,
        q: f64,
    ) -> Result<NodeId, GraphError> {
        let id = self.graph.create_biquad(filter_type, frequency, q);
        self.track(id)
    }

    pub fn buffer_source(
        &mut self,
        buffer: SampleBuffer,
        looping: bool,
    ) -> Result<NodeId, GraphError> {
        let id = self.graph.create_buffer_source(buffer, looping);
        self.track(id)
    }

    pub fn noise(&mut self, duration: f64, peak: f32) -> Result<NodeId, GraphError> {
        let id = self.graph.create_noise(duration, peak);
        self.track(id)
    }

    pub fn compressor(&mut self, config: CompressorConfig) -> Result<NodeId, GraphError> {
        let id = self.graph.create_compressor(config);
        self.track(id)
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.graph.connect(from, to)
    }

    pub fn connect_param(
        &mut self,
        from: NodeId,
        to: NodeId,
        param: ParamKind,
    ) -> Result<(), GraphError> {
        self.graph.connect_param(from, to, param)
    }

    pub fn param(&mut self, id: NodeId, kind: ParamKind) -> Result<&mut AudioParam, GraphError> {
        self.graph.param_mut(id, kind)
    }

    pub fn start(&mut self, id: NodeId, when: f64) -> Result<(), GraphError> {
        self.graph.start(id, when)
    }

    pub fn stop(&mut self, id: NodeId, when: f64) -> Result<(), GraphError> {
        self.graph.stop(id, when)
    }
}

impl AudioGraph {
    /// Build a fragment of the graph, discarding it if `build` fails.
    ///
    /// On success returns the closure's value together with every node id
    /// created through the patch.
    pub fn patch<T, F>(&mut self, build: F) -> Result<(T, Vec<NodeId>), GraphError>
    where
        F: FnOnce(&mut Patch<'_>) -> Result<T, GraphError>,
    {
        let mut patch = Patch {
            graph: self,
            nodes: Vec::new(),
        };
        match build(&mut patch) {
            Ok(value) => Ok((value, patch.nodes)),
            Err(e) => {
                let Patch { graph, nodes } = patch;
                graph.remove_all(&nodes);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> AudioGraph {
        AudioGraph::new(GraphConfig {
            sample_rate: 1000.0,
            ..GraphConfig::default()
        })
    }

    fn render(graph: &mut AudioGraph, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        graph.render(&mut out);
        out
    }

    #[test]
    fn unconnected_graph_is_silent() {
        let mut g = graph();
        let osc = g.create_oscillator(Waveform::Square, 100.0).unwrap();
        g.start(osc, 0.0).unwrap();
        assert!(render(&mut g, 100).iter().all(|&s| s == 0.0));
        assert_eq!(g.current_time(), 0.1);
    }

    #[test]
    fn gain_scales_and_destination_soft_clips() {
        let mut g = graph();
        let src = g
            .create_buffer_source(SampleBuffer::new(vec![1.0; 100], 1000), false)
            .unwrap();
        let gain = g.create_gain(0.5).unwrap();
        g.connect(src, gain).unwrap();
        g.connect(gain, g.destination()).unwrap();
        g.start(src, 0.0).unwrap();

        let out = render(&mut g, 4);
        assert!((out[0] - 0.5_f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn source_respects_start_and_stop_times() {
        let mut g = graph();
        let src = g
            .create_buffer_source(SampleBuffer::new(vec![0.25; 1000], 1000), false)
            .unwrap();
        g.connect(src, g.destination()).unwrap();
        g.start(src, 0.01).unwrap();
        g.stop(src, 0.02).unwrap();

        let out = render(&mut g, 30);
        assert_eq!(out[9], 0.0);
        assert!(out[10] > 0.0);
        assert!(out[19] > 0.0);
        assert_eq!(out[20], 0.0);
        assert!(g.has_ended(src));
        assert_eq!(g.active_sources(), 0);
    }

    #[test]
    fn one_shot_buffer_ends_itself() {
        let mut g = graph();
        let src = g
            .create_buffer_source(SampleBuffer::new(vec![0.1; 5], 1000), false)
            .unwrap();
        g.start(src, 0.0).unwrap();
        render(&mut g, 10);
        assert!(g.has_ended(src));
    }

    #[test]
    fn start_twice_and_stop_before_start_are_invalid() {
        let mut g = graph();
        let osc = g.create_oscillator(Waveform::Sine, 100.0).unwrap();
        assert!(matches!(g.stop(osc, 0.0), Err(GraphError::InvalidState { .. })));
        g.start(osc, 0.0).unwrap();
        assert!(matches!(g.start(osc, 0.0), Err(GraphError::InvalidState { .. })));
    }

    #[test]
    fn stopping_an_ended_source_is_benign() {
        let mut g = graph();
        let osc = g.create_oscillator(Waveform::Sine, 100.0).unwrap();
        g.start(osc, 0.0).unwrap();
        g.stop(osc, 0.0).unwrap();
        render(&mut g, 1);
        assert!(g.has_ended(osc));
        assert_eq!(g.stop(osc, 5.0), Ok(()));
        assert_eq!(g.source_schedule(osc).unwrap().stop, Some(0.0));
    }

    #[test]
    fn gain_is_not_a_source() {
        let mut g = graph();
        let gain = g.create_gain(1.0).unwrap();
        assert_eq!(g.start(gain, 0.0), Err(GraphError::NotASource(gain)));
    }

    #[test]
    fn node_limit_is_enforced() {
        let mut g = AudioGraph::new(GraphConfig {
            max_nodes: 3,
            ..GraphConfig::default()
        });
        g.create_gain(1.0).unwrap();
        g.create_gain(1.0).unwrap();
        assert_eq!(g.create_gain(1.0), Err(GraphError::NodeLimit { limit: 3 }));
    }

    #[test]
    fn source_limit_is_enforced() {
        let mut g = AudioGraph::new(GraphConfig {
            max_active_sources: 1,
            ..GraphConfig::default()
        });
        let a = g.create_oscillator(Waveform::Sine, 100.0).unwrap();
        let b = g.create_oscillator(Waveform::Sine, 100.0).unwrap();
        g.start(a, 0.0).unwrap();
        assert_eq!(g.start(b, 0.0), Err(GraphError::SourceLimit { limit: 1 }));
        assert!(g.source_schedule(b).unwrap().start.is_none());
    }

    #[test]
    fn stale_ids_are_rejected_after_slot_reuse() {
        let mut g = graph();
        let old = g.create_gain(1.0).unwrap();
        g.remove(old).unwrap();
        let new = g.create_gain(0.3).unwrap();
        assert_eq!(old.index, new.index);
        assert_ne!(old, new);
        assert_eq!(g.remove(old), Err(GraphError::UnknownNode(old)));
        assert!(g.contains(new));
    }

    #[test]
    fn remove_strips_incoming_connections() {
        let mut g = graph();
        let a = g.create_gain(1.0).unwrap();
        let b = g.create_gain(1.0).unwrap();
        g.connect(a, b).unwrap();
        g.remove(b).unwrap();
        assert!(g.outputs(a).unwrap().is_empty());
    }

    #[test]
    fn remove_all_skips_stale_ids() {
        let mut g = graph();
        let a = g.create_gain(1.0).unwrap();
        let b = g.create_gain(1.0).unwrap();
        g.remove(a).unwrap();
        assert_eq!(g.remove_all(&[a, b]), 1);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut g = graph();
        let a = g.create_gain(1.0).unwrap();
        let b = g.create_gain(1.0).unwrap();
        g.connect(a, b).unwrap();
        assert_eq!(g.connect(b, a), Err(GraphError::Cycle { from: b, to: a }));
        assert_eq!(g.connect(a, a), Err(GraphError::Cycle { from: a, to: a }));
    }

    #[test]
    fn connect_param_requires_the_param() {
        let mut g = graph();
        let lfo = g.create_oscillator(Waveform::Sine, 5.0).unwrap();
        let gain = g.create_gain(1.0).unwrap();
        assert_eq!(
            g.connect_param(lfo, gain, ParamKind::Frequency),
            Err(GraphError::MissingParam {
                node: gain,
                param: ParamKind::Frequency
            })
        );
    }

    #[test]
    fn param_modulation_adds_to_automation() {
        let mut g = graph();
        let dc = g
            .create_buffer_source(SampleBuffer::new(vec![1.0; 100], 1000), false)
            .unwrap();
        let depth = g.create_gain(0.25).unwrap();
        let vca = g.create_gain(0.5).unwrap();
        let probe = g
            .create_buffer_source(SampleBuffer::new(vec![0.5; 100], 1000), false)
            .unwrap();
        g.connect(dc, depth).unwrap();
        g.connect_param(depth, vca, ParamKind::Gain).unwrap();
        g.connect(probe, vca).unwrap();
        g.connect(vca, g.destination()).unwrap();
        g.start(dc, 0.0).unwrap();
        g.start(probe, 0.0).unwrap();

        let out = render(&mut g, 2);
        // 0.5 * (0.5 + 0.25)
        assert!((out[0] - 0.375_f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn automation_is_applied_while_rendering() {
        let mut g = graph();
        let src = g
            .create_buffer_source(SampleBuffer::new(vec![0.5; 1000], 1000), false)
            .unwrap();
        let vca = g.create_gain(0.0).unwrap();
        g.connect(src, vca).unwrap();
        g.connect(vca, g.destination()).unwrap();
        g.start(src, 0.0).unwrap();
        g.param_mut(vca, ParamKind::Gain)
            .unwrap()
            .linear_ramp_to_value_at_time(1.0, 0.1)
            .unwrap();

        let out = render(&mut g, 101);
        assert_eq!(out[0], 0.0);
        assert!((out[50] - 0.25_f32.tanh()).abs() < 1e-4);
        assert!((out[100] - 0.5_f32.tanh()).abs() < 1e-4);
    }

    #[test]
    fn failed_patch_leaves_no_nodes_behind() {
        let mut g = AudioGraph::new(GraphConfig {
            max_nodes: 3,
            ..GraphConfig::default()
        });
        let result = g.patch(|p| {
            p.gain(1.0)?;
            p.gain(1.0)?;
            p.gain(1.0)
        });
        assert_eq!(result, Err(GraphError::NodeLimit { limit: 3 }));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn successful_patch_reports_its_nodes() {
        let mut g = graph();
        let (osc, nodes) = g
            .patch(|p| {
                let osc = p.oscillator(Waveform::Sine, 220.0)?;
                let vca = p.gain(0.5)?;
                p.connect(osc, vca)?;
                Ok(osc)
            })
            .unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0], osc);
        assert_eq!(g.kind(osc), Ok(NodeKind::Oscillator(Waveform::Sine)));
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let sample = |seed| {
            let mut g = AudioGraph::new(GraphConfig {
                noise_seed: seed,
                ..GraphConfig::default()
            });
            let noise = g.create_noise(0.01, 0.1).unwrap();
            g.connect(noise, g.destination()).unwrap();
            g.start(noise, 0.0).unwrap();
            render(&mut g, 8)
        };
        assert_eq!(sample(1), sample(1));
        assert_ne!(sample(1), sample(2));
    }
}
