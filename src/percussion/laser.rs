use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::error::GraphError;
use crate::graph::{NodeId, ParamKind, Patch};

use super::{decaying_gain, play, sweep};

const LENGTH: f64 = 0.3;

/// Rising sawtooth through a lowpass that opens and then snaps shut.
pub(super) fn laser(p: &mut Patch<'_>, destination: NodeId, now: f64) -> Result<f64, GraphError> {
    let osc = p.oscillator(Waveform::Sawtooth, 800.0)?;
    sweep(p, osc, 800.0, 2000.0, now, 0.2)?;

    let filter = p.biquad(FilterType::Lowpass, 2000.0, 1.0)?;
    sweep(p, filter, 2000.0, 8000.0, now, 0.1)?;
    p.param(filter, ParamKind::Frequency)?
        .exponential_ramp_to_value_at_time(100.0, now + LENGTH)?;

    let amp = decaying_gain(p, 0.3, now, LENGTH)?;

    p.connect(osc, filter)?;
    p.connect(filter, amp)?;
    p.connect(amp, destination)?;
    play(p, osc, now, LENGTH)?;
    Ok(LENGTH)
}

#[cfg(test)]
mod tests {
    use crate::graph::{AudioGraph, GraphConfig, NodeKind, ParamKind};
    use crate::dsp::filter::FilterType;
    use crate::percussion::{PercussionKind, build};

    #[test]
    fn filter_opens_then_closes() {
        let mut g = AudioGraph::new(GraphConfig::default());
        let dest = g.destination();
        let hit = build(PercussionKind::Laser, &mut g, dest).unwrap();
        let filter = hit
            .nodes
            .iter()
            .copied()
            .find(|&id| g.kind(id) == Ok(NodeKind::Biquad(FilterType::Lowpass)))
            .unwrap();
        let cutoff = g.param(filter, ParamKind::Frequency).unwrap();
        assert!((cutoff.value_at(0.1) - 8000.0).abs() < 1e-6);
        assert!((cutoff.value_at(0.3) - 100.0).abs() < 1e-6);
        assert!(cutoff.value_at(0.2) < 8000.0);
    }
}
