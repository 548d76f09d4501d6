//! DSP primitives — the per-sample processors behind graph nodes.
//!
//! Nothing here knows about scheduling or connections; the graph runtime
//! drives these one sample at a time.

pub mod buffer;
pub mod compressor;
pub mod filter;
pub mod oscillator;
pub mod reverb;
