//! Melodic synthesis: voice construction, the voice registry and the
//! release scheduler.

pub mod harmonic;
pub mod registry;
pub mod release;
pub mod voice;

pub use registry::VoiceRegistry;
pub use release::{ReleasePath, TeardownPlan};
pub use voice::{Voice, VoiceId};
