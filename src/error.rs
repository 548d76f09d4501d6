use crate::graph::{NodeId, ParamKind};
use std::fmt;

#[derive(Debug)]
pub enum WorkstationError {
    Graph(GraphError),
    Config(ConfigError),
    Loop(LoopError),
    UnknownPercussion(String),
    UnknownSoundMode(String),
    UnknownWaveform(String),
    InvalidFrequency(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    UnknownNode(NodeId),
    NodeLimit { limit: usize },
    SourceLimit { limit: usize },
    NotASource(NodeId),
    InvalidState { node: NodeId, reason: &'static str },
    MissingParam { node: NodeId, param: ParamKind },
    Cycle { from: NodeId, to: NodeId },
    Param(ParamError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    NonFinite(f64),
    NonPositiveExponentialTarget(f64),
}

#[derive(Debug)]
pub enum DecodeError {
    Wav(hound::Error),
    Empty,
}

#[derive(Debug)]
pub enum LoopError {
    NoRecording,
    AlreadyRecording,
    NotRecording,
    Encode(hound::Error),
    Decode(DecodeError),
    Graph(GraphError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    Settings(SettingsError),
    SampleRate(f64),
}

impl fmt::Display for WorkstationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkstationError::Graph(e) => write!(f, "Graph error: {e}"),
            WorkstationError::Config(e) => write!(f, "Config error: {e}"),
            WorkstationError::Loop(e) => write!(f, "Loop error: {e}"),
            WorkstationError::UnknownPercussion(name) => {
                write!(f, "Unknown percussion sound '{name}'")
            }
            WorkstationError::UnknownSoundMode(name) => write!(f, "Unknown sound mode '{name}'"),
            WorkstationError::UnknownWaveform(name) => write!(f, "Unknown waveform '{name}'"),
            WorkstationError::InvalidFrequency(hz) => {
                write!(f, "Note frequency must be a positive number of Hz, got {hz}")
            }
        }
    }
}

impl std::error::Error for WorkstationError {}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownNode(id) => write!(f, "Unknown or released node {id}"),
            GraphError::NodeLimit { limit } => write!(f, "Node limit of {limit} reached"),
            GraphError::SourceLimit { limit } => {
                write!(f, "Active source limit of {limit} reached")
            }
            GraphError::NotASource(id) => write!(f, "Node {id} is not a source"),
            GraphError::InvalidState { node, reason } => {
                write!(f, "Invalid state for node {node}: {reason}")
            }
            GraphError::MissingParam { node, param } => {
                write!(f, "Node {node} has no {param:?} parameter")
            }
            GraphError::Cycle { from, to } => {
                write!(f, "Connecting {from} -> {to} would create a cycle")
            }
            GraphError::Param(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GraphError {}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::NonFinite(v) => write!(f, "Parameter value {v} is not finite"),
            ParamError::NonPositiveExponentialTarget(v) => {
                write!(f, "Exponential ramp target must be positive, got {v}")
            }
        }
    }
}

impl std::error::Error for ParamError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Wav(e) => write!(f, "WAV decode failed: {e}"),
            DecodeError::Empty => write!(f, "Decoded audio contains no samples"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl fmt::Display for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopError::NoRecording => write!(f, "No recording available"),
            LoopError::AlreadyRecording => write!(f, "Already recording"),
            LoopError::NotRecording => write!(f, "Not recording"),
            LoopError::Encode(e) => write!(f, "Failed to encode capture: {e}"),
            LoopError::Decode(e) => write!(f, "{e}"),
            LoopError::Graph(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoopError {}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} must be between {min} and {max}, but was {value}"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "Invalid config JSON: {e}"),
            ConfigError::Settings(e) => write!(f, "{e}"),
            ConfigError::SampleRate(v) => {
                write!(f, "the sample rate must be between 8000 and 192000, but was {v}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ParamError> for GraphError {
    fn from(e: ParamError) -> Self {
        GraphError::Param(e)
    }
}

impl From<GraphError> for WorkstationError {
    fn from(e: GraphError) -> Self {
        WorkstationError::Graph(e)
    }
}

impl From<ConfigError> for WorkstationError {
    fn from(e: ConfigError) -> Self {
        WorkstationError::Config(e)
    }
}

impl From<LoopError> for WorkstationError {
    fn from(e: LoopError) -> Self {
        WorkstationError::Loop(e)
    }
}

impl From<hound::Error> for DecodeError {
    fn from(e: hound::Error) -> Self {
        DecodeError::Wav(e)
    }
}

impl From<DecodeError> for LoopError {
    fn from(e: DecodeError) -> Self {
        LoopError::Decode(e)
    }
}

impl From<GraphError> for LoopError {
    fn from(e: GraphError) -> Self {
        LoopError::Graph(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl From<SettingsError> for ConfigError {
    fn from(e: SettingsError) -> Self {
        ConfigError::Settings(e)
    }
}
