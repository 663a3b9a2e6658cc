use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("`{}` is not an iNES ROM", .0.display())]
    UnsupportedFile(PathBuf),
    #[error("{0}")]
    Rejected(String),
    #[error("the engine stopped responding")]
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{0}")]
    Engine(String),
    #[error("the engine stopped responding")]
    Disconnected,
    #[error("{0} malformed frames in a row")]
    MalformedFrames(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame carries no pixel data")]
    MissingPixels,
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("a {width}x{height} frame needs {expected} bytes, got {actual}")]
    Truncated {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("channel value {value} at index {index} does not fit in a byte")]
    ValueOutOfRange { index: usize, value: u32 },
}

impl DecodeError {
    /// Text drawn over the placeholder frame.
    pub fn short_text(&self) -> &'static str {
        match self {
            DecodeError::MissingPixels => "NO SIGNAL",
            DecodeError::InvalidDimensions { .. } => "BAD FRAME SIZE",
            DecodeError::Truncated { .. } => "TRUNCATED FRAME",
            DecodeError::ValueOutOfRange { .. } => "BAD PIXEL DATA",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("the engine stopped responding")]
    Disconnected,
}
