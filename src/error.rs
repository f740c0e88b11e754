use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to bind to {1}: {0}")]
    Bind(std::io::Error, String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Message error: {0}")]
    Message(#[from] serde_json::Error),
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

// Startup configuration faults, all of them fatal
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("The reference palette is empty")]
    EmptyPalette,
    #[error("Reference color '{name}' must have a positive id")]
    InvalidColorId { name: String },
    #[error("Reference color id {0} is used more than once")]
    DuplicateColorId(u32),
    #[error(
        "Invalid workspace bounds: x_lo={x_lo} x_up={x_up} y_left={y_left} y_right={y_right}"
    )]
    InvalidBounds {
        x_lo: f64,
        x_up: f64,
        y_left: f64,
        y_right: f64,
    },
    #[error("Buffer size '{0}' must be greater than 0")]
    InvalidBufferSize(&'static str),
    #[error("Unknown log level: {0}")]
    InvalidLogLevel(String),
}

// Per-cluster conditions, absorbed by the batch processor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("The cluster has no points")]
    Empty,
    #[error("Point {point} is missing field '{field}'")]
    MissingField { point: usize, field: &'static str },
    #[error("Malformed cluster: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Failed to read frame: {0}")]
    Read(std::io::Error),
    #[error("Failed to write frame: {0}")]
    Write(std::io::Error),
    #[error("Invalid frame length: {0}")]
    InvalidFrameLength(usize),
    #[error("Invalid frame tag: {0}")]
    InvalidTag(u8),
    #[error("Invalid frame payload: {0}")]
    Payload(serde_json::Error),
}

impl FrameError {
    /// True when the peer closed the stream between frames.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, FrameError::Read(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
