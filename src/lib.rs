pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intake;
pub mod pipeline;

pub use config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{AppError, ClusterError, ConfigError, FrameError};
pub use pipeline::{BatchProcessor, IdentifiedBatch, IdentifierConfig};
