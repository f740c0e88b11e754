pub mod cluster;
pub mod point;
pub mod pose;

pub use cluster::{ClusterBatch, RawCluster};
pub use point::{ColoredPoint, Position, Rgb};
pub use pose::{Pose, Quaternion};
