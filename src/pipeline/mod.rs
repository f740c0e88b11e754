pub mod aggregator;
pub mod batch_processor;
pub mod classifier;
pub mod identified;
pub mod publish;
pub mod workspace;

pub use aggregator::{compute_centroid, ClusterCentroid};
pub use batch_processor::{BatchProcessor, IdentifierConfig};
pub use classifier::{classify, Palette, ReferenceColor};
pub use identified::{IdentifiedBatch, IdentifiedObject};
pub use publish::IdentifiedPublishingService;
pub use workspace::{is_inside, WorkspaceBounds};
