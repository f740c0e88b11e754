use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::Utc;
use futures::future::{self, Ready};
use tower::Service;
use tracing::{debug, error, info, instrument, warn};

use crate::common::{ClusterBatch, Pose, Quaternion, RawCluster};
use crate::error::ConfigError;
use crate::pipeline::aggregator::compute_centroid;
use crate::pipeline::classifier::Palette;
use crate::pipeline::identified::{IdentifiedBatch, IdentifiedObject};
use crate::pipeline::workspace::{is_inside, WorkspaceBounds};

/// Everything the processor needs, fixed once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierConfig {
    pub palette: Palette,
    pub workspace: WorkspaceBounds,
    pub orientation: Quaternion,
}

impl IdentifierConfig {
    pub fn new(
        palette: Palette,
        workspace: WorkspaceBounds,
        orientation: Quaternion,
    ) -> Result<Self, ConfigError> {
        workspace.validate()?;
        Ok(Self {
            palette,
            workspace,
            orientation,
        })
    }
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            workspace: WorkspaceBounds::default(),
            orientation: Quaternion::IDENTITY,
        }
    }
}

/// Turns a batch of raw clusters into identified objects.
///
/// Holds no state between batches; cloning shares the configuration.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    config: Arc<IdentifierConfig>,
}

impl BatchProcessor {
    pub fn new(config: IdentifierConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &IdentifierConfig {
        &self.config
    }

    /// Processes every cluster of the batch. Clusters that are empty, malformed
    /// or outside the workspace are logged and left out; survivors keep their
    /// relative input order.
    #[instrument(skip_all, fields(batch = %batch.id()))]
    pub fn process(&self, batch: &ClusterBatch) -> IdentifiedBatch {
        let mut output = IdentifiedBatch::new(batch.id());

        for (index, slot) in batch.clusters().iter().enumerate() {
            match slot {
                Ok(cluster) => {
                    if let Some(object) = self.identify(index, cluster) {
                        output.objects.push(object);
                    }
                }
                Err(e) => warn!(cluster = index, "Skipping undecodable cluster: {}", e),
            }
        }

        info!(
            received = batch.len(),
            identified = output.len(),
            skipped = batch.len() - output.len(),
            "Batch processed"
        );
        output
    }

    fn identify(&self, index: usize, cluster: &RawCluster) -> Option<IdentifiedObject> {
        let centroid = match compute_centroid(cluster) {
            Ok(centroid) => centroid,
            Err(e) => {
                warn!(cluster = index, "Skipping cluster: {}", e);
                return None;
            }
        };

        let color = centroid.quantized_color();
        debug!(
            cluster = index,
            "Centroid pos: ({:.4}, {:.4}, {:.4}) / col: ({}, {}, {})",
            centroid.position.x,
            centroid.position.y,
            centroid.position.z,
            color.r,
            color.g,
            color.b
        );

        if !is_inside(&centroid.position, &self.config.workspace) {
            warn!(cluster = index, "The processed cluster is outside the workspace");
            return None;
        }

        let object_id = match self.config.palette.classify(color) {
            Ok(id) => id,
            Err(e) => {
                error!(cluster = index, "Unable to classify cluster: {}", e);
                return None;
            }
        };
        debug!(
            cluster = index,
            object_id,
            "Cluster identified as {}",
            self.config.palette.name_of(object_id).unwrap_or("unknown")
        );

        Some(IdentifiedObject {
            timestamp: Utc::now(),
            pose: Pose {
                position: centroid.position,
                orientation: self.config.orientation,
            },
            object_id,
        })
    }
}

impl Service<ClusterBatch> for BatchProcessor {
    type Response = IdentifiedBatch;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, batch: ClusterBatch) -> Self::Future {
        future::ready(Ok(self.process(&batch)))
    }
}
