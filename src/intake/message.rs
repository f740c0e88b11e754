use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::common::{ClusterBatch, ColoredPoint, RawCluster};
use crate::error::ClusterError;

// Clusters stay untyped until each one is decoded on its own, so a bad cluster
// does not take the rest of the batch with it.
#[derive(Debug, Deserialize)]
struct SegmentedClustersMessage {
    clusters: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct OutgoingClustersMessage {
    clusters: Vec<WireCluster>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCluster {
    points: Vec<WirePoint>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rgb: Option<u32>,
}

impl WirePoint {
    fn into_point(self, index: usize) -> Result<ColoredPoint, ClusterError> {
        let missing = |field| ClusterError::MissingField {
            point: index,
            field,
        };
        Ok(ColoredPoint::from_packed(
            self.x.ok_or_else(|| missing("x"))?,
            self.y.ok_or_else(|| missing("y"))?,
            self.z.ok_or_else(|| missing("z"))?,
            self.rgb.ok_or_else(|| missing("rgb"))?,
        ))
    }
}

impl From<&ColoredPoint> for WirePoint {
    fn from(point: &ColoredPoint) -> Self {
        Self {
            x: Some(point.position.x),
            y: Some(point.position.y),
            z: Some(point.position.z),
            rgb: Some(point.color.packed()),
        }
    }
}

pub fn decode_cluster(value: Value) -> Result<RawCluster, ClusterError> {
    let wire: WireCluster =
        serde_json::from_value(value).map_err(|e| ClusterError::Malformed(e.to_string()))?;
    wire.points
        .into_iter()
        .enumerate()
        .map(|(index, point)| point.into_point(index))
        .collect::<Result<Vec<_>, _>>()
        .map(RawCluster::new)
}

/// Decodes a segmentation message. Never fails: an unreadable message becomes
/// an empty batch so that it still gets a (empty) result downstream.
pub fn decode_batch(payload: &[u8]) -> ClusterBatch {
    match serde_json::from_slice::<SegmentedClustersMessage>(payload) {
        Ok(message) => {
            ClusterBatch::from_decoded(message.clusters.into_iter().map(decode_cluster).collect())
        }
        Err(e) => {
            error!("Unreadable clusters message, treating it as empty: {}", e);
            ClusterBatch::empty()
        }
    }
}

/// Encodes clusters the way the segmentation stage sends them.
pub fn encode_clusters(clusters: &[RawCluster]) -> Result<Vec<u8>, serde_json::Error> {
    let message = OutgoingClustersMessage {
        clusters: clusters
            .iter()
            .map(|cluster| WireCluster {
                points: cluster.points().iter().map(WirePoint::from).collect(),
            })
            .collect(),
    };
    serde_json::to_vec(&message)
}
