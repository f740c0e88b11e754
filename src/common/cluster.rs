use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::point::ColoredPoint;
use crate::error::ClusterError;

/// Points believed to belong to one physical object. Order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCluster {
    points: Vec<ColoredPoint>,
}

impl RawCluster {
    pub fn new(points: Vec<ColoredPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ColoredPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<Vec<ColoredPoint>> for RawCluster {
    fn from(points: Vec<ColoredPoint>) -> Self {
        Self::new(points)
    }
}

/// One arrival from the segmentation stage.
///
/// Clusters that could not be decoded keep their slot as an error so that the
/// processor reports them in input order.
#[derive(Debug, Clone)]
pub struct ClusterBatch {
    id: Uuid,
    received_at: DateTime<Utc>,
    clusters: Vec<Result<RawCluster, ClusterError>>,
}

impl ClusterBatch {
    pub fn new(clusters: Vec<RawCluster>) -> Self {
        Self::from_decoded(clusters.into_iter().map(Ok).collect())
    }

    pub fn from_decoded(clusters: Vec<Result<RawCluster, ClusterError>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            clusters,
        }
    }

    pub fn empty() -> Self {
        Self::from_decoded(Vec::new())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn clusters(&self) -> &[Result<RawCluster, ClusterError>] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}
