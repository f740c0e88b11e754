use crate::common::{Position, RawCluster, Rgb};
use crate::error::ClusterError;

/// Mean position and mean color of a cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterCentroid {
    pub position: Position,
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl ClusterCentroid {
    /// Mean color as integer channels, truncated toward zero.
    pub fn quantized_color(&self) -> Rgb {
        Rgb::new(self.r as u8, self.g as u8, self.b as u8)
    }
}

pub fn compute_centroid(cluster: &RawCluster) -> Result<ClusterCentroid, ClusterError> {
    if cluster.is_empty() {
        return Err(ClusterError::Empty);
    }

    let mut sum = [0f64; 6];
    for point in cluster.points() {
        sum[0] += point.position.x;
        sum[1] += point.position.y;
        sum[2] += point.position.z;
        sum[3] += point.color.r as f64;
        sum[4] += point.color.g as f64;
        sum[5] += point.color.b as f64;
    }

    let n = cluster.len() as f64;
    Ok(ClusterCentroid {
        position: Position::new(sum[0] / n, sum[1] / n, sum[2] / n),
        r: sum[3] / n,
        g: sum[4] / n,
        b: sum[5] / n,
    })
}
