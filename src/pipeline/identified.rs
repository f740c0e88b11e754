use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Pose;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedObject {
    pub timestamp: DateTime<Utc>,
    pub pose: Pose,
    pub object_id: u32,
}

/// Result for one input batch. `objects` may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedBatch {
    pub batch_id: Uuid,
    pub objects: Vec<IdentifiedObject>,
}

impl IdentifiedBatch {
    pub fn new(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            objects: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
