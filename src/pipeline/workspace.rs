use serde::{Deserialize, Serialize};

use crate::common::Position;
use crate::error::ConfigError;

/// Axis-aligned rectangle on the horizontal plane. `y_left` is the upper y
/// bound and `y_right` the lower one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceBounds {
    pub x_lo: f64,
    pub x_up: f64,
    pub y_left: f64,
    pub y_right: f64,
}

impl Default for WorkspaceBounds {
    fn default() -> Self {
        Self {
            x_lo: 0.20,
            x_up: 0.75,
            y_left: 0.10,
            y_right: -0.40,
        }
    }
}

impl WorkspaceBounds {
    pub fn new(x_lo: f64, x_up: f64, y_left: f64, y_right: f64) -> Result<Self, ConfigError> {
        let bounds = Self {
            x_lo,
            x_up,
            y_left,
            y_right,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [self.x_lo, self.x_up, self.y_left, self.y_right]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.x_lo >= self.x_up || self.y_right >= self.y_left {
            return Err(ConfigError::InvalidBounds {
                x_lo: self.x_lo,
                x_up: self.x_up,
                y_left: self.y_left,
                y_right: self.y_right,
            });
        }
        Ok(())
    }

    pub fn contains(&self, position: &Position) -> bool {
        is_inside(position, self)
    }
}

/// Strict on both axes: a point lying on any bound is outside. z is not tested.
pub fn is_inside(position: &Position, bounds: &WorkspaceBounds) -> bool {
    bounds.x_lo < position.x
        && position.x < bounds.x_up
        && bounds.y_right < position.y
        && position.y < bounds.y_left
}
