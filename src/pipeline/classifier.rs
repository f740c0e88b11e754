use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::common::Rgb;
use crate::error::ConfigError;

/// Running minimum start value, above any achievable squared distance.
const DISTANCE_SENTINEL: u32 = 3 * 255 * 255 + 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceColor {
    pub name: String,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub id: u32,
}

impl ReferenceColor {
    pub fn new(name: impl Into<String>, r: u8, g: u8, b: u8, id: u32) -> Self {
        Self {
            name: name.into(),
            r,
            g,
            b,
            id,
        }
    }

    pub fn color(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }
}

pub fn default_reference_colors() -> Vec<ReferenceColor> {
    vec![
        ReferenceColor::new("red", 130, 40, 40, 1),
        ReferenceColor::new("green", 0, 255, 0, 2),
        ReferenceColor::new("blue", 0, 0, 255, 3),
        ReferenceColor::new("black", 0, 0, 0, 4),
        ReferenceColor::new("white", 97, 105, 110, 5),
    ]
}

/// Id of the nearest reference color. Ties go to the entry that comes first,
/// so only a strictly smaller distance replaces the current choice.
pub fn classify(color: Rgb, colors: &[ReferenceColor]) -> Result<u32, ConfigError> {
    let mut min_dist = DISTANCE_SENTINEL;
    let mut chosen_id = None;

    for reference in colors {
        let distance = color.distance_squared(&reference.color());
        if distance < min_dist {
            min_dist = distance;
            chosen_id = Some(reference.id);
        }
    }

    chosen_id.ok_or(ConfigError::EmptyPalette)
}

/// Ordered, non-empty set of reference colors with distinct positive ids.
/// Order is the tie-break priority.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<ReferenceColor>,
}

impl Palette {
    pub fn new(colors: Vec<ReferenceColor>) -> Result<Self, ConfigError> {
        if colors.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }

        let mut seen = HashSet::with_capacity(colors.len());
        for color in &colors {
            if color.id == 0 {
                return Err(ConfigError::InvalidColorId {
                    name: color.name.clone(),
                });
            }
            if !seen.insert(color.id) {
                return Err(ConfigError::DuplicateColorId(color.id));
            }
        }

        Ok(Self { colors })
    }

    pub fn colors(&self) -> &[ReferenceColor] {
        &self.colors
    }

    pub fn classify(&self, color: Rgb) -> Result<u32, ConfigError> {
        classify(color, &self.colors)
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.colors
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    pub fn contains_id(&self, id: u32) -> bool {
        self.colors.iter().any(|c| c.id == id)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: default_reference_colors(),
        }
    }
}
