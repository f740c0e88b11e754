use serde::{Deserialize, Serialize};

/// Position in meters, in the sensor's reference frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpacks the standard packed-RGB point field: red in bits 16-23, green in
    /// bits 8-15, blue in bits 0-7. The top byte (alpha or padding) is ignored.
    pub const fn from_packed(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    pub const fn packed(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }

    /// Squared Euclidean distance in RGB space. At most 3 * 255^2.
    pub fn distance_squared(&self, other: &Rgb) -> u32 {
        let dr = self.r.abs_diff(other.r) as u32;
        let dg = self.g.abs_diff(other.g) as u32;
        let db = self.b.abs_diff(other.b) as u32;
        dr * dr + dg * dg + db * db
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint {
    pub position: Position,
    pub color: Rgb,
}

impl ColoredPoint {
    pub fn new(x: f64, y: f64, z: f64, color: Rgb) -> Self {
        Self {
            position: Position::new(x, y, z),
            color,
        }
    }

    pub fn from_packed(x: f64, y: f64, z: f64, rgb: u32) -> Self {
        Self::new(x, y, z, Rgb::from_packed(rgb))
    }
}
