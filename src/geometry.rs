//! Frame geometry shared by the analyzers.
//!
//! Bounding boxes are expressed in normalized frame coordinates: the origin
//! is the top-left corner and both axes run from 0 to 1. Pixel quantities
//! are derived through [`FrameGeometry`].

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in normalized frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (0..1)
    pub x: f64,
    /// Top edge (0..1)
    pub y: f64,
    /// Width as a fraction of frame width
    pub width: f64,
    /// Height as a fraction of frame height
    pub height: f64,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Box of the given size centred on `(cx, cy)`
    #[must_use]
    pub fn centered(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Area as a fraction of the frame; degenerate boxes have zero area
    #[must_use]
    pub fn area(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width * self.height
        }
    }

    /// True when the box has no positive, finite extent
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.x.is_finite() && self.y.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    /// Area of overlap with another box
    #[must_use]
    pub fn intersection_area(&self, other: &Self) -> f64 {
        if self.is_degenerate() || other.is_degenerate() {
            return 0.0;
        }
        let overlap_w = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let overlap_h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        overlap_w * overlap_h
    }
}

/// Pixel dimensions of the analysed camera frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width_px: f64,
    pub height_px: f64,
}

impl FrameGeometry {
    #[must_use]
    pub const fn new(width_px: f64, height_px: f64) -> Self {
        Self { width_px, height_px }
    }

    /// Height divided by width; 1 for degenerate frames
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        if self.width_px > 0.0 && self.height_px > 0.0 {
            self.height_px / self.width_px
        } else {
            1.0
        }
    }

    /// Box width in pixels
    #[must_use]
    pub fn width_px_of(&self, bbox: &BoundingBox) -> f64 {
        bbox.width * self.width_px
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        // Portrait 1080p preview
        Self::new(1080.0, 1920.0)
    }
}

/// 2-D landmark position in the detector's coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
