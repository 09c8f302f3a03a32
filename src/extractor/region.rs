//! Region structure for defining extraction area
//!
//! This module defines the Region structure that specifies a rectangular
//! area of an image for extraction, plus optional subsampling strides. The
//! coordinates are in pixels and follow the typical image coordinate system
//! where (0,0) is the top-left corner of the image.

use std::fmt;

use crate::tiff::errors::{TiffError, TiffResult};

/// Region for image extraction (in pixel coordinates)
///
/// Represents a rectangular area defined by its top-left corner coordinates
/// and dimensions. `x_step`/`y_step` keep every n-th column/row, starting
/// with the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// X-coordinate of the top-left corner (pixels from left)
    pub x: u64,

    /// Y-coordinate of the top-left corner (pixels from top)
    pub y: u64,

    /// Width of the region in pixels
    pub width: u64,

    /// Height of the region in pixels
    pub height: u64,

    /// Horizontal subsampling stride (>= 1)
    pub x_step: u64,

    /// Vertical subsampling stride (>= 1)
    pub y_step: u64,
}

impl Region {
    /// Create a new region without subsampling
    ///
    /// # Arguments
    /// * `x` - X-coordinate of the top-left corner
    /// * `y` - Y-coordinate of the top-left corner
    /// * `width` - Width of the region in pixels
    /// * `height` - Height of the region in pixels
    pub fn new(x: u64, y: u64, width: u64, height: u64) -> Self {
        Region { x, y, width, height, x_step: 1, y_step: 1 }
    }

    /// The whole image
    pub fn full(width: u64, height: u64) -> Self {
        Region::new(0, 0, width, height)
    }

    /// Returns this region with the given subsampling strides
    pub fn with_step(mut self, x_step: u64, y_step: u64) -> Self {
        self.x_step = x_step;
        self.y_step = y_step;
        self
    }

    /// Get the rightmost X coordinate (exclusive)
    pub fn end_x(&self) -> u64 {
        self.x + self.width
    }

    /// Get the bottommost Y coordinate (exclusive)
    pub fn end_y(&self) -> u64 {
        self.y + self.height
    }

    /// Width of the subsampled result
    pub fn dest_width(&self) -> u64 {
        self.width.div_ceil(self.x_step.max(1))
    }

    /// Height of the subsampled result
    pub fn dest_height(&self) -> u64 {
        self.height.div_ceil(self.y_step.max(1))
    }

    /// Checks the region is non-empty, has valid strides and lies inside the image
    pub fn validate(&self, image_width: u64, image_height: u64) -> TiffResult<()> {
        if self.x_step == 0 || self.y_step == 0 {
            return Err(TiffError::IndexOutOfRange(format!(
                "subsampling step {}x{} must be at least 1",
                self.x_step, self.y_step
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(TiffError::IndexOutOfRange(format!("empty region {}", self)));
        }

        let inside = self
            .x
            .checked_add(self.width)
            .zip(self.y.checked_add(self.height))
            .map(|(end_x, end_y)| end_x <= image_width && end_y <= image_height)
            .unwrap_or(false);
        if !inside {
            return Err(TiffError::IndexOutOfRange(format!(
                "region {} outside image {}x{}",
                self, image_width, image_height
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)?;
        if self.x_step != 1 || self.y_step != 1 {
            write!(f, " step {}x{}", self.x_step, self.y_step)?;
        }
        Ok(())
    }
}
