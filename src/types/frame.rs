//! Observation frame buffers
//!
//! A cycle's input is a paired color image and depth image of matching
//! timestamp. The frames are owned by the external frame source; the filter
//! borrows them through [`ObservationFrame`] for one update cycle only.

use nalgebra::DMatrix;

/// One pixel in hue/saturation/value color space.
///
/// Hue follows the 0..180 convention of the upstream capture pipeline,
/// saturation and value span the full 0..256 byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// A color image in HSV space, row-major `(row, col)` addressed.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorFrame {
    data: DMatrix<Hsv>,
}

impl ColorFrame {
    /// Builds a frame by evaluating `f(row, col)` for every pixel.
    pub fn from_fn<F: FnMut(usize, usize) -> Hsv>(rows: usize, cols: usize, f: F) -> Self {
        Self {
            data: DMatrix::from_fn(rows, cols, f),
        }
    }

    /// Builds a frame filled with a single color.
    pub fn uniform(rows: usize, cols: usize, pixel: Hsv) -> Self {
        Self {
            data: DMatrix::from_element(rows, cols, pixel),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Pixel at `(row, col)`.
    ///
    /// # Panics
    /// Panics if the coordinate is out of bounds.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> Hsv {
        self.data[(row, col)]
    }
}

/// A depth image in millimetres; a sample of 0 means "no depth available".
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    data: DMatrix<u16>,
}

impl DepthFrame {
    /// Builds a frame by evaluating `f(row, col)` for every pixel.
    pub fn from_fn<F: FnMut(usize, usize) -> u16>(rows: usize, cols: usize, f: F) -> Self {
        Self {
            data: DMatrix::from_fn(rows, cols, f),
        }
    }

    /// Builds a frame filled with a constant depth.
    pub fn uniform(rows: usize, cols: usize, depth: u16) -> Self {
        Self {
            data: DMatrix::from_element(rows, cols, depth),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Bounds-checked sample at `(row, col)`; `None` outside the frame.
    #[inline]
    pub fn sample(&self, row: usize, col: usize) -> Option<u16> {
        self.data.get((row, col)).copied()
    }
}

/// A borrowed color/depth frame pair of matching timestamp.
///
/// The two images may have different resolutions; a pre-registered pixel
/// correspondence is assumed, so color coordinates map to depth coordinates
/// by the resolution ratio alone.
#[derive(Debug, Clone, Copy)]
pub struct ObservationFrame<'a> {
    pub color: &'a ColorFrame,
    pub depth: &'a DepthFrame,
}

impl<'a> ObservationFrame<'a> {
    pub fn new(color: &'a ColorFrame, depth: &'a DepthFrame) -> Self {
        Self { color, depth }
    }

    /// Maps a color-image position to the nearest depth-image pixel.
    ///
    /// Returns `None` when the mapped coordinate is non-finite or falls
    /// outside the depth frame; callers must keep their previous depth in
    /// that case instead of reading out of bounds.
    pub fn map_to_depth(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let col = (x * self.depth.cols() as f32 / self.color.cols() as f32).round();
        let row = (y * self.depth.rows() as f32 / self.color.rows() as f32).round();

        if !(col.is_finite() && row.is_finite()) {
            return None;
        }
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.depth.cols() || row >= self.depth.rows() {
            return None;
        }
        Some((row, col))
    }
}
