//! Elliptical regions of interest
//!
//! A particle's hypothesized object location and size define an axis-aligned
//! rectangle and the elliptical mask inscribed in it. Everything here is a
//! pure function of its inputs; validity against frame bounds is the
//! caller's decision (out-of-bounds regions are rejected, never clipped,
//! because clipping would bias the appearance histogram toward background).

/// Axis-aligned rectangle in image pixel coordinates.
///
/// Coordinates are signed: a rectangle derived from a particle near the
/// image border may extend to negative positions, which
/// [`fits_within`](Roi::fits_within) reports as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Roi {
    /// Smallest rectangle enclosing the ellipse centered at `(cx, cy)` with
    /// half-axes `(ax, ay)`.
    pub fn around(cx: f32, cy: f32, ax: f32, ay: f32) -> Self {
        Self {
            x: (cx - ax).round() as i32,
            y: (cy - ay).round() as i32,
            width: (2.0 * ax).round() as i32,
            height: (2.0 * ay).round() as i32,
        }
    }

    /// True if the rectangle has positive area and lies entirely inside an
    /// image of `cols` x `rows` pixels.
    pub fn fits_within(&self, cols: usize, rows: usize) -> bool {
        self.width > 0
            && self.height > 0
            && self.x >= 0
            && self.y >= 0
            && (self.x + self.width) as usize <= cols
            && (self.y + self.height) as usize <= rows
    }
}

/// Binary mask of the ellipse inscribed in a [`Roi`], addressed by offsets
/// relative to the rectangle's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct EllipseMask {
    width: usize,
    height: usize,
    inside: Vec<bool>,
    count: usize,
}

impl EllipseMask {
    /// Rasterizes the inscribed ellipse of `roi` at pixel centers:
    /// a pixel is masked when `((px-cx)/ax)^2 + ((py-cy)/ay)^2 <= 1`.
    pub fn inscribed(roi: &Roi) -> Self {
        let width = roi.width.max(0) as usize;
        let height = roi.height.max(0) as usize;
        let ax = roi.width as f32 * 0.5;
        let ay = roi.height as f32 * 0.5;

        let mut inside = vec![false; width * height];
        let mut count = 0;
        for dy in 0..height {
            let ny = (dy as f32 + 0.5 - ay) / ay;
            for dx in 0..width {
                let nx = (dx as f32 + 0.5 - ax) / ax;
                if nx * nx + ny * ny <= 1.0 {
                    inside[dy * width + dx] = true;
                    count += 1;
                }
            }
        }
        Self {
            width,
            height,
            inside,
            count,
        }
    }

    /// True if the pixel at offset `(dx, dy)` from the rectangle's top-left
    /// corner lies inside the ellipse. Offsets beyond the rectangle are
    /// outside by definition.
    #[inline]
    pub fn contains(&self, dx: usize, dy: usize) -> bool {
        dx < self.width && dy < self.height && self.inside[dy * self.width + dx]
    }

    /// Number of masked pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Region of interest for an ellipse centered at `(cx, cy)` with half-axes
/// `(ax, ay)`: the enclosing rectangle and the inscribed elliptical mask.
pub fn compute_roi(cx: f32, cy: f32, ax: f32, ay: f32) -> (Roi, EllipseMask) {
    let roi = Roi::around(cx, cy, ax, ay);
    let mask = EllipseMask::inscribed(&roi);
    (roi, mask)
}
