//! Color-appearance models
//!
//! A color model is a normalized 2-D histogram over the hue/saturation
//! plane of a masked image region, used as the appearance fingerprint of
//! the tracked object. Models are compared with the Bhattacharyya
//! distance, a bounded symmetric statistical distance in `[0, 1]`.

use crate::geometry::{EllipseMask, Roi};
use crate::types::frame::ColorFrame;

/// Histogram bins along the hue axis (hue spans 0..180).
pub const HUE_BINS: usize = 30;
/// Histogram bins along the saturation axis (saturation spans 0..256).
pub const SAT_BINS: usize = 32;

const HUE_RANGE: usize = 180;
const SAT_RANGE: usize = 256;

/// A normalized hue/saturation histogram; bin masses sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorModel {
    bins: Vec<f64>,
}

impl ColorModel {
    /// Builds the histogram of the masked pixels of `roi` inside `frame`
    /// and normalizes it to unit mass.
    ///
    /// Returns `None` when the mask selects no pixels, so a degenerate
    /// region can never divide by zero.
    ///
    /// # Panics
    /// Panics if `roi` does not fit inside the frame; callers validate the
    /// region with [`Roi::fits_within`] first.
    pub fn from_region(frame: &ColorFrame, roi: &Roi, mask: &EllipseMask) -> Option<Self> {
        if mask.is_empty() {
            return None;
        }
        assert!(
            roi.fits_within(frame.cols(), frame.rows()),
            "ROI must lie inside the frame"
        );

        let mut bins = vec![0.0_f64; HUE_BINS * SAT_BINS];
        for dy in 0..roi.height as usize {
            for dx in 0..roi.width as usize {
                if !mask.contains(dx, dy) {
                    continue;
                }
                let pixel = frame.at(roi.y as usize + dy, roi.x as usize + dx);
                bins[Self::bin_index(pixel.h, pixel.s)] += 1.0;
            }
        }

        let total = mask.len() as f64;
        for bin in &mut bins {
            *bin /= total;
        }
        Some(Self { bins })
    }

    /// Builds a model directly from bin masses, normalizing to unit mass.
    ///
    /// Returns `None` if the masses are non-finite, negative or sum to
    /// zero. Intended for external initialization sources that supply a
    /// ready-made appearance template.
    pub fn from_bins(bins: Vec<f64>) -> Option<Self> {
        if bins.len() != HUE_BINS * SAT_BINS {
            return None;
        }
        let total: f64 = bins.iter().sum();
        if !total.is_finite() || total <= 0.0 || bins.iter().any(|&b| b < 0.0) {
            return None;
        }
        let bins = bins.into_iter().map(|b| b / total).collect();
        Some(Self { bins })
    }

    /// Bhattacharyya distance to another model: 0 for identical
    /// distributions, 1 for disjoint support. Symmetric.
    pub fn bhattacharyya(&self, other: &Self) -> f64 {
        let coefficient: f64 = self
            .bins
            .iter()
            .zip(other.bins.iter())
            .map(|(p, q)| (p * q).sqrt())
            .sum();
        // Rounding can push the coefficient epsilon past 1
        (1.0 - coefficient.min(1.0)).sqrt()
    }

    /// True if the histogram mass is not a finite positive quantity.
    pub fn is_degenerate(&self) -> bool {
        let total: f64 = self.bins.iter().sum();
        !total.is_finite() || total <= 0.0
    }

    #[inline]
    fn bin_index(h: u8, s: u8) -> usize {
        let hue_bin = (h as usize * HUE_BINS / HUE_RANGE).min(HUE_BINS - 1);
        let sat_bin = s as usize * SAT_BINS / SAT_RANGE;
        hue_bin * SAT_BINS + sat_bin
    }
}
