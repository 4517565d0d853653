//! Weighting (appearance likelihood) model
//!
//! Each particle is scored by comparing the color histogram of its
//! elliptical region of interest against the reference model. Scores enter
//! the particle's importance weight additively in the log domain.

use crate::color::ColorModel;
use crate::geometry::compute_roi;
use crate::types::frame::ObservationFrame;
use crate::types::particle::Particle;

/// How a particle's region behaved during weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightOutcome {
    /// ROI was valid and the histogram comparison produced the score
    Scored,
    /// ROI fell outside the frame or had non-positive area
    InvalidRoi,
    /// ROI was valid but the mask selected no pixels
    DegenerateHistogram,
}

/// Trait for per-particle appearance scoring.
///
/// Implementations must be pure per particle given the shared read-only
/// frame and reference model, so the set can be partitioned arbitrarily.
pub trait WeightingModel {
    /// Scores `particle` against `reference`, accumulating into its
    /// log-weight, and reports how the region behaved.
    fn weight(
        &self,
        particle: &mut Particle,
        frame: &ObservationFrame<'_>,
        reference: &ColorModel,
    ) -> WeightOutcome;
}

/// Bhattacharyya similarity between the particle's region histogram and
/// the reference model.
///
/// The accumulated increment is `ln(score)` with
/// `score = 1 - bhattacharyya_distance` clamped to `[floor, 1]`, so a
/// perfect match contributes 0 and a total mismatch contributes
/// `ln(floor)`. A particle whose region cannot be evaluated at all
/// (outside the frame, or empty mask) receives `ln(floor)` directly:
/// "certainly wrong", never a crash. Regions partially outside the frame
/// are rejected rather than clipped, since a clipped histogram would be
/// biased toward whatever background remains visible.
#[derive(Debug, Clone, Copy)]
pub struct ColorWeighting {
    score_floor: f64,
}

impl ColorWeighting {
    /// Creates the model with the given score floor.
    ///
    /// # Panics
    /// Panics if `score_floor` lies outside `(0, 1]`.
    pub fn new(score_floor: f64) -> Self {
        assert!(
            score_floor > 0.0 && score_floor <= 1.0,
            "Score floor must lie in (0, 1]"
        );
        Self { score_floor }
    }

    /// Log-weight increment assigned to unevaluable particles.
    #[inline]
    pub fn min_log_increment(&self) -> f64 {
        self.score_floor.ln()
    }
}

impl WeightingModel for ColorWeighting {
    fn weight(
        &self,
        particle: &mut Particle,
        frame: &ObservationFrame<'_>,
        reference: &ColorModel,
    ) -> WeightOutcome {
        let (roi, mask) = compute_roi(particle.x, particle.y, particle.ax, particle.ay);
        if !roi.fits_within(frame.color.cols(), frame.color.rows()) {
            particle.log_w += self.min_log_increment();
            return WeightOutcome::InvalidRoi;
        }

        match ColorModel::from_region(frame.color, &roi, &mask) {
            Some(candidate) => {
                let score = (1.0 - reference.bhattacharyya(&candidate))
                    .clamp(self.score_floor, 1.0);
                particle.log_w += score.ln();
                WeightOutcome::Scored
            }
            None => {
                particle.log_w += self.min_log_increment();
                WeightOutcome::DegenerateHistogram
            }
        }
    }
}
