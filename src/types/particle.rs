//! Particle state records
//!
//! One particle is one hypothesis of the tracked object's state. Particles
//! are plain value types stored in a contiguous buffer owned by the filter
//! core, so the transition and weighting stages can mutate disjoint index
//! ranges without aliasing.

/// One hypothesis of target state.
///
/// Position `(x, y)` is in color-image pixel coordinates, `z` is the depth
/// sample in millimetres (0 means "no depth available", the sensor's own
/// invalid-sample convention). `(ax, ay)` are the pixel half-axes of the
/// tracked ellipse and stay non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    /// Ellipse half-axis along x (pixels)
    pub ax: f32,
    /// Ellipse half-axis along y (pixels)
    pub ay: f32,
    /// Unnormalized log-importance-weight, additive across evidence updates
    pub log_w: f64,
}

impl Particle {
    /// Creates a particle at rest with unit weight (`log_w = 0`).
    pub fn at(x: f32, y: f32, z: f32, ax: f32, ay: f32) -> Self {
        Self {
            x,
            y,
            z,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            ax,
            ay,
            log_w: 0.0,
        }
    }

    /// Linear importance weight, `exp(log_w)`.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.log_w.exp()
    }

    /// True if every kinematic component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
            && self.vx.is_finite()
            && self.vy.is_finite()
            && self.vz.is_finite()
    }
}
