//! Transition (motion) model
//!
//! Constant-velocity kinematics with additive Gaussian process noise on
//! position and velocity, plus a depth-lookup correction: the predicted
//! image position is mapped into the depth frame and the sampled depth
//! replaces the particle's `z`, with `vz` estimated by finite difference.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::types::frame::ObservationFrame;
use crate::types::particle::Particle;

/// Trait for per-particle motion models.
///
/// Implementations must be pure per particle: the outcome for one particle
/// may depend only on that particle, the shared read-only frame and the
/// particle's own noise stream, so the set can be partitioned arbitrarily.
pub trait TransitionModel {
    /// Advances `particle` by `dt` seconds against the given frame pair.
    fn predict<R: Rng>(
        &self,
        particle: &mut Particle,
        dt: f32,
        frame: &ObservationFrame<'_>,
        rng: &mut R,
    );
}

/// Constant velocity in the image plane with a depth-frame correction.
///
/// ```text
/// x' = x + dt*vx + N(0, std_xy)     vx' = vx + N(0, std_vxy)
/// y' = y + dt*vy + N(0, std_xy)     vy' = vy + N(0, std_vxy)
/// z' = depth(x', y')                vz' = (z' - z) / dt
/// ```
///
/// When the mapped coordinate falls outside the depth frame, or the sensor
/// reports no depth there (sample 0), `z` and `vz` keep their previous
/// values.
#[derive(Debug, Clone)]
pub struct DepthAwareConstantVelocity {
    noise_xy: Normal<f32>,
    noise_vxy: Normal<f32>,
}

impl DepthAwareConstantVelocity {
    /// Creates the model from process-noise standard deviations.
    ///
    /// # Panics
    /// Panics if either std-dev is negative or non-finite.
    pub fn new(std_xy: f32, std_vxy: f32) -> Self {
        let noise_xy =
            Normal::new(0.0, std_xy).expect("Position noise std-dev must be finite and >= 0");
        let noise_vxy =
            Normal::new(0.0, std_vxy).expect("Velocity noise std-dev must be finite and >= 0");
        Self {
            noise_xy,
            noise_vxy,
        }
    }
}

impl TransitionModel for DepthAwareConstantVelocity {
    fn predict<R: Rng>(
        &self,
        particle: &mut Particle,
        dt: f32,
        frame: &ObservationFrame<'_>,
        rng: &mut R,
    ) {
        debug_assert!(dt > 0.0, "Time step dt must be positive");

        particle.x += dt * particle.vx + self.noise_xy.sample(rng);
        particle.y += dt * particle.vy + self.noise_xy.sample(rng);

        if let Some((row, col)) = frame.map_to_depth(particle.x, particle.y) {
            // sample() cannot miss after a successful mapping
            let depth = frame.depth.sample(row, col).unwrap_or(0);
            if depth != 0 {
                let old_z = particle.z;
                particle.z = depth as f32;
                particle.vz = (particle.z - old_z) / dt;
            }
        }

        particle.vx += self.noise_vxy.sample(rng);
        particle.vy += self.noise_vxy.sample(rng);
    }
}
