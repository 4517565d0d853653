//! Particle filter core
//!
//! Owns the particle set and orchestrates the per-frame cycle: a parallel
//! transition phase, a parallel weighting phase, then the effective sample
//! size. Resampling itself is the caller's machinery; the core only
//! exposes the weights/ESS it needs and accepts the replacement set
//! through [`ParticleFilter::replace_particles`].

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::color::ColorModel;
use crate::config::FilterConfig;
use crate::models::transition::{DepthAwareConstantVelocity, TransitionModel};
use crate::models::weighting::{ColorWeighting, WeightOutcome, WeightingModel};
use crate::parallel::Partitioner;
use crate::types::frame::{DepthFrame, ObservationFrame};
use crate::types::particle::Particle;
use crate::{Result, TrackError};

// ============================================================================
// Initialization Priors
// ============================================================================

/// Gaussian priors for drawing the initial particle set, each component as
/// a `(mean, std_dev)` pair in color-image pixel / millimetre units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitPriors {
    pub x: (f32, f32),
    pub y: (f32, f32),
    pub z: (f32, f32),
    pub vx: (f32, f32),
    pub vy: (f32, f32),
    pub vz: (f32, f32),
    /// Fixed ellipse half-axes `(ax, ay)` assigned to every particle
    pub semiaxes: (f32, f32),
}

impl InitPriors {
    /// Priors for a target detected at `(x, y)` with positional spread
    /// `spread` and the given half-axes; depth and velocities start at
    /// zero with no spread.
    pub fn detected_at(x: f32, y: f32, spread: f32, semiaxes: (f32, f32)) -> Self {
        Self {
            x: (x, spread),
            y: (y, spread),
            z: (0.0, 0.0),
            vx: (0.0, 0.0),
            vy: (0.0, 0.0),
            vz: (0.0, 0.0),
            semiaxes,
        }
    }

    fn validate(&self) -> Result<()> {
        let pairs = [self.x, self.y, self.z, self.vx, self.vy, self.vz];
        for (mean, std) in pairs {
            if !mean.is_finite() || !std.is_finite() || std < 0.0 {
                return Err(TrackError::InvalidConfiguration(
                    "prior mean/std-dev pairs must be finite with non-negative spread",
                ));
            }
        }
        let (ax, ay) = self.semiaxes;
        if !(ax.is_finite() && ay.is_finite() && ax > 0.0 && ay > 0.0) {
            return Err(TrackError::InvalidConfiguration(
                "object half-axes must be positive",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Cycle Output
// ============================================================================

/// Statistics from one update cycle, reporting per-particle degeneracies
/// that were absorbed locally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleStats {
    /// Effective sample size of the weighted set, in `[1, M]`
    pub ess: f64,
    /// Particles whose ROI fell outside the frame or had no area
    pub invalid_roi_count: usize,
    /// Particles whose mask selected no pixels
    pub degenerate_histogram_count: usize,
}

impl CycleStats {
    /// Returns true if any particle region could not be evaluated.
    pub fn has_issues(&self) -> bool {
        self.invalid_roi_count > 0 || self.degenerate_histogram_count > 0
    }
}

/// Weight-normalized mean of the particle set's kinematic state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEstimate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
}

// ============================================================================
// Particle Filter
// ============================================================================

/// Single-target particle filter composed from a transition model and a
/// weighting model, selected at construction.
///
/// Lifecycle: construct, [`initialize`](Self::initialize) (Ready), then one
/// [`step`](Self::step) per frame with external resampling in between;
/// [`close`](Self::close) releases the particle set. `initialize` may be
/// called again at any point for a full reset, e.g. after re-acquiring a
/// lost target.
#[derive(Debug, Clone)]
pub struct ParticleFilter<T, W> {
    config: FilterConfig,
    transition: T,
    weighting: W,
    partitioner: Partitioner,
    particles: Vec<Particle>,
    reference: Option<ColorModel>,
    cycle: u64,
    last_ess: Option<f64>,
}

impl ParticleFilter<DepthAwareConstantVelocity, ColorWeighting> {
    /// Builds the filter with the standard model pair, wired from the
    /// configuration's noise parameters and score floor.
    pub fn from_config(config: FilterConfig) -> Result<Self> {
        config.validate()?;
        let transition = DepthAwareConstantVelocity::new(config.std_xy, config.std_vxy);
        let weighting = ColorWeighting::new(config.score_floor);
        Self::new(config, transition, weighting)
    }
}

impl<T: TransitionModel + Sync, W: WeightingModel + Sync> ParticleFilter<T, W> {
    /// Creates an uninitialized filter from a configuration and the two
    /// concrete models.
    pub fn new(config: FilterConfig, transition: T, weighting: W) -> Result<Self> {
        config.validate()?;
        let partitioner = Partitioner::new(config.partitions);
        Ok(Self {
            config,
            transition,
            weighting,
            partitioner,
            particles: Vec::new(),
            reference: None,
            cycle: 0,
            last_ess: None,
        })
    }

    /// Draws a fresh particle set of `config.particles` particles from the
    /// priors and installs the reference appearance model, resetting every
    /// log-weight to 0.
    ///
    /// When `depth` is given, each particle's `z` is seeded from the depth
    /// sample at its drawn position (with `vz = 0`); positions without a
    /// valid sample fall back to the Gaussian depth prior. The depth frame
    /// is indexed at the drawn pixel directly, so priors must be expressed
    /// at the depth frame's resolution when the two cameras differ.
    pub fn initialize(
        &mut self,
        priors: &InitPriors,
        reference: ColorModel,
        depth: Option<&DepthFrame>,
    ) -> Result<()> {
        self.config.validate()?;
        priors.validate()?;
        if reference.is_degenerate() {
            return Err(TrackError::DegenerateModel);
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let (ax, ay) = priors.semiaxes;

        let mut particles = Vec::with_capacity(self.config.particles);
        for _ in 0..self.config.particles {
            let x = draw(&mut rng, priors.x);
            let y = draw(&mut rng, priors.y);
            let vx = draw(&mut rng, priors.vx);
            let vy = draw(&mut rng, priors.vy);

            let seeded = depth.and_then(|d| {
                let (col, row) = (x.round(), y.round());
                if col < 0.0 || row < 0.0 || !col.is_finite() || !row.is_finite() {
                    return None;
                }
                match d.sample(row as usize, col as usize) {
                    Some(sample) if sample != 0 => Some(sample as f32),
                    _ => None,
                }
            });
            let (z, vz) = match seeded {
                Some(z) => (z, 0.0),
                None => (draw(&mut rng, priors.z), draw(&mut rng, priors.vz)),
            };

            particles.push(Particle {
                x,
                y,
                z,
                vx,
                vy,
                vz,
                ax,
                ay,
                log_w: 0.0,
            });
        }

        self.particles = particles;
        self.reference = Some(reference);
        self.cycle = 0;
        self.last_ess = None;
        debug!(
            "initialized {} particles around ({:.1}, {:.1})",
            self.config.particles, priors.x.0, priors.y.0
        );
        Ok(())
    }

    /// Runs one update cycle: transition phase, weighting phase, ESS.
    ///
    /// The two phases are strictly ordered; within each phase the particle
    /// set is split into contiguous ranges and evaluated in parallel.
    /// Per-particle degeneracies (bad ROI, empty mask) are absorbed into
    /// the returned [`CycleStats`]; a set-wide weight degeneracy aborts the
    /// cycle with [`TrackError::DegenerateWeights`].
    pub fn step(&mut self, dt: f32, frame: &ObservationFrame<'_>) -> Result<CycleStats> {
        if self.particles.is_empty() {
            return Err(TrackError::Uninitialized);
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(TrackError::InvalidConfiguration(
                "time step must be positive and finite",
            ));
        }
        let reference = self.reference.as_ref().ok_or(TrackError::Uninitialized)?;
        self.cycle += 1;

        let seed = self.config.seed;
        let cycle = self.cycle;
        let transition = &self.transition;
        self.partitioner
            .for_each_indexed(&mut self.particles, |index, particle| {
                let mut rng = StdRng::seed_from_u64(particle_seed(seed, cycle, index));
                transition.predict(particle, dt, frame, &mut rng);
            });

        let invalid_roi = AtomicUsize::new(0);
        let degenerate_histogram = AtomicUsize::new(0);
        let weighting = &self.weighting;
        self.partitioner
            .for_each_indexed(&mut self.particles, |_, particle| {
                match weighting.weight(particle, frame, reference) {
                    WeightOutcome::Scored => {}
                    WeightOutcome::InvalidRoi => {
                        invalid_roi.fetch_add(1, Ordering::Relaxed);
                    }
                    WeightOutcome::DegenerateHistogram => {
                        degenerate_histogram.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });

        let ess = self.effective_sample_size()?;
        self.last_ess = Some(ess);

        let stats = CycleStats {
            ess,
            invalid_roi_count: invalid_roi.into_inner(),
            degenerate_histogram_count: degenerate_histogram.into_inner(),
        };
        debug!(
            "cycle {}: ess {:.1}/{}, {} invalid ROIs, {} empty masks",
            self.cycle,
            stats.ess,
            self.config.particles,
            stats.invalid_roi_count,
            stats.degenerate_histogram_count
        );
        self.trace_particles();
        Ok(stats)
    }

    /// Effective sample size `(sum w)^2 / sum w^2` of the current weights,
    /// computed max-shifted in the log domain for numerical stability.
    pub fn effective_sample_size(&self) -> Result<f64> {
        if self.particles.is_empty() {
            return Err(TrackError::Uninitialized);
        }
        let max_log_w = self
            .particles
            .iter()
            .map(|p| p.log_w)
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_log_w.is_finite() {
            return Err(TrackError::DegenerateWeights { cycle: self.cycle });
        }

        let sum = self
            .partitioner
            .sum_by(&self.particles, |p| (p.log_w - max_log_w).exp());
        let sum_sq = self
            .partitioner
            .sum_by(&self.particles, |p| (2.0 * (p.log_w - max_log_w)).exp());
        if !sum.is_finite() || !sum_sq.is_finite() || sum <= 0.0 || sum_sq <= 0.0 {
            return Err(TrackError::DegenerateWeights { cycle: self.cycle });
        }
        Ok(sum * sum / sum_sq)
    }

    /// Weight-normalized mean of position and velocity across the set.
    pub fn mean_state(&self) -> Result<StateEstimate> {
        if self.particles.is_empty() {
            return Err(TrackError::Uninitialized);
        }
        let max_log_w = self
            .particles
            .iter()
            .map(|p| p.log_w)
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_log_w.is_finite() {
            return Err(TrackError::DegenerateWeights { cycle: self.cycle });
        }
        let total = self
            .partitioner
            .sum_by(&self.particles, |p| (p.log_w - max_log_w).exp());
        if !total.is_finite() || total <= 0.0 {
            return Err(TrackError::DegenerateWeights { cycle: self.cycle });
        }

        let mut mean = StateEstimate {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
        };
        for particle in &self.particles {
            let w = ((particle.log_w - max_log_w).exp() / total) as f32;
            mean.x += w * particle.x;
            mean.y += w * particle.y;
            mean.z += w * particle.z;
            mean.vx += w * particle.vx;
            mean.vy += w * particle.vy;
            mean.vz += w * particle.vz;
        }
        Ok(mean)
    }

    /// Installs the particle set produced by the external resampler.
    ///
    /// The new set must keep the configured count M; its log-weights are
    /// reset to 0, since resampling re-equalizes the importance weights.
    /// No index continuity with the previous set is assumed.
    pub fn replace_particles(&mut self, mut particles: Vec<Particle>) -> Result<()> {
        if self.reference.is_none() {
            return Err(TrackError::Uninitialized);
        }
        if particles.len() != self.config.particles {
            return Err(TrackError::InvalidConfiguration(
                "resampled set must keep the configured particle count",
            ));
        }
        for particle in &mut particles {
            particle.log_w = 0.0;
        }
        self.particles = particles;
        Ok(())
    }

    /// Replaces the configuration, dropping the current particle set and
    /// reference model; the filter must be initialized again afterwards.
    pub fn reconfigure(&mut self, config: FilterConfig) -> Result<()> {
        config.validate()?;
        self.partitioner = Partitioner::new(config.partitions);
        self.config = config;
        self.close();
        Ok(())
    }

    /// Releases the particle set and reference model. A closed filter
    /// reports [`TrackError::Uninitialized`] until initialized again.
    pub fn close(&mut self) {
        self.particles = Vec::new();
        self.reference = None;
        self.last_ess = None;
        self.cycle = 0;
    }

    /// Read-only snapshot of the current particle set.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// ESS of the most recent cycle, if any completed since initialization.
    pub fn ess(&self) -> Option<f64> {
        self.last_ess
    }

    /// Number of completed update cycles since initialization.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.reference.is_some() && !self.particles.is_empty()
    }

    /// The installed reference appearance model, if any.
    pub fn reference_model(&self) -> Option<&ColorModel> {
        self.reference.as_ref()
    }

    fn trace_particles(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        for (i, p) in self.particles.iter().enumerate() {
            trace!(
                "particle {}: pos ({:.1}, {:.1}, {:.0}) vel ({:.1}, {:.1}, {:.1}) log_w {:.3}",
                i, p.x, p.y, p.z, p.vx, p.vy, p.vz, p.log_w
            );
        }
    }
}

/// Seed for one particle's noise stream in one cycle. Depends only on the
/// base seed, the cycle and the particle index, never on the partitioning,
/// so sequential and parallel evaluation draw identical noise.
fn particle_seed(base: u64, cycle: u64, index: usize) -> u64 {
    base ^ cycle.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64).wrapping_mul(0xD1B5_4A32_D192_ED03)
}

/// One Gaussian draw from a `(mean, std_dev)` pair.
fn draw<R: Rng>(rng: &mut R, (mean, std): (f32, f32)) -> f32 {
    if std == 0.0 {
        mean
    } else {
        let n: f32 = rng.sample(StandardNormal);
        mean + std * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::frame::{ColorFrame, Hsv};

    const RED: Hsv = Hsv { h: 0, s: 220, v: 200 };

    fn zero_noise_config(particles: usize) -> FilterConfig {
        FilterConfig {
            particles,
            std_xy: 0.0,
            std_vxy: 0.0,
            score_floor: 1e-12,
            partitions: 2,
            seed: 7,
        }
    }

    fn red_reference() -> ColorModel {
        let frame = ColorFrame::uniform(80, 80, RED);
        let (roi, mask) = crate::geometry::compute_roi(40.0, 40.0, 12.0, 12.0);
        ColorModel::from_region(&frame, &roi, &mask).unwrap()
    }

    fn ready_filter(
        particles: usize,
    ) -> ParticleFilter<DepthAwareConstantVelocity, ColorWeighting> {
        let mut filter = ParticleFilter::from_config(zero_noise_config(particles)).unwrap();
        let priors = InitPriors::detected_at(40.0, 40.0, 0.0, (12.0, 12.0));
        filter.initialize(&priors, red_reference(), None).unwrap();
        filter
    }

    #[test]
    fn test_uninitialized_filter_rejects_operations() {
        let mut filter = ParticleFilter::from_config(zero_noise_config(4)).unwrap();
        let color = ColorFrame::uniform(80, 80, RED);
        let depth = DepthFrame::uniform(80, 80, 1000);
        let frame = ObservationFrame::new(&color, &depth);

        assert_eq!(filter.step(1.0, &frame), Err(TrackError::Uninitialized));
        assert_eq!(filter.mean_state(), Err(TrackError::Uninitialized));
        assert!(!filter.is_initialized());
    }

    #[test]
    fn test_initialize_draws_configured_count() {
        let filter = ready_filter(16);
        assert_eq!(filter.particles().len(), 16);
        assert!(filter.particles().iter().all(|p| p.log_w == 0.0));
        assert!(filter.is_initialized());
    }

    #[test]
    fn test_initialize_seeds_depth_from_frame() {
        let mut filter = ParticleFilter::from_config(zero_noise_config(8)).unwrap();
        let priors = InitPriors::detected_at(40.0, 40.0, 0.0, (12.0, 12.0));
        let depth = DepthFrame::uniform(80, 80, 1234);
        filter
            .initialize(&priors, red_reference(), Some(&depth))
            .unwrap();

        for p in filter.particles() {
            assert!((p.z - 1234.0).abs() < 1e-6);
            assert_eq!(p.vz, 0.0);
        }
    }

    #[test]
    fn test_initialize_rejects_bad_priors() {
        let mut filter = ParticleFilter::from_config(zero_noise_config(8)).unwrap();
        let mut priors = InitPriors::detected_at(40.0, 40.0, 0.0, (0.0, 12.0));
        assert!(matches!(
            filter.initialize(&priors, red_reference(), None),
            Err(TrackError::InvalidConfiguration(_))
        ));

        priors.semiaxes = (12.0, 12.0);
        priors.x = (40.0, -1.0);
        assert!(filter.initialize(&priors, red_reference(), None).is_err());
    }

    #[test]
    fn test_equal_weights_give_full_ess() {
        let filter = ready_filter(10);
        let ess = filter.effective_sample_size().unwrap();
        assert!((ess - 10.0).abs() < 1e-9, "ess {}", ess);
    }

    #[test]
    fn test_concentrated_weight_gives_unit_ess() {
        let mut filter = ready_filter(10);
        for p in &mut filter.particles {
            p.log_w = -1.0e4;
        }
        filter.particles[3].log_w = 0.0;

        let ess = filter.effective_sample_size().unwrap();
        assert!((ess - 1.0).abs() < 1e-9, "ess {}", ess);
    }

    #[test]
    fn test_ess_bounds_for_mixed_weights() {
        let mut filter = ready_filter(8);
        for (i, p) in filter.particles.iter_mut().enumerate() {
            p.log_w = -(i as f64) * 0.5;
        }
        let ess = filter.effective_sample_size().unwrap();
        assert!(ess >= 1.0 && ess <= 8.0, "ess {}", ess);
    }

    #[test]
    fn test_all_zero_weights_degenerate() {
        let mut filter = ready_filter(4);
        for p in &mut filter.particles {
            p.log_w = f64::NEG_INFINITY;
        }
        assert!(matches!(
            filter.effective_sample_size(),
            Err(TrackError::DegenerateWeights { .. })
        ));
        assert!(matches!(
            filter.mean_state(),
            Err(TrackError::DegenerateWeights { .. })
        ));
    }

    #[test]
    fn test_nan_weight_degenerate() {
        let mut filter = ready_filter(4);
        filter.particles[2].log_w = f64::NAN;
        assert!(matches!(
            filter.effective_sample_size(),
            Err(TrackError::DegenerateWeights { .. })
        ));
    }

    #[test]
    fn test_mean_state_weighted_average() {
        let mut filter = ready_filter(2);
        filter.particles[0].x = 10.0;
        filter.particles[1].x = 30.0;
        // Weight ratio 3:1
        filter.particles[0].log_w = (3.0_f64).ln();
        filter.particles[1].log_w = 0.0;

        let mean = filter.mean_state().unwrap();
        assert!((mean.x - 15.0).abs() < 1e-4, "mean.x {}", mean.x);
    }

    #[test]
    fn test_replace_particles_resets_weights() {
        let mut filter = ready_filter(4);
        let mut resampled: Vec<Particle> = filter.particles().to_vec();
        for p in &mut resampled {
            p.log_w = -5.0;
        }
        filter.replace_particles(resampled).unwrap();
        assert!(filter.particles().iter().all(|p| p.log_w == 0.0));
    }

    #[test]
    fn test_replace_particles_enforces_count() {
        let mut filter = ready_filter(4);
        let short = filter.particles()[..2].to_vec();
        assert!(matches!(
            filter.replace_particles(short),
            Err(TrackError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_close_releases_set() {
        let mut filter = ready_filter(4);
        filter.close();
        assert!(!filter.is_initialized());
        assert_eq!(filter.mean_state(), Err(TrackError::Uninitialized));
    }

    #[test]
    fn test_reinitialize_with_different_count() {
        let mut filter = ready_filter(4);
        filter.reconfigure(zero_noise_config(9)).unwrap();
        assert!(!filter.is_initialized());

        let priors = InitPriors::detected_at(40.0, 40.0, 0.0, (12.0, 12.0));
        filter.initialize(&priors, red_reference(), None).unwrap();
        assert_eq!(filter.particles().len(), 9);
        assert!(filter.particles().iter().all(|p| p.log_w == 0.0));
        assert_eq!(filter.cycle(), 0);
    }
}
