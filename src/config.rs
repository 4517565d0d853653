//! Filter configuration
//!
//! All process-wide tuning knobs live in one explicit struct handed to the
//! filter at construction, so independent tracking sessions can run with
//! different parameters and tests stay deterministic.

use crate::{Result, TrackError};

/// Configuration for one tracking session.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Number of particles M (fixed for the lifetime of a session)
    pub particles: usize,
    /// Process noise std-dev on position (pixels)
    pub std_xy: f32,
    /// Process noise std-dev on velocity (pixels/second)
    pub std_vxy: f32,
    /// Lower clamp on the appearance score, keeps `ln(score)` finite
    pub score_floor: f64,
    /// Number of contiguous partitions for parallel particle evaluation;
    /// 1 means sequential
    pub partitions: usize,
    /// Base seed for per-particle noise streams
    pub seed: u64,
}

impl FilterConfig {
    /// Creates a configuration with the given particle count and process
    /// noise std-devs, keeping defaults for the remaining fields.
    ///
    /// Returns `InvalidConfiguration` if any parameter is rejected by
    /// [`validate`](Self::validate).
    pub fn new(particles: usize, std_xy: f32, std_vxy: f32) -> Result<Self> {
        let config = Self {
            particles,
            std_xy,
            std_vxy,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every field, rejecting values the filter cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.particles == 0 {
            return Err(TrackError::InvalidConfiguration(
                "particle count must be positive",
            ));
        }
        if !self.std_xy.is_finite() || self.std_xy < 0.0 {
            return Err(TrackError::InvalidConfiguration(
                "position noise std-dev must be finite and non-negative",
            ));
        }
        if !self.std_vxy.is_finite() || self.std_vxy < 0.0 {
            return Err(TrackError::InvalidConfiguration(
                "velocity noise std-dev must be finite and non-negative",
            ));
        }
        if !(self.score_floor > 0.0 && self.score_floor <= 1.0) {
            return Err(TrackError::InvalidConfiguration(
                "score floor must lie in (0, 1]",
            ));
        }
        if self.partitions == 0 {
            return Err(TrackError::InvalidConfiguration(
                "partition count must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            particles: 1000,
            std_xy: 10.0,
            std_vxy: 10.0,
            score_floor: f64::MIN_POSITIVE,
            partitions: 8,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FilterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_particles_rejected() {
        let err = FilterConfig::new(0, 10.0, 10.0).unwrap_err();
        assert!(matches!(err, TrackError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_negative_noise_rejected() {
        assert!(FilterConfig::new(100, -1.0, 10.0).is_err());
        assert!(FilterConfig::new(100, 10.0, -1.0).is_err());
        assert!(FilterConfig::new(100, f32::NAN, 10.0).is_err());
    }

    #[test]
    fn test_zero_noise_allowed() {
        // Deterministic motion is a valid (and testable) configuration
        assert!(FilterConfig::new(4, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_bad_score_floor_rejected() {
        let mut config = FilterConfig::default();
        config.score_floor = 0.0;
        assert!(config.validate().is_err());
        config.score_floor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_partitions_rejected() {
        let mut config = FilterConfig::default();
        config.partitions = 0;
        assert!(config.validate().is_err());
    }
}
