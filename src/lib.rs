//! Colortrack: single-target tracking with a color-appearance particle filter
//!
//! Tracks a moving silhouette in a stream of paired color/depth frames.
//! Each frame, every particle is advanced by a constant-velocity motion
//! model with a depth-frame correction, then scored against a reference
//! hue/saturation histogram. Resampling is driven externally through the
//! effective sample size exposed by the filter.
//!
//! # Components
//!
//! - [`types`]: particle records and observation frame buffers
//! - [`geometry`]: elliptical regions of interest
//! - [`color`]: hue/saturation histograms and Bhattacharyya comparison
//! - [`models`]: transition and weighting models
//! - [`parallel`]: partitioned parallel-for over the particle set
//! - [`filter`]: the particle filter core

pub mod color;
pub mod config;
pub mod filter;
pub mod geometry;
pub mod models;
pub mod parallel;
pub mod types;

pub mod prelude {
    pub use crate::color::ColorModel;
    pub use crate::config::FilterConfig;
    pub use crate::filter::{CycleStats, InitPriors, ParticleFilter, StateEstimate};
    pub use crate::models::transition::DepthAwareConstantVelocity;
    pub use crate::models::weighting::ColorWeighting;
    pub use crate::types::frame::{ColorFrame, DepthFrame, Hsv, ObservationFrame};
    pub use crate::types::particle::Particle;
}

/// Error types for the library
#[derive(Debug, Clone, PartialEq)]
pub enum TrackError {
    /// Rejected configuration or initialization parameter
    InvalidConfiguration(&'static str),
    /// Reference color model has zero or non-finite mass
    DegenerateModel,
    /// Total particle weight is zero or non-finite; tracking is lost
    DegenerateWeights {
        /// Update cycle in which the degeneracy was detected
        cycle: u64,
    },
    /// The filter has no particle set (never initialized, or closed)
    Uninitialized,
}

impl std::error::Error for TrackError {}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackError::InvalidConfiguration(what) => {
                write!(f, "Invalid configuration: {}", what)
            }
            TrackError::DegenerateModel => write!(f, "Reference color model is degenerate"),
            TrackError::DegenerateWeights { cycle } => {
                write!(f, "Degenerate particle weights at cycle {}", cycle)
            }
            TrackError::Uninitialized => write!(f, "Particle filter is not initialized"),
        }
    }
}

pub type Result<T> = ::core::result::Result<T, TrackError>;
