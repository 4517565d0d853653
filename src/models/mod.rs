//! Model traits for single-target tracking
//!
//! The transition model advances a particle through time; the weighting
//! model scores it against the reference appearance. The filter core is
//! composed from one concrete implementation of each, selected at
//! construction and monomorphized (no dynamic dispatch).

pub mod transition;
pub mod weighting;

pub use transition::{DepthAwareConstantVelocity, TransitionModel};
pub use weighting::{ColorWeighting, WeightOutcome, WeightingModel};
