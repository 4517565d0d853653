//! Common test helpers for tracking integration tests

#![allow(dead_code)]

use colortrack::color::ColorModel;
use colortrack::geometry::compute_roi;
use colortrack::prelude::*;

pub const RED: Hsv = Hsv { h: 0, s: 220, v: 200 };
pub const BLUE: Hsv = Hsv { h: 120, s: 220, v: 200 };

/// A zero-noise configuration for deterministic scenarios.
pub fn deterministic_config(particles: usize) -> FilterConfig {
    FilterConfig {
        particles,
        std_xy: 0.0,
        std_vxy: 0.0,
        score_floor: 1e-12,
        partitions: 4,
        seed: 11,
    }
}

/// 320x240 color frame of a single color.
pub fn uniform_color(pixel: Hsv) -> ColorFrame {
    ColorFrame::uniform(240, 320, pixel)
}

/// 160x120 depth frame of a constant depth.
pub fn uniform_depth(depth: u16) -> DepthFrame {
    DepthFrame::uniform(120, 160, depth)
}

/// Reference model built from an elliptical region of a uniform frame.
pub fn uniform_reference(pixel: Hsv) -> ColorModel {
    let frame = uniform_color(pixel);
    let (roi, mask) = compute_roi(100.0, 100.0, 15.0, 15.0);
    ColorModel::from_region(&frame, &roi, &mask).expect("region has masked pixels")
}

/// A filter initialized with identical particles at `(x, y)`.
pub fn ready_filter(
    config: FilterConfig,
    x: f32,
    y: f32,
) -> ParticleFilter<DepthAwareConstantVelocity, ColorWeighting> {
    let mut filter = ParticleFilter::from_config(config).expect("valid configuration");
    let priors = InitPriors::detected_at(x, y, 0.0, (15.0, 15.0));
    filter
        .initialize(&priors, uniform_reference(RED), None)
        .expect("initialization");
    filter
}
