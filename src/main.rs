//! Example usage of the colortrack library
//!
//! Tracks a synthetic red disc moving over a blue background through a
//! stream of color/depth frame pairs. Plays the role of the external
//! collaborators the filter core expects: a frame source, an initial
//! detection, and a multinomial resampler driven by the reported ESS.

use colortrack::color::ColorModel;
use colortrack::geometry::compute_roi;
use colortrack::prelude::*;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const COLOR_COLS: usize = 320;
const COLOR_ROWS: usize = 240;
const DEPTH_COLS: usize = 160;
const DEPTH_ROWS: usize = 120;

const DISC_RADIUS: f32 = 14.0;
const DISC_HSV: Hsv = Hsv { h: 0, s: 220, v: 200 };
const BACKGROUND_HSV: Hsv = Hsv { h: 120, s: 180, v: 160 };

/// Renders the scene: a colored disc at `(cx, cy)` on a flat background.
fn render_color(cx: f32, cy: f32) -> ColorFrame {
    ColorFrame::from_fn(COLOR_ROWS, COLOR_COLS, |row, col| {
        let dx = col as f32 - cx;
        let dy = row as f32 - cy;
        if dx * dx + dy * dy <= DISC_RADIUS * DISC_RADIUS {
            DISC_HSV
        } else {
            BACKGROUND_HSV
        }
    })
}

/// Multinomial resampling: draws M particles proportionally to their
/// importance weights. This is the external resampling framework the
/// filter core consumes; it never lives inside the core itself.
fn multinomial_resample(particles: &[Particle], rng: &mut StdRng) -> Vec<Particle> {
    let max_log_w = particles
        .iter()
        .map(|p| p.log_w)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut cumulative = Vec::with_capacity(particles.len());
    let mut total = 0.0;
    for p in particles {
        total += (p.log_w - max_log_w).exp();
        cumulative.push(total);
    }

    (0..particles.len())
        .map(|_| {
            let u = rng.random::<f64>() * total;
            let index = cumulative.partition_point(|&c| c < u);
            particles[index.min(particles.len() - 1)]
        })
        .collect()
}

fn main() {
    env_logger::init();

    println!("Colortrack: color-appearance particle filter demo");
    println!("=================================================\n");

    let config = FilterConfig {
        particles: 500,
        std_xy: 6.0,
        std_vxy: 2.0,
        score_floor: 1e-12,
        partitions: 8,
        seed: 42,
    };
    let particle_count = config.particles;
    let mut filter = ParticleFilter::from_config(config).expect("valid configuration");

    // The "detector": the disc's initial position and appearance are known
    let (mut cx, mut cy) = (60.0_f32, 60.0_f32);
    let first_frame = render_color(cx, cy);
    let (roi, mask) = compute_roi(cx, cy, DISC_RADIUS, DISC_RADIUS);
    let reference =
        ColorModel::from_region(&first_frame, &roi, &mask).expect("detection region is valid");

    let priors = InitPriors::detected_at(cx, cy, DISC_RADIUS, (DISC_RADIUS, DISC_RADIUS));
    filter
        .initialize(&priors, reference, None)
        .expect("initialization");

    let depth = DepthFrame::uniform(DEPTH_ROWS, DEPTH_COLS, 1500);
    let mut resampler_rng = StdRng::seed_from_u64(99);
    let dt = 1.0 / 30.0;

    for step in 0..40 {
        // The target drifts right and down
        cx += 2.0;
        cy += 1.0;
        let color = render_color(cx, cy);
        let frame = ObservationFrame::new(&color, &depth);

        let stats = match filter.step(dt, &frame) {
            Ok(stats) => stats,
            Err(err) => {
                eprintln!("tracking lost at step {}: {}", step, err);
                break;
            }
        };

        let mean = filter.mean_state().expect("weights are non-degenerate");
        println!(
            "step {:2}: target ({:5.1}, {:5.1})  mean ({:5.1}, {:5.1}, {:6.1})  ess {:5.1}",
            step, cx, cy, mean.x, mean.y, mean.z, stats.ess
        );

        if stats.ess < particle_count as f64 / 2.0 {
            let resampled = multinomial_resample(filter.particles(), &mut resampler_rng);
            filter
                .replace_particles(resampled)
                .expect("resampled set keeps the configured count");
            println!("         resampled ({} particles)", particle_count);
        }
    }

    filter.close();
}
