use super::template::gaussian_spot;
use anyhow::{ensure, Context};
use miricore::geometry::{SubarrayMetadata, MIRI_FULL_FRAME};
use miricore::quality::DqFlag;
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Point source placed in the synthetic frame, in absolute detector pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StarConfig {
    pub x: f64,
    pub y: f64,
    pub amplitude: f64,
    pub sigma: f64,
}

/// Configuration for generating a synthetic detector readout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Window the synthetic frame is read out through.
    pub frame: SubarrayMetadata,
    pub star: StarConfig,
    pub background: f64,
    pub noise: f64,
    /// Probability that a pixel carries a random DQ flag.
    pub bad_pixel_fraction: f64,
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            frame: MIRI_FULL_FRAME,
            star: StarConfig {
                x: 700.4,
                y: 300.7,
                amplitude: 1000.0,
                sigma: 1.8,
            },
            background: 10.0,
            noise: 0.5,
            bad_pixel_fraction: 0.001,
            seed: 0,
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.noise >= 0.0, "noise must be non-negative, got {}", self.noise);
        ensure!(
            (0.0..=1.0).contains(&self.bad_pixel_fraction),
            "bad pixel fraction must lie in [0, 1], got {}",
            self.bad_pixel_fraction
        );
        ensure!(
            self.star.sigma > 0.0,
            "star sigma must be positive, got {}",
            self.star.sigma
        );
        Ok(())
    }
}

/// A frame, its DQ array and the window both were read out through.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    pub frame: Array2<f64>,
    pub dq: Array2<i64>,
    pub window: SubarrayMetadata,
    pub star: StarConfig,
}

/// Flag combinations injected into bad pixels.
const INJECTED_FLAGS: [&[DqFlag]; 4] = [
    &[DqFlag::DoNotUse, DqFlag::Hot],
    &[DqFlag::Warm],
    &[DqFlag::JumpDet],
    &[DqFlag::DoNotUse, DqFlag::Saturated],
];

pub fn build_scene(config: &SceneConfig) -> anyhow::Result<SyntheticScene> {
    config.validate().context("validating scene config")?;

    let window = config.frame;
    let shape = window.shape();
    let (x0, y0) = (window.start_x() - 1, window.start_y() - 1);
    let local_center = (config.star.y - y0 as f64, config.star.x - x0 as f64);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut frame = gaussian_spot(shape, local_center, config.star.sigma, config.star.amplitude);
    for value in frame.iter_mut() {
        let jitter = if config.noise > 0.0 {
            rng.gen_range(-config.noise..config.noise)
        } else {
            0.0
        };
        *value += config.background + jitter;
    }

    let mut dq = Array2::<i64>::zeros(shape);
    if config.bad_pixel_fraction > 0.0 {
        for value in dq.iter_mut() {
            if rng.gen_bool(config.bad_pixel_fraction) {
                let flags = INJECTED_FLAGS[rng.gen_range(0..INJECTED_FLAGS.len())];
                *value = flags.iter().fold(0, |acc, flag| acc | flag.value());
            }
        }
    }

    Ok(SyntheticScene {
        frame,
        dq,
        window,
        star: config.star,
    })
}
