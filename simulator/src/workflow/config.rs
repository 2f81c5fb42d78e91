use crate::generator::scene::SceneConfig;
use anyhow::{ensure, Context};
use miricore::geometry::SubarrayMetadata;
use miricore::processing::ProfileConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Cells used for the 2D binned map of the cutout.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridConfig {
    pub xbins: usize,
    pub ybins: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { xbins: 8, ybins: 8 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub scene: SceneConfig,
    /// Windowed readouts analysed alongside the scene frame.
    pub windows: Vec<SubarrayMetadata>,
    pub profile: ProfileConfig,
    pub cutout_radius: usize,
    /// DQ values that leave a pixel usable.
    pub excluded_flags: Vec<i64>,
    pub grid: GridConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            scene: SceneConfig::default(),
            windows: Vec::new(),
            profile: ProfileConfig::default(),
            cutout_radius: 10,
            excluded_flags: Vec::new(),
            grid: GridConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Full-frame scene of `width` x `height` pixels with the star at its middle.
    pub fn from_args(width: i64, height: i64, seed: u64) -> anyhow::Result<Self> {
        let frame = SubarrayMetadata::full_frame(width, height)
            .context("building frame window from arguments")?;
        let mut scene = SceneConfig {
            frame,
            seed,
            ..SceneConfig::default()
        };
        scene.star.x = width as f64 / 2.0 + 0.3;
        scene.star.y = height as f64 / 2.0 - 0.2;
        let cutout_radius = ((width.min(height) / 2 - 2).max(1) as usize).min(10);

        let config = Self {
            scene,
            cutout_radius,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.scene.validate()?;
        self.profile.validate().context("validating profile config")?;
        ensure!(
            self.grid.xbins > 0 && self.grid.ybins > 0,
            "grid bins must be positive, got {}x{}",
            self.grid.xbins,
            self.grid.ybins
        );
        for window in &self.windows {
            ensure!(
                self.scene.frame.contains_window(window),
                "window {:?} is not inside the scene frame {:?}",
                window,
                self.scene.frame
            );
        }
        Ok(())
    }
}
