use crate::generator::scene::SyntheticScene;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::{info, warn};
use miricore::geometry::{
    crop_to_bounds, crop_to_match, find_intersection, select_centered_subimage, to_local_frame,
    FrameBounds, PixelCoordinate, SubarrayMetadata,
};
use miricore::image::MaskedImage;
use miricore::math::Statistic;
use miricore::processing::{bin_2d_many, profiles, shift, BinnedGrid};
use miricore::quality::{decompose_array, extract_flag, DqFlag};
use ndarray::{Array1, Array2, Axis};
use std::collections::BTreeMap;

/// Per-window view of the scene.
#[derive(Debug, Clone)]
pub struct WindowResult {
    pub window: SubarrayMetadata,
    /// Star pixel in the window's local frame, if the window sees it.
    pub star_local: Option<PixelCoordinate>,
    pub mean_signal: f64,
    pub do_not_use: usize,
}

pub struct WorkflowResult {
    pub intersection: FrameBounds,
    pub windows: Vec<WindowResult>,
    /// Fractional shift applied to recentre the cutout, (dy, dx).
    pub recentre_shift: (f64, f64),
    pub masked_pixels: usize,
    pub profiles: BTreeMap<String, Array1<f64>>,
    pub grid: BinnedGrid,
    pub flag_counts: BTreeMap<String, usize>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, scene: &SyntheticScene) -> anyhow::Result<WorkflowResult> {
        let frame_window = scene.window;

        let mut all_windows = vec![frame_window];
        all_windows.extend(self.config.windows.iter().copied());
        let intersection =
            find_intersection(&all_windows).context("intersecting readout windows")?;
        info!("common region {:?}", intersection.as_tuple());

        let windows = self
            .config
            .windows
            .iter()
            .map(|window| self.read_window(scene, window))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let common = crop_to_bounds(scene.frame.view(), &frame_window, &intersection)
            .context("cropping frame to common region")?;
        let common_dq = crop_to_bounds(scene.dq.view(), &frame_window, &intersection)
            .context("cropping DQ to common region")?;

        let star_y = scene.star.y - intersection.ymin as f64;
        let star_x = scene.star.x - intersection.xmin as f64;
        let (row, col) = (star_y.round(), star_x.round());
        anyhow::ensure!(
            row >= 0.0 && col >= 0.0,
            "star at ({}, {}) lies outside the common region",
            scene.star.x,
            scene.star.y
        );
        let center = (row as usize, col as usize);
        let radius = self.config.cutout_radius;

        let cutout = select_centered_subimage(common.view(), center, radius)
            .context("cutting out the star")?;
        let cutout_dq = select_centered_subimage(common_dq.view(), center, radius)
            .context("cutting out the star DQ")?;

        let recentre_shift = (row - star_y, col - star_x);
        let recentred = shift(cutout.view(), recentre_shift.0, recentre_shift.1)
            .context("recentring the cutout")?;

        let image = MaskedImage::from_dq(recentred, cutout_dq.view(), &self.config.excluded_flags)
            .context("masking the cutout")?;
        let masked_pixels = image.masked_count();
        if masked_pixels > 0 {
            warn!("{} cutout pixels masked by DQ flags", masked_pixels);
        }

        let profiles = profiles(&image, (radius, radius), &self.config.profile)
            .context("computing radial profiles")?
            .into_inner();

        let grid = self.bin_cutout(&image).context("binning the cutout")?;
        let flag_counts = count_flags(&common_dq)?;

        info!(
            "profiles over {} bins, {} flagged categories",
            profiles.get("r").map_or(0, |r| r.len()),
            flag_counts.len()
        );

        Ok(WorkflowResult {
            intersection,
            windows,
            recentre_shift,
            masked_pixels,
            profiles,
            grid,
            flag_counts,
        })
    }

    fn read_window(
        &self,
        scene: &SyntheticScene,
        window: &SubarrayMetadata,
    ) -> anyhow::Result<WindowResult> {
        let bounds = find_intersection(&[scene.window, *window])
            .with_context(|| format!("locating {:?} in the frame", window))?;
        let readout = crop_to_bounds(scene.frame.view(), &scene.window, &bounds)
            .with_context(|| format!("reading out {:?}", window))?;
        let dq = crop_to_match(scene.dq.view(), readout.view(), Some(&scene.window), Some(window))
            .with_context(|| format!("aligning DQ with {:?}", window))?;

        let star_absolute = PixelCoordinate::new(
            scene.star.x.round() as i64,
            scene.star.y.round() as i64,
        );
        let star_local = to_local_frame(star_absolute, window).ok();
        if star_local.is_none() {
            warn!("star at {:?} not visible in {:?}", star_absolute, window);
        }
        let do_not_use = extract_flag(dq.view(), DqFlag::DoNotUse.bit())?
            .iter()
            .filter(|&&flagged| flagged)
            .count();

        Ok(WindowResult {
            window: *window,
            star_local,
            mean_signal: readout.mean().unwrap_or(f64::NAN),
            do_not_use,
        })
    }

    fn bin_cutout(&self, image: &MaskedImage) -> anyhow::Result<BinnedGrid> {
        let (mut xs, mut ys, mut values) = (Vec::new(), Vec::new(), Vec::new());
        for ((y, x), value) in image.valid_samples() {
            xs.push(x as f64);
            ys.push(y as f64);
            values.push(value);
        }
        let grid = bin_2d_many(
            Array1::from(xs).view(),
            Array1::from(ys).view(),
            Array1::from(values).view(),
            self.config.grid.xbins,
            self.config.grid.ybins,
            &[Statistic::Mean, Statistic::Max],
        )?;
        Ok(grid)
    }
}

/// Pixels carrying each named flag.
fn count_flags(dq: &Array2<i64>) -> anyhow::Result<BTreeMap<String, usize>> {
    let planes = decompose_array(dq.view()).context("decomposing DQ array")?;
    let mut counts = BTreeMap::new();
    for (bit, plane) in planes.axis_iter(Axis(2)).enumerate() {
        let count = plane.iter().filter(|&&set| set == 1).count();
        if count == 0 {
            continue;
        }
        let name = DqFlag::from_bit(bit as u32).map_or("UNKNOWN", DqFlag::name);
        counts.insert(name.to_string(), count);
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::scene::{build_scene, SceneConfig, StarConfig};
    use miricore::geometry::to_absolute_frame;
    use miricore::processing::ProfileConfig;

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            scene: SceneConfig {
                frame: SubarrayMetadata::full_frame(64, 64).unwrap(),
                star: StarConfig {
                    x: 40.3,
                    y: 30.6,
                    amplitude: 100.0,
                    sigma: 1.5,
                },
                background: 2.0,
                noise: 0.0,
                bad_pixel_fraction: 0.0,
                seed: 1,
            },
            windows: vec![
                SubarrayMetadata::new(17, 9, 40, 48).unwrap(),
                SubarrayMetadata::new(25, 17, 32, 32).unwrap(),
            ],
            profile: ProfileConfig::default(),
            cutout_radius: 6,
            excluded_flags: Vec::new(),
            grid: Default::default(),
        }
    }

    #[test]
    fn runner_executes_workflow() {
        let cfg = config();
        let scene = build_scene(&cfg.scene).unwrap();
        let result = Runner::new(cfg.clone()).execute(&scene).unwrap();

        assert_eq!(result.intersection.as_tuple(), ((24, 56), (16, 48)));
        assert_eq!(result.windows.len(), 2);
        assert_eq!(
            result.windows[1].star_local,
            Some(PixelCoordinate::new(40 - 24, 31 - 16))
        );

        for summary in &result.windows {
            let local = summary.star_local.unwrap();
            let absolute = to_absolute_frame(local, &summary.window).unwrap();
            assert_eq!(absolute, PixelCoordinate::new(40, 31));
        }

        let r = &result.profiles["r"];
        for column in result.profiles.values() {
            assert_eq!(column.len(), r.len());
        }
        // The recentred peak sits in the first bin.
        assert!(result.profiles["max"][0] > result.profiles["max"][3]);
        assert_eq!(result.grid.size.dim(), (8, 8));
        assert_eq!(result.masked_pixels, 0);
        assert!(result.flag_counts.is_empty());
    }

    #[test]
    fn flagged_pixels_are_counted_and_masked() {
        let cfg = config();
        let mut scene = build_scene(&cfg.scene).unwrap();
        scene.dq[[31, 41]] = DqFlag::DoNotUse.value() | DqFlag::Hot.value();
        scene.dq[[28, 38]] = DqFlag::Warm.value();

        let result = Runner::new(cfg).execute(&scene).unwrap();
        // Both pixels fall inside the cutout around the star.
        assert_eq!(result.masked_pixels, 2);
        assert_eq!(result.flag_counts.get("DO_NOT_USE"), Some(&1));
        assert_eq!(result.flag_counts.get("HOT"), Some(&1));
        assert_eq!(result.flag_counts.get("WARM"), Some(&1));
        assert_eq!(result.windows[0].do_not_use, 1);
    }

    #[test]
    fn excluded_values_stay_usable() {
        let mut cfg = config();
        cfg.excluded_flags = vec![DqFlag::Warm.value()];
        let mut scene = build_scene(&cfg.scene).unwrap();
        scene.dq[[28, 38]] = DqFlag::Warm.value();

        let result = Runner::new(cfg).execute(&scene).unwrap();
        assert_eq!(result.masked_pixels, 0);
        assert_eq!(result.flag_counts.get("WARM"), Some(&1));
    }

    #[test]
    fn star_outside_cutout_range_fails() {
        let mut cfg = config();
        cfg.cutout_radius = 30;
        let scene = build_scene(&cfg.scene).unwrap();
        assert!(Runner::new(cfg).execute(&scene).is_err());
    }
}
