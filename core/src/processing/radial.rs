use crate::image::{MaskedImage, PixelCenter};
use crate::math::stats::{Statistic, StatsHelper};
use crate::prelude::{ToolkitError, ToolkitResult};
use log::{debug, warn};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Radial binning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub bin_width: f64,
    /// Pixels further than this are ignored. Only shrinks the profile.
    pub rmax: Option<f64>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            bin_width: 1.0,
            rmax: None,
        }
    }
}

impl ProfileConfig {
    pub fn validate(&self) -> ToolkitResult<()> {
        if !self.bin_width.is_finite() || self.bin_width <= 0.0 {
            return Err(ToolkitError::Configuration(format!(
                "bin width must be positive, got {}",
                self.bin_width
            )));
        }
        if let Some(rmax) = self.rmax {
            if !rmax.is_finite() || rmax < 0.0 {
                return Err(ToolkitError::Configuration(format!(
                    "rmax must be a non-negative radius, got {}",
                    rmax
                )));
            }
        }
        Ok(())
    }
}

/// One statistic as a function of radius.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialProfile {
    /// Mean radius of the pixels that landed in each bin.
    pub radius: Array1<f64>,
    pub values: Array1<f64>,
    /// Bin edges, one more than the number of bins.
    pub edges: Array1<f64>,
}

impl RadialProfile {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Geometric midpoint of each bin.
    pub fn bin_centers(&self) -> Array1<f64> {
        midpoints(&self.edges)
    }
}

/// Several bin-aligned statistics keyed by name, plus the radius axis `r`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialProfiles {
    columns: BTreeMap<String, Array1<f64>>,
}

impl RadialProfiles {
    pub fn get(&self, name: &str) -> Option<&Array1<f64>> {
        self.columns.get(name)
    }

    pub fn radius(&self) -> &Array1<f64> {
        &self.columns["r"]
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array1<f64>)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }

    /// Number of radial bins.
    pub fn len(&self) -> usize {
        self.radius().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_inner(self) -> BTreeMap<String, Array1<f64>> {
        self.columns
    }
}

pub(crate) fn midpoints(edges: &Array1<f64>) -> Array1<f64> {
    if edges.len() < 2 {
        return Array1::zeros(0);
    }
    Array1::from_shape_fn(edges.len() - 1, |k| 0.5 * (edges[k] + edges[k + 1]))
}

/// Euclidean distance of every pixel from `center`.
pub fn radial_distance_map(shape: (usize, usize), center: PixelCenter) -> Array2<f64> {
    let PixelCenter { y: cy, x: cx } = center;
    Array2::from_shape_fn(shape, |(y, x)| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        dx.hypot(dy)
    })
}

/// Upper bound on the number of radial bins in one profile.
const MAX_RADIAL_BINS: usize = 1 << 24;

/// Valid pixels grouped by radial bin.
struct RadialBins {
    edges: Array1<f64>,
    radii: Vec<Vec<f64>>,
    values: Vec<Vec<f64>>,
}

impl RadialBins {
    fn collect(image: &MaskedImage, center: PixelCenter, config: &ProfileConfig) -> ToolkitResult<Self> {
        config.validate()?;
        if !center.y.is_finite() || !center.x.is_finite() {
            return Err(ToolkitError::Configuration(format!(
                "profile center must be finite, got (y={}, x={})",
                center.y, center.x
            )));
        }
        let distances = radial_distance_map(image.dim(), center);

        // rmax filters radii and values together so they stay paired.
        let samples: Vec<(f64, f64)> = image
            .valid_samples()
            .map(|(index, value)| (distances[index], value))
            .filter(|&(r, _)| config.rmax.map_or(true, |rmax| r <= rmax))
            .collect();

        if samples.is_empty() {
            warn!(
                "radial profile around ({}, {}) has no valid pixels",
                center.y, center.x
            );
        }

        // Largest kept radius; rmax has already been applied to the samples.
        let n_bins = match samples.iter().map(|&(r, _)| r).reduce(f64::max) {
            Some(limit) => bin_count(limit, config.bin_width)?,
            None => 0,
        };

        let mut radii = vec![Vec::new(); n_bins];
        let mut values = vec![Vec::new(); n_bins];
        for (r, value) in samples {
            let bin = ((r / config.bin_width).floor() as usize).min(n_bins - 1);
            radii[bin].push(r);
            values[bin].push(value);
        }

        debug!(
            "radial bins: shape {:?}, center (y={}, x={}), width {}, {} bins",
            image.dim(),
            center.y,
            center.x,
            config.bin_width,
            n_bins
        );

        let edges = Array1::from_shape_fn(n_bins + 1, |k| k as f64 * config.bin_width);
        Ok(Self {
            edges,
            radii,
            values,
        })
    }

    fn mean_radius(&self) -> Array1<f64> {
        self.radii.iter().map(|bin| StatsHelper::mean(bin)).collect()
    }

    fn reduce(&self, statistic: &Statistic) -> Array1<f64> {
        self.values.iter().map(|bin| statistic.reduce(bin)).collect()
    }
}

fn bin_count(limit: f64, bin_width: f64) -> ToolkitResult<usize> {
    let last = (limit / bin_width).floor();
    if last.is_nan() || last >= MAX_RADIAL_BINS as f64 {
        return Err(ToolkitError::Configuration(format!(
            "bin width {} splits radius {} into more than {} bins",
            bin_width, limit, MAX_RADIAL_BINS
        )));
    }
    Ok(last as usize + 1)
}

/// Reduces `image` to `statistic` as a function of distance from `center`
/// (given as (y, x)). Empty bins hold NaN.
pub fn profile(
    image: &MaskedImage,
    center: impl Into<PixelCenter>,
    config: &ProfileConfig,
    statistic: &Statistic,
) -> ToolkitResult<RadialProfile> {
    let bins = RadialBins::collect(image, center.into(), config)?;
    Ok(RadialProfile {
        radius: bins.mean_radius(),
        values: bins.reduce(statistic),
        edges: bins.edges,
    })
}

/// Computes `r, mean, std, median, variance, max, sum, size` on one binning.
pub fn profiles(
    image: &MaskedImage,
    center: impl Into<PixelCenter>,
    config: &ProfileConfig,
) -> ToolkitResult<RadialProfiles> {
    let bins = RadialBins::collect(image, center.into(), config)?;
    let mut columns = BTreeMap::new();
    columns.insert("r".to_string(), bins.mean_radius());
    for statistic in Statistic::profile_set() {
        columns.insert(statistic.name().to_string(), bins.reduce(&statistic));
    }
    Ok(RadialProfiles { columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::s;

    /// Image whose value is its own distance from `(cy, cx)`.
    fn radius_image(ny: usize, nx: usize, cy: usize, cx: usize) -> Array2<f64> {
        radial_distance_map((ny, nx), PixelCenter::from((cy, cx)))
    }

    fn assert_close(a: &Array1<f64>, b: &Array1<f64>) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-7);
        }
    }

    #[test]
    fn mean_profile_of_radius_image_is_radius() {
        let image = MaskedImage::new(radius_image(25, 25, 12, 12));
        let result = profile(&image, (12_usize, 12_usize), &ProfileConfig::default(), &Statistic::Mean)
            .unwrap();
        assert_close(&result.radius, &result.values);
        assert_eq!(result.edges[0], 0.0);
        assert_eq!(result.edges.len(), result.len() + 1);
    }

    #[test]
    fn custom_statistic_is_applied_per_bin() {
        let image = MaskedImage::new(radius_image(25, 25, 12, 12));
        let constant = Statistic::custom("constant", |_: &[f64]| 2.0);
        let result = profile(&image, (12_usize, 12_usize), &ProfileConfig::default(), &constant).unwrap();
        assert!(result.values.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn masked_pixels_are_ignored() {
        let mut data = radius_image(25, 25, 12, 12);
        let mut mask = Array2::from_elem((25, 25), false);
        mask.slice_mut(s![10..12, ..]).fill(true);
        data.slice_mut(s![10..12, ..]).fill(0.0);
        let image = MaskedImage::with_mask(data, mask).unwrap();

        let result = profile(&image, (12_usize, 12_usize), &ProfileConfig::default(), &Statistic::Mean)
            .unwrap();
        assert_close(&result.radius, &result.values);
    }

    #[test]
    fn center_is_read_as_row_then_column() {
        let (cy, cx) = (10, 3);
        let mut data = Array2::<f64>::zeros((25, 25));
        data[[cy + 1, cx]] = 1.0;
        data[[cy, cx + 1]] = 1.0;
        data[[cy - 1, cx]] = 1.0;
        data[[cy, cx - 1]] = 1.0;

        let result = profile(
            &MaskedImage::new(data),
            (cy, cx),
            &ProfileConfig::default(),
            &Statistic::Mean,
        )
        .unwrap();
        assert_ne!(result.values[1], 0.0);
    }

    #[test]
    fn rmax_truncates_both_axes() {
        let image = MaskedImage::new(radius_image(25, 25, 12, 12));
        let full = profile(&image, (12_usize, 12_usize), &ProfileConfig::default(), &Statistic::Mean)
            .unwrap();
        let config = ProfileConfig {
            rmax: Some(5.0),
            ..Default::default()
        };
        let truncated = profile(&image, (12_usize, 12_usize), &config, &Statistic::Mean).unwrap();

        assert_eq!(truncated.len(), 6);
        let n = truncated.len() - 1;
        assert_close(
            &truncated.radius.slice(s![..n]).to_owned(),
            &full.radius.slice(s![..n]).to_owned(),
        );
        assert_close(
            &truncated.values.slice(s![..n]).to_owned(),
            &full.values.slice(s![..n]).to_owned(),
        );
    }

    #[test]
    fn empty_bins_are_nan() {
        // Only the center and a ring at r = 3 are valid.
        let data = radius_image(7, 7, 3, 3);
        let mask = data.mapv(|r| !(r == 0.0 || r == 3.0));
        let image = MaskedImage::with_mask(data, mask).unwrap();
        let result = profile(&image, (3_usize, 3_usize), &ProfileConfig::default(), &Statistic::Mean)
            .unwrap();
        assert_eq!(result.len(), 4);
        assert!(result.values[1].is_nan());
        assert!(result.radius[2].is_nan());
        assert_eq!(result.values[3], 3.0);
    }

    #[test]
    fn profiles_report_every_statistic() {
        let image = MaskedImage::new(radius_image(30, 25, 15, 12));
        let result = profiles(&image, (15_usize, 12_usize), &ProfileConfig::default()).unwrap();

        let keys: Vec<&str> = result.keys().collect();
        assert_eq!(
            keys,
            vec!["max", "mean", "median", "r", "size", "std", "sum", "variance"]
        );
        assert_close(result.radius(), result.get("mean").unwrap());
        for (_, column) in result.iter() {
            assert_eq!(column.len(), result.len());
        }
        assert_eq!(result.get("size").unwrap()[0], 1.0);
    }

    #[test]
    fn invalid_bin_width_is_rejected() {
        let image = MaskedImage::new(Array2::zeros((3, 3)));
        let config = ProfileConfig {
            bin_width: 0.0,
            rmax: None,
        };
        assert!(matches!(
            profile(&image, (1_usize, 1_usize), &config, &Statistic::Mean),
            Err(ToolkitError::Configuration(_))
        ));
    }

    #[test]
    fn bin_centers_are_edge_midpoints() {
        let image = MaskedImage::new(radius_image(5, 5, 2, 2));
        let config = ProfileConfig {
            bin_width: 0.5,
            rmax: Some(1.0),
        };
        let result = profile(&image, (2_usize, 2_usize), &config, &Statistic::Mean).unwrap();
        assert_eq!(result.bin_centers().to_vec(), vec![0.25, 0.75, 1.25]);
    }

    #[test]
    fn rmax_past_the_image_does_not_grow_the_profile() {
        let image = MaskedImage::new(radius_image(5, 5, 2, 2));
        let full = profile(&image, (2_usize, 2_usize), &ProfileConfig::default(), &Statistic::Mean)
            .unwrap();
        for rmax in [1000.0, 1e9, f64::MAX] {
            let config = ProfileConfig {
                rmax: Some(rmax),
                ..Default::default()
            };
            let wide = profile(&image, (2_usize, 2_usize), &config, &Statistic::Mean).unwrap();
            assert_eq!(wide.len(), full.len(), "rmax {}", rmax);
            assert!(wide.values.iter().all(|v| !v.is_nan()));
        }
    }

    #[test]
    fn tiny_bin_width_is_a_configuration_error() {
        let image = MaskedImage::new(radius_image(5, 5, 2, 2));
        let config = ProfileConfig {
            bin_width: 1e-300,
            rmax: None,
        };
        assert!(config.validate().is_ok());
        assert!(matches!(
            profiles(&image, (2_usize, 2_usize), &config),
            Err(ToolkitError::Configuration(_))
        ));
    }

    #[test]
    fn non_finite_center_is_rejected() {
        let image = MaskedImage::new(radius_image(5, 5, 2, 2));
        for center in [(f64::NAN, 2.0), (2.0, f64::INFINITY)] {
            assert!(matches!(
                profile(&image, center, &ProfileConfig::default(), &Statistic::Mean),
                Err(ToolkitError::Configuration(_))
            ));
        }
    }
}
