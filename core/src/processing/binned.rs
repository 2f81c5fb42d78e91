use super::radial::midpoints;
use crate::math::stats::Statistic;
use crate::prelude::{ToolkitError, ToolkitResult};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1};
use std::collections::BTreeMap;

/// Result of scattering samples onto a regular `(ybins, xbins)` grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedGrid {
    /// Bin centers along x, length `xbins`.
    pub x: Array1<f64>,
    /// Bin centers along y, length `ybins`.
    pub y: Array1<f64>,
    pub x_edges: Array1<f64>,
    pub y_edges: Array1<f64>,
    /// Samples per cell.
    pub size: Array2<usize>,
    pub statistics: BTreeMap<String, Array2<f64>>,
}

impl BinnedGrid {
    pub fn statistic(&self, name: &str) -> Option<&Array2<f64>> {
        self.statistics.get(name)
    }
}

/// Equal-width edges over the finite span of `samples`.
fn axis_edges(samples: impl Iterator<Item = f64>, bins: usize) -> Array1<f64> {
    let (lo, hi) = samples
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let (lo, hi) = if !lo.is_finite() {
        (0.0, 1.0)
    } else if lo == hi {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    };
    Array1::linspace(lo, hi, bins + 1)
}

/// Bin holding `value`; bins are half-open except the last, which also
/// takes its upper edge.
fn bin_index(edges: &Array1<f64>, value: f64) -> Option<usize> {
    let bins = edges.len() - 1;
    let (lo, hi) = (edges[0], edges[bins]);
    if !(lo..=hi).contains(&value) {
        return None;
    }
    let slice = edges.as_slice()?;
    let right = slice.partition_point(|&edge| edge <= value);
    Some((right - 1).min(bins - 1))
}

/// Aggregates `values` on an `xbins` by `ybins` grid with `statistic`.
pub fn bin_2d(
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    values: ArrayView1<f64>,
    xbins: usize,
    ybins: usize,
    statistic: &Statistic,
) -> ToolkitResult<BinnedGrid> {
    bin_2d_many(x, y, values, xbins, ybins, std::slice::from_ref(statistic))
}

/// Like [`bin_2d`], computing each of `statistics` on the same cells.
pub fn bin_2d_many(
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    values: ArrayView1<f64>,
    xbins: usize,
    ybins: usize,
    statistics: &[Statistic],
) -> ToolkitResult<BinnedGrid> {
    if x.len() != y.len() || x.len() != values.len() {
        return Err(ToolkitError::Configuration(format!(
            "sample lengths differ: x={}, y={}, values={}",
            x.len(),
            y.len(),
            values.len()
        )));
    }
    if xbins == 0 || ybins == 0 {
        return Err(ToolkitError::Configuration(format!(
            "bin counts must be positive, got {}x{}",
            xbins, ybins
        )));
    }

    let x_edges = axis_edges(x.iter().copied(), xbins);
    let y_edges = axis_edges(y.iter().copied(), ybins);

    let mut cells: Vec<Vec<f64>> = vec![Vec::new(); xbins * ybins];
    for ((&xv, &yv), &value) in x.iter().zip(y.iter()).zip(values.iter()) {
        if let (Some(ix), Some(iy)) = (bin_index(&x_edges, xv), bin_index(&y_edges, yv)) {
            cells[iy * xbins + ix].push(value);
        }
    }

    let size = Array2::from_shape_fn((ybins, xbins), |(iy, ix)| cells[iy * xbins + ix].len());
    let statistics = statistics
        .iter()
        .map(|statistic| {
            let grid = Array2::from_shape_fn((ybins, xbins), |(iy, ix)| {
                statistic.reduce(&cells[iy * xbins + ix])
            });
            (statistic.name().to_string(), grid)
        })
        .collect();

    debug!(
        "bin_2d: {} samples onto {}x{} cells",
        values.len(),
        ybins,
        xbins
    );

    Ok(BinnedGrid {
        x: midpoints(&x_edges),
        y: midpoints(&y_edges),
        x_edges,
        y_edges,
        size,
        statistics,
    })
}
