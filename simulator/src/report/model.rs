use crate::workflow::runner::{WindowResult, WorkflowResult};
use anyhow::Context;
use miricore::geometry::{PixelCoordinate, SubarrayMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window: SubarrayMetadata,
    pub star_local: Option<PixelCoordinate>,
    pub mean_signal: f64,
    pub do_not_use: usize,
}

impl From<&WindowResult> for WindowSummary {
    fn from(result: &WindowResult) -> Self {
        Self {
            window: result.window,
            star_local: result.star_local,
            mean_signal: result.mean_signal,
            do_not_use: result.do_not_use,
        }
    }
}

/// JSON-friendly snapshot of a workflow run. Empty bins are written as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisReport {
    /// `((xmin, xmax), (ymin, ymax))`, 0-based with exclusive ends.
    pub intersection: ((i64, i64), (i64, i64)),
    pub windows: Vec<WindowSummary>,
    pub recentre_shift: (f64, f64),
    pub masked_pixels: usize,
    pub profiles: BTreeMap<String, Vec<Option<f64>>>,
    pub grid_counts: Vec<Vec<usize>>,
    pub flag_counts: BTreeMap<String, usize>,
}

impl AnalysisReport {
    pub fn from_result(result: &WorkflowResult) -> Self {
        let profiles = result
            .profiles
            .iter()
            .map(|(key, column)| {
                let values = column
                    .iter()
                    .map(|&v| if v.is_finite() { Some(v) } else { None })
                    .collect();
                (key.clone(), values)
            })
            .collect();
        let grid_counts = result
            .grid
            .size
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect();

        Self {
            intersection: result.intersection.as_tuple(),
            windows: result.windows.iter().map(WindowSummary::from).collect(),
            recentre_shift: result.recentre_shift,
            masked_pixels: result.masked_pixels,
            profiles,
            grid_counts,
            flag_counts: result.flag_counts.clone(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "intersection={:?} windows={} masked={} profile_bins={} flags={:?}",
            self.intersection,
            self.windows.len(),
            self.masked_pixels,
            self.profiles.get("r").map_or(0, Vec::len),
            self.flag_counts
        )
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serializing report")?;
        fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        Ok(())
    }
}
