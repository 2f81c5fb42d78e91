use crate::prelude::{ToolkitError, ToolkitResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Full MIRI imager readout: 1032 columns (reference pixels included) by 1024 rows.
pub const MIRI_FULL_FRAME: SubarrayMetadata = SubarrayMetadata {
    start_x: 1,
    start_y: 1,
    size_x: 1032,
    size_y: 1024,
};

/// Largest origin or size accepted on either axis. Keeps `start + size`
/// and every derived bound within `i64`.
pub const MAX_EXTENT: i64 = u32::MAX as i64;

/// Integer pixel position, 0-based, in either the absolute detector frame
/// or a window's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelCoordinate {
    pub x: i64,
    pub y: i64,
}

impl PixelCoordinate {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Readout window within the detector: 1-based inclusive origin plus extent.
///
/// Fields are only reachable through validated constructors, so a value of
/// this type always has a positive origin and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SubarrayRecord")]
pub struct SubarrayMetadata {
    start_x: i64,
    start_y: i64,
    size_x: i64,
    size_y: i64,
}

/// Wire form of [`SubarrayMetadata`]; accepts FITS header keywords too.
#[derive(Debug, Clone, Deserialize)]
struct SubarrayRecord {
    #[serde(alias = "SUBSTRT1")]
    start_x: i64,
    #[serde(alias = "SUBSTRT2")]
    start_y: i64,
    #[serde(alias = "SUBSIZE1")]
    size_x: i64,
    #[serde(alias = "SUBSIZE2")]
    size_y: i64,
}

impl TryFrom<SubarrayRecord> for SubarrayMetadata {
    type Error = ToolkitError;

    fn try_from(record: SubarrayRecord) -> Result<Self, Self::Error> {
        SubarrayMetadata::new(record.start_x, record.start_y, record.size_x, record.size_y)
    }
}

impl SubarrayMetadata {
    pub fn new(start_x: i64, start_y: i64, size_x: i64, size_y: i64) -> ToolkitResult<Self> {
        if start_x < 1 || start_y < 1 {
            return Err(ToolkitError::Configuration(format!(
                "subarray origin ({}, {}) must be 1-based",
                start_x, start_y
            )));
        }
        if size_x < 1 || size_y < 1 {
            return Err(ToolkitError::Configuration(format!(
                "subarray size {}x{} must be positive",
                size_x, size_y
            )));
        }
        if [start_x, start_y, size_x, size_y]
            .iter()
            .any(|&v| v > MAX_EXTENT)
        {
            return Err(ToolkitError::Configuration(format!(
                "subarray ({}, {}) of size {}x{} exceeds the {} pixel limit",
                start_x, start_y, size_x, size_y, MAX_EXTENT
            )));
        }
        Ok(Self {
            start_x,
            start_y,
            size_x,
            size_y,
        })
    }

    pub fn full_frame(size_x: i64, size_y: i64) -> ToolkitResult<Self> {
        Self::new(1, 1, size_x, size_y)
    }

    /// Reads `SUBSTRT1/2` and `SUBSIZE1/2` from a header-like map.
    pub fn from_header(header: &HashMap<String, i64>) -> ToolkitResult<Self> {
        let get = |key: &str| {
            header.get(key).copied().ok_or_else(|| {
                ToolkitError::Configuration(format!("missing subarray keyword {}", key))
            })
        };
        Self::new(
            get("SUBSTRT1")?,
            get("SUBSTRT2")?,
            get("SUBSIZE1")?,
            get("SUBSIZE2")?,
        )
    }

    pub fn start_x(&self) -> i64 {
        self.start_x
    }

    pub fn start_y(&self) -> i64 {
        self.start_y
    }

    pub fn size_x(&self) -> i64 {
        self.size_x
    }

    pub fn size_y(&self) -> i64 {
        self.size_y
    }

    /// Array shape `(rows, cols)` of an image read out through this window.
    pub fn shape(&self) -> (usize, usize) {
        (self.size_y as usize, self.size_x as usize)
    }

    /// 0-based half-open absolute column range covered by the window.
    pub fn absolute_x_range(&self) -> Range<i64> {
        (self.start_x - 1)..(self.start_x - 1 + self.size_x)
    }

    /// 0-based half-open absolute row range covered by the window.
    pub fn absolute_y_range(&self) -> Range<i64> {
        (self.start_y - 1)..(self.start_y - 1 + self.size_y)
    }

    pub fn contains_window(&self, other: &SubarrayMetadata) -> bool {
        let (xs, ys) = (self.absolute_x_range(), self.absolute_y_range());
        let (oxs, oys) = (other.absolute_x_range(), other.absolute_y_range());
        xs.start <= oxs.start && oxs.end <= xs.end && ys.start <= oys.start && oys.end <= ys.end
    }
}
