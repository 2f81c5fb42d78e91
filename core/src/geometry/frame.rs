use super::subarray::{PixelCoordinate, SubarrayMetadata};
use crate::prelude::{ToolkitError, ToolkitResult};
use log::debug;
use ndarray::{s, Array2, ArrayView2};

/// Region shared by a set of windows, in 0-based absolute pixels.
/// `xmin`/`ymin` are inclusive, `xmax`/`ymax` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBounds {
    pub xmin: i64,
    pub xmax: i64,
    pub ymin: i64,
    pub ymax: i64,
}

impl FrameBounds {
    /// `((xmin, xmax), (ymin, ymax))`
    pub fn as_tuple(&self) -> ((i64, i64), (i64, i64)) {
        ((self.xmin, self.xmax), (self.ymin, self.ymax))
    }

    pub fn width(&self) -> i64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> i64 {
        self.ymax - self.ymin
    }
}

fn window_origin(window: &SubarrayMetadata) -> (i64, i64) {
    (window.start_x() - 1, window.start_y() - 1)
}

/// Maps an absolute detector pixel into `target`'s local frame.
pub fn to_local_frame(
    absolute: PixelCoordinate,
    target: &SubarrayMetadata,
) -> ToolkitResult<PixelCoordinate> {
    let (x0, y0) = window_origin(target);
    absolute
        .x
        .checked_sub(x0)
        .zip(absolute.y.checked_sub(y0))
        .map(|(x, y)| PixelCoordinate::new(x, y))
        .filter(|local| {
            (0..target.size_x()).contains(&local.x) && (0..target.size_y()).contains(&local.y)
        })
        .ok_or_else(|| {
            ToolkitError::OutOfBounds(format!(
                "absolute pixel ({}, {}) is outside window starting at ({}, {}) of size {}x{}",
                absolute.x,
                absolute.y,
                target.start_x(),
                target.start_y(),
                target.size_x(),
                target.size_y()
            ))
        })
}

/// Maps a pixel in `window`'s local frame back to the absolute detector frame.
pub fn to_absolute_frame(
    local: PixelCoordinate,
    window: &SubarrayMetadata,
) -> ToolkitResult<PixelCoordinate> {
    if !(0..window.size_x()).contains(&local.x) || !(0..window.size_y()).contains(&local.y) {
        return Err(ToolkitError::OutOfBounds(format!(
            "local pixel ({}, {}) is outside a {}x{} window",
            local.x,
            local.y,
            window.size_x(),
            window.size_y()
        )));
    }
    let (x0, y0) = window_origin(window);
    Ok(PixelCoordinate::new(local.x + x0, local.y + y0))
}

/// Copies the `(rows, cols)` block starting at `(y0, x0)`.
fn crop_block<T: Clone>(
    image: ArrayView2<T>,
    y0: i64,
    x0: i64,
    rows: usize,
    cols: usize,
) -> ToolkitResult<Array2<T>> {
    let (ny, nx) = image.dim();
    let fits = y0 >= 0
        && x0 >= 0
        && y0 as usize + rows <= ny
        && x0 as usize + cols <= nx;
    if !fits {
        return Err(ToolkitError::OutOfBounds(format!(
            "block of {}x{} at (y={}, x={}) exceeds image of shape ({}, {})",
            rows, cols, y0, x0, ny, nx
        )));
    }
    let (y0, x0) = (y0 as usize, x0 as usize);
    Ok(image.slice(s![y0..y0 + rows, x0..x0 + cols]).to_owned())
}

/// Returns the part of `larger` that lines up with `smaller`.
///
/// Without windows both images are assumed to share their origin. Windows
/// must be given for both images or for neither.
pub fn crop_to_match<T: Clone, U>(
    larger: ArrayView2<T>,
    smaller: ArrayView2<U>,
    larger_window: Option<&SubarrayMetadata>,
    smaller_window: Option<&SubarrayMetadata>,
) -> ToolkitResult<Array2<T>> {
    let (rows, cols) = smaller.dim();
    let (y0, x0) = match (larger_window, smaller_window) {
        (None, None) => (0, 0),
        (Some(big), Some(small)) => (
            small.start_y() - big.start_y(),
            small.start_x() - big.start_x(),
        ),
        _ => {
            return Err(ToolkitError::Configuration(
                "window metadata must be given for both images or neither".into(),
            ))
        }
    };
    debug!(
        "crop_to_match: {}x{} block at (y={}, x={}) of {:?}",
        rows,
        cols,
        y0,
        x0,
        larger.dim()
    );
    crop_block(larger, y0, x0, rows, cols)
}

/// Tightest box contained in every window.
pub fn find_intersection(windows: &[SubarrayMetadata]) -> ToolkitResult<FrameBounds> {
    let first = windows.first().ok_or_else(|| {
        ToolkitError::Configuration("cannot intersect an empty set of windows".into())
    })?;

    let init = FrameBounds {
        xmin: first.start_x(),
        xmax: first.start_x() + first.size_x() - 1,
        ymin: first.start_y(),
        ymax: first.start_y() + first.size_y() - 1,
    };
    let inclusive = windows.iter().skip(1).fold(init, |acc, window| FrameBounds {
        xmin: acc.xmin.max(window.start_x()),
        xmax: acc.xmax.min(window.start_x() + window.size_x() - 1),
        ymin: acc.ymin.max(window.start_y()),
        ymax: acc.ymax.min(window.start_y() + window.size_y() - 1),
    });

    // 1-based inclusive ends are 0-based exclusive ends; only the starts move.
    let bounds = FrameBounds {
        xmin: inclusive.xmin - 1,
        xmax: inclusive.xmax,
        ymin: inclusive.ymin - 1,
        ymax: inclusive.ymax,
    };
    if bounds.width() <= 0 || bounds.height() <= 0 {
        return Err(ToolkitError::OutOfBounds(format!(
            "{} windows do not overlap",
            windows.len()
        )));
    }
    debug!("find_intersection over {} windows: {:?}", windows.len(), bounds);
    Ok(bounds)
}

/// Crops an image read out through `window` down to absolute `bounds`.
pub fn crop_to_bounds<T: Clone>(
    image: ArrayView2<T>,
    window: &SubarrayMetadata,
    bounds: &FrameBounds,
) -> ToolkitResult<Array2<T>> {
    let start = to_local_frame(PixelCoordinate::new(bounds.xmin, bounds.ymin), window)?;
    to_local_frame(PixelCoordinate::new(bounds.xmax - 1, bounds.ymax - 1), window)?;
    crop_block(
        image,
        start.y,
        start.x,
        bounds.height() as usize,
        bounds.width() as usize,
    )
}

/// Square cutout of side `2 * radius + 1` around `center = (row, col)`.
/// The box must lie entirely inside `image`.
pub fn select_centered_subimage<T: Clone>(
    image: ArrayView2<T>,
    center: (usize, usize),
    radius: usize,
) -> ToolkitResult<Array2<T>> {
    let (row, col) = center;
    let (ny, nx) = image.dim();
    let leaves = |center: usize, len: usize| {
        center < radius || center.checked_add(radius).map_or(true, |end| end >= len)
    };
    if leaves(row, ny) || leaves(col, nx) {
        return Err(ToolkitError::OutOfBounds(format!(
            "box of radius {} around (row={}, col={}) exceeds image of shape ({}, {})",
            radius, row, col, ny, nx
        )));
    }
    let side = 2 * radius + 1;
    crop_block(
        image,
        (row - radius) as i64,
        (col - radius) as i64,
        side,
        side,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::subarray::MAX_EXTENT;

    fn window(start_x: i64, start_y: i64, size_x: i64, size_y: i64) -> SubarrayMetadata {
        SubarrayMetadata::new(start_x, start_y, size_x, size_y).unwrap()
    }

    #[test]
    fn first_brightsky_pixel_maps_to_local_origin() {
        let full = window(1, 1, 1032, 1024);
        assert_eq!(
            to_local_frame(PixelCoordinate::new(0, 0), &full).unwrap(),
            PixelCoordinate::new(0, 0)
        );
        let brightsky = window(453, 51, 512, 512);
        assert_eq!(
            to_local_frame(PixelCoordinate::new(452, 50), &brightsky).unwrap(),
            PixelCoordinate::new(0, 0)
        );
    }

    #[test]
    fn pixels_outside_brightsky_fail() {
        let brightsky = window(453, 51, 512, 512);
        for (x, y) in [(451, 50), (452, 49), (964, 561), (963, 562)] {
            assert!(matches!(
                to_local_frame(PixelCoordinate::new(x, y), &brightsky),
                Err(ToolkitError::OutOfBounds(_))
            ));
        }
    }

    #[test]
    fn local_then_absolute_is_identity() {
        let medium = window(256, 257, 512, 512);
        for (x, y) in [(255, 256), (500, 600), (766, 767)] {
            let absolute = PixelCoordinate::new(x, y);
            let local = to_local_frame(absolute, &medium).unwrap();
            assert_eq!(to_absolute_frame(local, &medium).unwrap(), absolute);
        }
    }

    #[test]
    fn crop_without_windows_starts_at_origin() {
        let small = Array2::<f64>::ones((10, 12));
        let mut big = Array2::<f64>::zeros((100, 120));
        big.slice_mut(s![..10, ..12]).fill(2.0);

        let cropped = crop_to_match(big.view(), small.view(), None, None).unwrap();
        assert_eq!(cropped.dim(), small.dim());
        assert!(cropped.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn crop_with_windows_offsets_by_origin_difference() {
        let small = Array2::<f64>::ones((10, 12));
        let mut big = Array2::<f64>::zeros((100, 120));
        big.slice_mut(s![4..14, 3..15]).fill(2.0);
        let big_window = window(1, 1, 120, 100);
        let small_window = window(4, 5, 12, 10);

        let cropped =
            crop_to_match(big.view(), small.view(), Some(&big_window), Some(&small_window))
                .unwrap();
        assert_eq!(cropped.dim(), small.dim());
        assert!(cropped.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn crop_with_one_window_is_a_configuration_error() {
        let small = Array2::<f64>::ones((10, 12));
        let big = Array2::<f64>::zeros((100, 120));
        let meta = window(1, 1, 120, 100);
        assert!(matches!(
            crop_to_match(big.view(), small.view(), Some(&meta), None),
            Err(ToolkitError::Configuration(_))
        ));
        assert!(matches!(
            crop_to_match(big.view(), small.view(), None, Some(&meta)),
            Err(ToolkitError::Configuration(_))
        ));
    }

    #[test]
    fn intersection_of_nested_windows() {
        let windows = [
            window(1, 1, 1032, 1024),
            window(256, 257, 512, 512),
            window(512, 534, 64, 70),
        ];
        let bounds = find_intersection(&windows).unwrap();
        assert_eq!(bounds.as_tuple(), ((511, 575), (533, 603)));
    }

    #[test]
    fn disjoint_windows_do_not_intersect() {
        let windows = [window(1, 1, 10, 10), window(20, 1, 10, 10)];
        assert!(matches!(
            find_intersection(&windows),
            Err(ToolkitError::OutOfBounds(_))
        ));
        assert!(matches!(
            find_intersection(&[]),
            Err(ToolkitError::Configuration(_))
        ));
    }

    #[test]
    fn crop_to_bounds_extracts_shared_region() {
        let big_window = window(1, 1, 40, 30);
        let small_window = window(11, 6, 8, 5);
        let image = Array2::from_shape_fn(big_window.shape(), |(y, x)| (y * 100 + x) as i64);
        let bounds = find_intersection(&[big_window, small_window]).unwrap();

        let cropped = crop_to_bounds(image.view(), &big_window, &bounds).unwrap();
        assert_eq!(cropped.dim(), small_window.shape());
        assert_eq!(cropped[[0, 0]], 5 * 100 + 10);
    }

    #[test]
    fn centered_subimage_covers_marked_region() {
        let mut big = Array2::<f64>::zeros((10, 10));
        big.slice_mut(s![2..9, 3..10]).fill(2.0);

        let sub = select_centered_subimage(big.view(), (5, 6), 3).unwrap();
        assert!(sub.iter().all(|&v| v == 2.0));
        assert_eq!(sub.sum(), big.sum());
    }

    #[test]
    fn centered_subimage_rejects_boxes_past_edges() {
        let big = Array2::<f64>::zeros((11, 11));
        assert!(select_centered_subimage(big.view(), (5, 5), 5).is_ok());
        for center in [(4, 5), (5, 4), (6, 5), (5, 6)] {
            assert!(matches!(
                select_centered_subimage(big.view(), center, 5),
                Err(ToolkitError::OutOfBounds(_))
            ));
        }
    }

    #[test]
    fn centered_subimage_with_huge_center_is_out_of_bounds() {
        let big = Array2::<f64>::zeros((11, 11));
        for center in [(usize::MAX, usize::MAX), (5, usize::MAX - 2)] {
            assert!(matches!(
                select_centered_subimage(big.view(), center, 5),
                Err(ToolkitError::OutOfBounds(_))
            ));
        }
    }

    #[test]
    fn extreme_absolute_pixels_are_out_of_bounds() {
        let brightsky = window(453, 51, 512, 512);
        for (x, y) in [(i64::MIN, 60), (500, i64::MIN), (i64::MAX, i64::MAX)] {
            assert!(matches!(
                to_local_frame(PixelCoordinate::new(x, y), &brightsky),
                Err(ToolkitError::OutOfBounds(_))
            ));
        }
    }

    #[test]
    fn widest_windows_still_intersect() {
        let widest = window(MAX_EXTENT, MAX_EXTENT, MAX_EXTENT, MAX_EXTENT);
        let bounds = find_intersection(&[widest, widest]).unwrap();
        assert_eq!(bounds.xmin, MAX_EXTENT - 1);
        assert_eq!(bounds.width(), MAX_EXTENT);
    }
}
