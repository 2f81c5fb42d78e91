pub mod frame;
pub mod subarray;

pub use frame::{
    crop_to_bounds, crop_to_match, find_intersection, select_centered_subimage, to_absolute_frame,
    to_local_frame, FrameBounds,
};
pub use subarray::{PixelCoordinate, SubarrayMetadata, MAX_EXTENT, MIRI_FULL_FRAME};
