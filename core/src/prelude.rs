pub use crate::geometry::{FrameBounds, PixelCoordinate, SubarrayMetadata};
pub use crate::image::{MaskedImage, PixelCenter};
pub use crate::math::stats::{Reducer, Statistic};
pub use crate::processing::radial::ProfileConfig;

/// Common error type for every toolkit operation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolkitError {
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("domain error: {0}")]
    Domain(String),
}

pub type ToolkitResult<T> = Result<T, ToolkitError>;
