//! Detector-frame geometry and data-quality decoding for MIRI imaging.
//!
//! The engines are stateless: each call consumes borrowed arrays and
//! metadata and hands back freshly allocated results.

pub mod geometry;
pub mod image;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod quality;

pub use prelude::{ToolkitError, ToolkitResult};
