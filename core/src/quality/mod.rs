//! Packed data-quality flags: per-value and per-array bit decomposition,
//! recomposition, flag extraction and mask collapsing.

pub mod flags;
pub mod mask;

pub use flags::{
    decompose_array, decompose_bits, decompose_status, extract_flag, extract_flag_value,
    recompose_array, DqFlag, DQ_BITS,
};
pub use mask::{change_mask, combine_masks, MaskValue};
