use crate::prelude::{ToolkitError, ToolkitResult};
use ndarray::{Array2, ArrayView2, Zip};

/// Element types that can act as a mask: anything non-zero is masked.
pub trait MaskValue: Copy {
    fn is_masked(self) -> bool;
}

impl MaskValue for bool {
    fn is_masked(self) -> bool {
        self
    }
}

macro_rules! impl_mask_value {
    ($($ty:ty),*) => {
        $(
            impl MaskValue for $ty {
                fn is_masked(self) -> bool {
                    self != (0 as $ty)
                }
            }
        )*
    };
}

impl_mask_value!(u8, u16, u32, i32, i64, f32, f64);

/// Collapses a DQ-style mask to 0/1, clearing pixels whose value is listed
/// in `exclude`.
pub fn change_mask(mask: ArrayView2<i64>, exclude: &[i64]) -> Array2<u8> {
    mask.mapv(|value| {
        if value == 0 || exclude.contains(&value) {
            0
        } else {
            1
        }
    })
}

/// Logical OR of every mask.
pub fn combine_masks<T: MaskValue>(masks: &[ArrayView2<T>]) -> ToolkitResult<Array2<bool>> {
    let first = masks
        .first()
        .ok_or_else(|| ToolkitError::Configuration("no masks to combine".into()))?;
    let mut combined = first.mapv(MaskValue::is_masked);
    for mask in &masks[1..] {
        if mask.dim() != combined.dim() {
            return Err(ToolkitError::Configuration(format!(
                "mask shape {:?} does not match {:?}",
                mask.dim(),
                combined.dim()
            )));
        }
        Zip::from(&mut combined).and(mask).for_each(|out, &value| {
            *out |= value.is_masked();
        });
    }
    Ok(combined)
}
