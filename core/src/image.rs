use crate::prelude::{ToolkitError, ToolkitResult};
use crate::quality::change_mask;
use ndarray::{Array2, ArrayView2, Zip};

/// Image-space center, always given as (row, column) = (y, x).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCenter {
    pub y: f64,
    pub x: f64,
}

impl PixelCenter {
    pub fn new(y: f64, x: f64) -> Self {
        Self { y, x }
    }
}

impl From<(f64, f64)> for PixelCenter {
    fn from((y, x): (f64, f64)) -> Self {
        Self { y, x }
    }
}

impl From<(usize, usize)> for PixelCenter {
    fn from((y, x): (usize, usize)) -> Self {
        Self {
            y: y as f64,
            x: x as f64,
        }
    }
}

/// Sample values paired with a validity mask (`true` = excluded) and the
/// value reported for excluded pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedImage {
    data: Array2<f64>,
    mask: Array2<bool>,
    fill_value: f64,
}

impl MaskedImage {
    /// Wraps `data` with every pixel valid.
    pub fn new(data: Array2<f64>) -> Self {
        let mask = Array2::from_elem(data.raw_dim(), false);
        Self {
            data,
            mask,
            fill_value: f64::NAN,
        }
    }

    pub fn with_mask(data: Array2<f64>, mask: Array2<bool>) -> ToolkitResult<Self> {
        if data.dim() != mask.dim() {
            return Err(ToolkitError::Configuration(format!(
                "mask shape {:?} does not match data shape {:?}",
                mask.dim(),
                data.dim()
            )));
        }
        Ok(Self {
            data,
            mask,
            fill_value: f64::NAN,
        })
    }

    /// Masks every pixel whose DQ value survives `change_mask` with `exclude`.
    pub fn from_dq(data: Array2<f64>, dq: ArrayView2<i64>, exclude: &[i64]) -> ToolkitResult<Self> {
        let mask = change_mask(dq, exclude).mapv(|value| value != 0);
        Self::with_mask(data, mask)
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|&&masked| masked).count()
    }

    /// Copy of the data with excluded pixels replaced by the fill value.
    pub fn filled(&self) -> Array2<f64> {
        let fill = self.fill_value;
        let mut out = self.data.clone();
        Zip::from(&mut out).and(&self.mask).for_each(|value, &masked| {
            if masked {
                *value = fill;
            }
        });
        out
    }

    /// Iterates `((y, x), value)` over valid pixels only.
    pub fn valid_samples(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.data
            .indexed_iter()
            .zip(self.mask.iter())
            .filter(|(_, masked)| !**masked)
            .map(|((index, &value), _)| (index, value))
    }
}

impl From<Array2<f64>> for MaskedImage {
    fn from(data: Array2<f64>) -> Self {
        MaskedImage::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mismatched_mask_is_rejected() {
        let data = Array2::<f64>::zeros((3, 3));
        let mask = Array2::from_elem((2, 3), false);
        assert!(matches!(
            MaskedImage::with_mask(data, mask),
            Err(ToolkitError::Configuration(_))
        ));
    }

    #[test]
    fn filled_replaces_masked_pixels() {
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        let mask = array![[false, true], [false, false]];
        let image = MaskedImage::with_mask(data, mask).unwrap().with_fill_value(-1.0);
        assert_eq!(image.filled(), array![[1.0, -1.0], [3.0, 4.0]]);
        assert_eq!(image.masked_count(), 1);
        let valid: Vec<_> = image.valid_samples().collect();
        assert_eq!(valid, vec![((0, 0), 1.0), ((1, 0), 3.0), ((1, 1), 4.0)]);
    }

    #[test]
    fn dq_exclusions_leave_pixels_valid() {
        let data = Array2::<f64>::ones((2, 2));
        let dq = array![[0_i64, 2], [4, 6]];
        let image = MaskedImage::from_dq(data, dq.view(), &[2]).unwrap();
        assert_eq!(image.mask(), &array![[false, false], [true, true]]);
    }

    #[test]
    fn tuple_center_reads_row_then_column() {
        let center = PixelCenter::from((10_usize, 3_usize));
        assert_eq!(center.y, 10.0);
        assert_eq!(center.x, 3.0);
    }
}
