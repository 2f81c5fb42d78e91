use ndarray::{Array2, Axis};
use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Separable 2D FFT over a fixed `(rows, cols)` shape, wrapping cached
/// `rustfft` plans for each axis.
pub struct Fft2d {
    rows: usize,
    cols: usize,
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            rows,
            cols,
            row_forward: planner.plan_fft_forward(cols),
            row_inverse: planner.plan_fft_inverse(cols),
            col_forward: planner.plan_fft_forward(rows),
            col_inverse: planner.plan_fft_inverse(rows),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn forward(&self, input: &Array2<f64>) -> Array2<Complex64> {
        let mut buffer = input.mapv(|value| Complex64::new(value, 0.0));
        self.transform(&mut buffer, &self.row_forward, &self.col_forward);
        buffer
    }

    /// Inverse transform, normalised by `1 / (rows * cols)`.
    pub fn inverse(&self, spectrum: &mut Array2<Complex64>) {
        self.transform(spectrum, &self.row_inverse, &self.col_inverse);
        let norm = (self.rows * self.cols).max(1) as f64;
        spectrum.mapv_inplace(|value| value / norm);
    }

    fn transform(
        &self,
        data: &mut Array2<Complex64>,
        row_fft: &Arc<dyn Fft<f64>>,
        col_fft: &Arc<dyn Fft<f64>>,
    ) {
        debug_assert_eq!(data.dim(), (self.rows, self.cols));
        if self.rows == 0 || self.cols == 0 {
            return;
        }

        // Axis(1) lanes are rows, Axis(0) lanes are columns.
        for (axis, fft, len) in [(Axis(1), row_fft, self.cols), (Axis(0), col_fft, self.rows)] {
            let mut scratch = vec![Complex64::zero(); len];
            for mut lane in data.lanes_mut(axis) {
                for (dst, src) in scratch.iter_mut().zip(lane.iter()) {
                    *dst = *src;
                }
                fft.process(&mut scratch);
                for (dst, src) in lane.iter_mut().zip(scratch.iter()) {
                    *dst = *src;
                }
            }
        }
    }
}

/// Sample frequency of bin `index` for an `n`-point transform, in cycles
/// per sample, laid out the way `numpy.fft.fftfreq` orders them.
pub fn fft_frequency(index: usize, n: usize) -> f64 {
    let n_i = n as isize;
    let k = index as isize;
    let signed = if k < (n_i + 1) / 2 { k } else { k - n_i };
    signed as f64 / n as f64
}
