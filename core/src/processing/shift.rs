use crate::math::fft::{fft_frequency, Fft2d};
use crate::prelude::{ToolkitError, ToolkitResult};
use log::debug;
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Translates `image` by `dy` rows and `dx` columns using the Fourier
/// shift theorem. Content leaving one edge re-enters on the opposite edge.
pub fn shift(image: ArrayView2<f64>, dy: f64, dx: f64) -> ToolkitResult<Array2<f64>> {
    if !dy.is_finite() || !dx.is_finite() {
        return Err(ToolkitError::Configuration(format!(
            "shift must be finite, got (dy={}, dx={})",
            dy, dx
        )));
    }
    let (ny, nx) = image.dim();
    if ny == 0 || nx == 0 {
        return Ok(image.to_owned());
    }

    debug!("shift: {}x{} image by (dy={}, dx={})", ny, nx, dy, dx);

    let fft = Fft2d::new(ny, nx);
    let mut spectrum = fft.forward(&image.to_owned());

    let row_phase: Vec<f64> = (0..ny).map(|k| fft_frequency(k, ny) * dy).collect();
    let col_phase: Vec<f64> = (0..nx).map(|k| fft_frequency(k, nx) * dx).collect();
    for ((ky, kx), coefficient) in spectrum.indexed_iter_mut() {
        let phase = -2.0 * PI * (row_phase[ky] + col_phase[kx]);
        *coefficient *= Complex64::from_polar(1.0, phase);
    }

    fft.inverse(&mut spectrum);
    Ok(spectrum.mapv(|value| value.re))
}
