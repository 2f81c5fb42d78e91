use ndarray::Array2;

/// Circular Gaussian spot of peak `amplitude` centred at `(cy, cx)`.
pub fn gaussian_spot(
    shape: (usize, usize),
    center: (f64, f64),
    sigma: f64,
    amplitude: f64,
) -> Array2<f64> {
    let (cy, cx) = center;
    let two_sigma_sq = 2.0 * sigma * sigma;
    Array2::from_shape_fn(shape, |(y, x)| {
        let dy = y as f64 - cy;
        let dx = x as f64 - cx;
        amplitude * (-(dx * dx + dy * dy) / two_sigma_sq).exp()
    })
}
