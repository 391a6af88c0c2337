//! Piecewise-linear interpolation with a constant fill value outside the table.
//!
//! Reference pigment tables and Tara spectra are both resampled with this:
//! pigment basis spectra use `0.0` as fill, Tara regridding uses `NaN`.

use crate::error::AppError;

/// A sorted `(x, y)` table evaluated by linear interpolation.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    fill: f64,
}

impl LinearInterpolator {
    /// Build an interpolator. Pairs are sorted by `x`; non-finite `x` are dropped.
    pub fn new(xs: &[f64], ys: &[f64], fill: f64) -> Result<Self, AppError> {
        if xs.len() != ys.len() {
            return Err(AppError::input(format!(
                "Interpolation table length mismatch: {} x vs {} y.",
                xs.len(),
                ys.len()
            )));
        }

        let mut pairs: Vec<(f64, f64)> = xs
            .iter()
            .copied()
            .zip(ys.iter().copied())
            .filter(|(x, _)| x.is_finite())
            .collect();
        if pairs.len() < 2 {
            return Err(AppError::input("Interpolation table needs at least two points."));
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (xs, ys) = pairs.into_iter().unzip();
        Ok(Self { xs, ys, fill })
    }

    /// Evaluate at `x`. Outside `[x_min, x_max]` the fill value is returned.
    pub fn at(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let n = self.xs.len();
        if x < self.xs[0] || x > self.xs[n - 1] {
            return self.fill;
        }

        // First index with xs[i] >= x; x is inside the table so 0 <= hi < n.
        let hi = self.xs.partition_point(|&v| v < x);
        if self.xs[hi] == x {
            return self.ys[hi];
        }
        let lo = hi - 1;
        let t = (x - self.xs[lo]) / (self.xs[hi] - self.xs[lo]);
        self.ys[lo] * (1.0 - t) + self.ys[hi] * t
    }

    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.at(x)).collect()
    }

    pub fn range(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

/// One-shot helper: interpolate `(xs, ys)` onto `grid`.
pub fn interp_linear(xs: &[f64], ys: &[f64], grid: &[f64], fill: f64) -> Result<Vec<f64>, AppError> {
    Ok(LinearInterpolator::new(xs, ys, fill)?.eval_many(grid))
}

/// Index of the grid value nearest to `target` (first one on ties).
pub fn nearest_index(grid: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in grid.iter().enumerate() {
        let d = (v - target).abs();
        if d.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}
