//! Principal component analysis of spectra.
//!
//! Rows of the data matrix are samples (spectra), columns are features
//! (wavelengths). The decomposition is the SVD of the mean-centered data:
//!
//! ```text
//! X - μ = U S Vᵀ
//! ```
//!
//! Components are the rows of `Vᵀ` ordered by decreasing singular value, with
//! the sign fixed so the largest-magnitude loading of each component is
//! positive (deterministic output across runs and platforms).

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A fitted PCA decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    /// Per-feature mean of the training data (length `d`).
    pub mean: Vec<f64>,
    /// `k` components, each of length `d`.
    pub components: Vec<Vec<f64>>,
    /// Variance explained by each component, `s² / (n - 1)`.
    pub explained_variance: Vec<f64>,
    /// Fraction of the total variance explained by each component.
    pub explained_variance_ratio: Vec<f64>,
}

impl Pca {
    /// Fit `n_components` principal components to `data` (`n × d`).
    pub fn fit(data: &DMatrix<f64>, n_components: usize) -> Result<Self, AppError> {
        let (n, d) = data.shape();
        if n < 2 || d == 0 {
            return Err(AppError::input(format!(
                "PCA needs at least 2 samples and 1 feature (got {n}×{d})."
            )));
        }
        if n_components == 0 || n_components > n.min(d) {
            return Err(AppError::input(format!(
                "n_components={n_components} must be between 1 and min(n_samples, n_features)={}.",
                n.min(d)
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(AppError::input("PCA input contains non-finite values."));
        }

        let mean: DVector<f64> = DVector::from_iterator(d, data.column_iter().map(|c| c.mean()));
        let mut centered = data.clone();
        for mut row in centered.row_iter_mut() {
            row -= mean.transpose();
        }

        let svd = centered.svd(false, true);
        let v_t = svd
            .v_t
            .ok_or_else(|| AppError::input("SVD did not produce right singular vectors."))?;
        let singular: Vec<f64> = svd.singular_values.iter().copied().collect();

        let mut order: Vec<usize> = (0..singular.len()).collect();
        order.sort_by(|&a, &b| singular[b].total_cmp(&singular[a]));

        let denom = (n - 1) as f64;
        let total_variance: f64 = singular.iter().map(|s| s * s / denom).sum();

        let mut components = Vec::with_capacity(n_components);
        let mut explained_variance = Vec::with_capacity(n_components);
        for &k in order.iter().take(n_components) {
            let mut comp: Vec<f64> = v_t.row(k).iter().copied().collect();
            flip_sign(&mut comp);
            components.push(comp);
            explained_variance.push(singular[k] * singular[k] / denom);
        }
        let explained_variance_ratio = explained_variance
            .iter()
            .map(|v| if total_variance > 0.0 { v / total_variance } else { 0.0 })
            .collect();

        Ok(Self {
            mean: mean.iter().copied().collect(),
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Project samples (`m × d`) onto the components, giving `m × k` scores.
    pub fn transform(&self, data: &DMatrix<f64>) -> Result<DMatrix<f64>, AppError> {
        if data.ncols() != self.n_features() {
            return Err(AppError::input(format!(
                "PCA was fit with {} features but input has {}.",
                self.n_features(),
                data.ncols()
            )));
        }
        let k = self.n_components();
        Ok(DMatrix::from_fn(data.nrows(), k, |i, c| {
            data.row(i)
                .iter()
                .zip(self.mean.iter())
                .zip(self.components[c].iter())
                .map(|((x, m), w)| (x - m) * w)
                .sum()
        }))
    }

    /// Scores of a single spectrum.
    pub fn transform_one(&self, vec: &[f64]) -> Result<Vec<f64>, AppError> {
        let row = DMatrix::from_row_slice(1, vec.len(), vec);
        Ok(self.transform(&row)?.row(0).iter().copied().collect())
    }

    /// Project `vec` onto the components and map back to feature space.
    ///
    /// The training mean is not added back: the result is `scores · components`.
    pub fn reconstruct(&self, vec: &[f64]) -> Result<Vec<f64>, AppError> {
        let scores = self.transform_one(vec)?;
        let mut out = vec![0.0; self.n_features()];
        for (score, comp) in scores.iter().zip(self.components.iter()) {
            for (o, w) in out.iter_mut().zip(comp.iter()) {
                *o += score * w;
            }
        }
        Ok(out)
    }
}

/// Make the largest-magnitude entry positive.
fn flip_sign(comp: &mut [f64]) {
    let pivot = comp
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        comp.iter_mut().for_each(|v| *v = -*v);
    }
}
