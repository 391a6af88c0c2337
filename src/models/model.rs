//! Linear mixture of basis absorption spectra.
//!
//! ```text
//! predicted(λ) = Σ_k c_k · basis_k(λ)
//! ```
//!
//! The basis set is an ordered list built at call time (three chlorophylls
//! followed by any extra pigments), so the number of coefficients follows the
//! number of basis spectra instead of being fixed by a function signature.

use nalgebra::DMatrix;

use crate::domain::BasisSpectrum;
use crate::error::AppError;
use crate::math::ParametricModel;

#[derive(Debug, Clone)]
pub struct PigmentModel {
    basis: Vec<BasisSpectrum>,
    n_points: usize,
}

impl PigmentModel {
    /// Build a model from basis spectra that all share one wavelength grid.
    pub fn new(basis: Vec<BasisSpectrum>) -> Result<Self, AppError> {
        let Some(first) = basis.first() else {
            return Err(AppError::fit("Pigment model needs at least one basis spectrum."));
        };
        let n_points = first.values.len();
        if let Some(bad) = basis.iter().find(|b| b.values.len() != n_points) {
            return Err(AppError::fit(format!(
                "Basis spectrum '{}' has {} values, expected {}.",
                bad.name,
                bad.values.len(),
                n_points
            )));
        }
        Ok(Self { basis, n_points })
    }

    pub fn names(&self) -> Vec<String> {
        self.basis.iter().map(|b| b.name.clone()).collect()
    }

    /// Predicted absorption on the grid for the given coefficients.
    pub fn predict(&self, coeffs: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_points];
        self.eval(coeffs, &mut out);
        out
    }

    /// Design matrix `N × P` whose columns are the basis spectra.
    pub fn design_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.n_points, self.basis.len(), |i, k| self.basis[k].values[i])
    }
}

impl ParametricModel for PigmentModel {
    fn n_params(&self) -> usize {
        self.basis.len()
    }

    fn n_points(&self) -> usize {
        self.n_points
    }

    fn eval(&self, params: &[f64], out: &mut [f64]) {
        out.iter_mut().for_each(|v| *v = 0.0);
        for (c, b) in params.iter().zip(self.basis.iter()) {
            for (o, v) in out.iter_mut().zip(b.values.iter()) {
                *o += c * v;
            }
        }
    }

    fn jacobian(&self, _params: &[f64]) -> Option<DMatrix<f64>> {
        Some(self.design_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> PigmentModel {
        PigmentModel::new(vec![
            BasisSpectrum::new("a", vec![1.0, 0.0, 2.0]),
            BasisSpectrum::new("b", vec![0.0, 1.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn predict_is_weighted_sum() {
        let y = model().predict(&[2.0, 3.0]);
        assert_eq!(y, vec![2.0, 3.0, 7.0]);
    }

    #[test]
    fn design_matrix_columns_are_basis() {
        let m = model().design_matrix();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m[(2, 0)], 2.0);
        assert_eq!(m[(2, 1)], 1.0);
    }

    #[test]
    fn rejects_ragged_basis() {
        let err = PigmentModel::new(vec![
            BasisSpectrum::new("a", vec![1.0, 0.0]),
            BasisSpectrum::new("b", vec![0.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::FitFailure(_)));
        assert!(PigmentModel::new(Vec::new()).is_err());
    }
}
