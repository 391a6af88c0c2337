//! Likelihood for Bayesian inversion of reflectance spectra.
//!
//! A forward model maps inherent optical property coefficients (`ab`) to a
//! remote-sensing reflectance spectrum. Observations carry a 5% relative
//! error. Sampling the posterior is left to an external ensemble sampler; this
//! module provides the log-probability and walker start positions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::AppError;

/// Relative 1σ error assumed on every reflectance value.
pub const RELATIVE_ERROR: f64 = 0.05;
pub const DEFAULT_WALKERS: usize = 32;

/// Predicts a reflectance spectrum from model inputs.
pub trait ForwardModel {
    /// Number of inputs (the sampling dimension).
    fn n_inputs(&self) -> usize;

    fn predict(&self, ab: &[f64]) -> Result<Vec<f64>, AppError>;
}

/// Gaussian log-likelihood of `rs` given `ab`, up to a constant.
pub fn log_prob<M: ForwardModel + ?Sized>(ab: &[f64], rs: &[f64], model: &M) -> Result<f64, AppError> {
    if ab.len() != model.n_inputs() {
        return Err(AppError::input(format!(
            "Model takes {} inputs, got {}.",
            model.n_inputs(),
            ab.len()
        )));
    }
    let pred = model.predict(ab)?;
    if pred.len() != rs.len() {
        return Err(AppError::input(format!(
            "Model predicts {} values for {} observations.",
            pred.len(),
            rs.len()
        )));
    }
    let chi2: f64 = pred
        .iter()
        .zip(rs)
        .map(|(p, r)| {
            let sig = RELATIVE_ERROR * r;
            (p - r).powi(2) / (sig * sig)
        })
        .sum();
    Ok(-0.5 * chi2)
}

/// `n_walkers` start positions drawn uniformly from `[0, 1)^ndim`.
pub fn initial_walkers(n_walkers: usize, ndim: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_walkers)
        .map(|_| (0..ndim).map(|_| rng.gen_range(0.0..1.0)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `Rs_i = ab[0] + ab[1]·i`.
    struct Line;

    impl ForwardModel for Line {
        fn n_inputs(&self) -> usize {
            2
        }

        fn predict(&self, ab: &[f64]) -> Result<Vec<f64>, AppError> {
            Ok((0..3).map(|i| ab[0] + ab[1] * i as f64).collect())
        }
    }

    #[test]
    fn perfect_prediction_has_zero_log_prob() {
        let rs = [1.0, 2.0, 3.0];
        assert_eq!(log_prob(&[1.0, 1.0], &rs, &Line).unwrap(), 0.0);
    }

    #[test]
    fn misfit_scales_with_relative_error() {
        // Off by 5% at the first point only: chi2 = 1.
        let rs = [1.0, 1.10, 1.15];
        let lp = log_prob(&[1.05, 0.05], &rs, &Line).unwrap();
        assert!((lp + 0.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_wrong_dimensions() {
        assert!(log_prob(&[1.0], &[1.0, 2.0, 3.0], &Line).is_err());
        assert!(log_prob(&[1.0, 1.0], &[1.0, 2.0], &Line).is_err());
    }

    #[test]
    fn walkers_are_seeded_uniform_draws() {
        let w = initial_walkers(DEFAULT_WALKERS, 3, 42);
        assert_eq!(w.len(), 32);
        assert!(w.iter().all(|p| p.len() == 3 && p.iter().all(|&v| (0.0..1.0).contains(&v))));
        assert_eq!(w, initial_walkers(DEFAULT_WALKERS, 3, 42));
    }
}
