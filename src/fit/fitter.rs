//! Pigment absorption fit.
//!
//! Given:
//! - a wavelength grid `λ_i`
//! - an observed absorption spectrum `a_i` on that grid
//! - optional extra named basis spectra on the same grid
//!
//! we fit
//!
//! ```text
//! a(λ) ≈ c_a·chla(λ) + c_b·chlb(λ) + c_c·chlc12(λ) + Σ c_k·extra_k(λ)
//! ```
//!
//! by unconstrained nonlinear least squares. Coefficients are physically
//! expected to be non-negative but no bound is imposed, so a poor basis can
//! yield negative values.

use crate::data::chlorophyll_basis;
use crate::data::reference::ReferenceProvider;
use crate::domain::{BasisSpectrum, FitQuality, PigmentSource};
use crate::error::AppError;
use crate::math::{curve_fit, nearest_index};
use crate::models::PigmentModel;

/// Reference wavelength for the chlorophyll-a initial guess (nm).
pub const CHLA_REF_WAVE: f64 = 673.0;
/// Reference wavelength for the chlorophyll-b initial guess (nm).
pub const CHLB_REF_WAVE: f64 = 440.0;
/// Reference wavelength for the chlorophyll-c12 initial guess (nm).
pub const CHLC_REF_WAVE: f64 = 440.0;
/// Initial coefficient for every extra pigment.
pub const EXTRA_INITIAL_GUESS: f64 = 10.0;

/// Fitted pigment coefficients.
#[derive(Debug, Clone)]
pub struct PigmentFit {
    /// Basis names in parameter order.
    pub names: Vec<String>,
    pub initial_guess: Vec<f64>,
    pub coefficients: Vec<f64>,
    /// Model evaluated at the fitted coefficients.
    pub fitted: Vec<f64>,
    /// `P × P` covariance, row-major.
    pub covariance: Vec<Vec<f64>>,
    pub quality: FitQuality,
    pub n_evaluations: usize,
    pub termination: String,
}

impl PigmentFit {
    pub fn n_params(&self) -> usize {
        self.coefficients.len()
    }

    pub fn std_errors(&self) -> Vec<f64> {
        (0..self.n_params()).map(|i| self.covariance[i][i].sqrt()).collect()
    }
}

/// Fit chlorophyll-a/b/c12 (plus `extras`) from `source` to `a_obs`.
pub fn fit_a_chl(
    provider: &dyn ReferenceProvider,
    wave: &[f64],
    a_obs: &[f64],
    extras: &[BasisSpectrum],
    source: PigmentSource,
) -> Result<PigmentFit, AppError> {
    check_lengths(wave, a_obs, &[extras])?;
    let required = chlorophyll_basis(provider, wave, source)?;
    fit_pigments(wave, a_obs, required, extras)
}

/// Fit with caller-supplied chlorophyll basis spectra.
///
/// `required` must hold chl-a, chl-b and chl-c12 in that order.
pub fn fit_pigments(
    wave: &[f64],
    a_obs: &[f64],
    required: Vec<BasisSpectrum>,
    extras: &[BasisSpectrum],
) -> Result<PigmentFit, AppError> {
    check_lengths(wave, a_obs, &[&required, extras])?;
    if required.len() != 3 {
        return Err(AppError::fit(format!(
            "Expected 3 chlorophyll basis spectra, got {}.",
            required.len()
        )));
    }

    let p0 = initial_guess(wave, a_obs, &required, extras.len())?;
    log::debug!("Initial guess: {p0:?}");

    let mut basis = required;
    basis.extend(extras.iter().cloned());
    let model = PigmentModel::new(basis)?;

    let fit = curve_fit(&model, a_obs, &p0)?;

    let n = a_obs.len();
    let quality = FitQuality {
        sse: fit.sse,
        rmse: (fit.sse / n as f64).sqrt(),
        n,
    };
    let p = fit.params.len();
    let covariance = (0..p)
        .map(|i| (0..p).map(|j| fit.covariance[(i, j)]).collect())
        .collect();

    log::info!(
        "Pigment fit: {} coefficients, rmse={:.4e} ({})",
        p,
        quality.rmse,
        fit.termination
    );

    Ok(PigmentFit {
        names: model.names(),
        initial_guess: p0,
        fitted: model.predict(&fit.params),
        coefficients: fit.params,
        covariance,
        quality,
        n_evaluations: fit.n_evaluations,
        termination: fit.termination,
    })
}

/// Starting coefficients for the fit.
///
/// For each chlorophyll the observed/basis ratio at the grid point nearest its
/// reference wavelength; `EXTRA_INITIAL_GUESS` for every extra pigment.
pub fn initial_guess(
    wave: &[f64],
    a_obs: &[f64],
    required: &[BasisSpectrum],
    n_extra: usize,
) -> Result<Vec<f64>, AppError> {
    let ref_waves = [CHLA_REF_WAVE, CHLB_REF_WAVE, CHLC_REF_WAVE];
    let mut p0 = Vec::with_capacity(ref_waves.len() + n_extra);

    for (basis, &ref_wave) in required.iter().zip(ref_waves.iter()) {
        let idx = nearest_index(wave, ref_wave)
            .ok_or_else(|| AppError::fit("Wavelength grid is empty."))?;
        let (Some(&b), Some(&obs)) = (basis.values.get(idx), a_obs.get(idx)) else {
            return Err(AppError::fit(format!(
                "Basis '{}' or observed spectrum has no value at {ref_wave} nm.",
                basis.name
            )));
        };
        let norm = b / obs;
        p0.push(1.0 / norm);
    }
    p0.extend(std::iter::repeat_n(EXTRA_INITIAL_GUESS, n_extra));
    Ok(p0)
}

fn check_lengths(wave: &[f64], a_obs: &[f64], basis_sets: &[&[BasisSpectrum]]) -> Result<(), AppError> {
    if wave.is_empty() {
        return Err(AppError::fit("Wavelength grid is empty."));
    }
    if a_obs.len() != wave.len() {
        return Err(AppError::fit(format!(
            "Observed spectrum has {} values for {} wavelengths.",
            a_obs.len(),
            wave.len()
        )));
    }
    let mut all = basis_sets.iter().flat_map(|set| set.iter());
    if let Some(bad) = all.find(|b| b.values.len() != wave.len()) {
        return Err(AppError::fit(format!(
            "Basis spectrum '{}' has {} values for {} wavelengths.",
            bad.name,
            bad.values.len(),
            wave.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::gaussian_band;
    use crate::data::reference::{InMemoryReference, ReferenceTable};
    use crate::data::sample::wavelength_grid;
    use crate::models::PigmentModel;

    /// Smooth, clearly distinct chlorophyll-like shapes on 350..=750 nm.
    fn reference() -> InMemoryReference {
        let wave = wavelength_grid(350.0, 750.0, 2.0).unwrap();
        let mix = |bands: &[(f64, f64, f64)]| -> Vec<f64> {
            let mut out = vec![0.0; wave.len()];
            for &(amp, c, w) in bands {
                for (o, g) in out.iter_mut().zip(gaussian_band(&wave, c, w)) {
                    *o += amp * g;
                }
            }
            out
        };
        let mut cols = BTreeMap::new();
        cols.insert("Chl-a".to_string(), mix(&[(0.040, 438.0, 40.0), (0.020, 676.0, 25.0)]));
        cols.insert("Chl-b".to_string(), mix(&[(0.060, 470.0, 35.0), (0.015, 652.0, 20.0)]));
        cols.insert("Chl-c12".to_string(), mix(&[(0.050, 455.0, 30.0), (0.010, 635.0, 20.0)]));
        cols.insert("Fuco".to_string(), mix(&[(0.030, 520.0, 45.0)]));
        let table = ReferenceTable::new(PigmentSource::Bricaud, wave, cols).unwrap();
        InMemoryReference::new().with_table(table)
    }

    fn fit_grid() -> Vec<f64> {
        wavelength_grid(400.0, 700.0, 5.0).unwrap()
    }

    #[test]
    fn recovers_known_mixture() {
        let provider = reference();
        let wave = fit_grid();
        let basis = chlorophyll_basis(&provider, &wave, PigmentSource::Bricaud).unwrap();
        let truth = [2.0, 0.5, 1.0];
        let a_obs = PigmentModel::new(basis).unwrap().predict(&truth);

        let fit = fit_a_chl(&provider, &wave, &a_obs, &[], PigmentSource::Bricaud).unwrap();
        assert_eq!(fit.names, ["Chl-a", "Chl-b", "Chl-c12"]);
        for (got, want) in fit.coefficients.iter().zip(truth.iter()) {
            assert!(((got - want) / want).abs() < 1e-3, "got {got}, want {want}");
        }
        assert_eq!(fit.covariance.len(), 3);
        assert!(fit.covariance.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn recovers_mixture_with_extra_pigment() {
        let provider = reference();
        let wave = fit_grid();
        let extra = BasisSpectrum::new(
            "Fuco",
            crate::data::a_chl(
                &provider,
                &wave,
                &crate::domain::PigmentKind::Key("Fuco".into()),
                PigmentSource::Bricaud,
            )
            .unwrap(),
        );
        let mut basis = chlorophyll_basis(&provider, &wave, PigmentSource::Bricaud).unwrap();
        basis.push(extra.clone());
        let truth = [1.5, 0.3, 0.8, 0.6];
        let a_obs = PigmentModel::new(basis).unwrap().predict(&truth);

        let fit = fit_a_chl(&provider, &wave, &a_obs, &[extra], PigmentSource::Bricaud).unwrap();
        assert_eq!(fit.n_params(), 4);
        assert_eq!(fit.initial_guess[3], EXTRA_INITIAL_GUESS);
        for (got, want) in fit.coefficients.iter().zip(truth.iter()) {
            assert!(((got - want) / want).abs() < 1e-3, "got {got}, want {want}");
        }
    }

    #[test]
    fn extras_add_parameters_with_default_guess() {
        let provider = reference();
        let wave = fit_grid();
        let basis = chlorophyll_basis(&provider, &wave, PigmentSource::Bricaud).unwrap();
        let a_obs = PigmentModel::new(basis.clone()).unwrap().predict(&[1.0, 1.0, 1.0]);

        let extras: Vec<BasisSpectrum> = [520.0, 560.0]
            .iter()
            .map(|&c| BasisSpectrum::new(format!("G{c}"), gaussian_band(&wave, c, 30.0)))
            .collect();
        let p0 = initial_guess(&wave, &a_obs, &basis, extras.len()).unwrap();
        assert_eq!(p0.len(), 5);
        assert_eq!(&p0[3..], [10.0, 10.0]);

        let fit = fit_pigments(&wave, &a_obs, basis, &extras).unwrap();
        assert_eq!(fit.n_params(), 3 + extras.len());
        assert_eq!(fit.names[3], "G520");
    }

    #[test]
    fn initial_guess_is_observed_over_basis_at_reference_wavelengths() {
        let wave = vec![440.0, 600.0, 673.0];
        let a_obs = vec![0.8, 0.1, 0.6];
        let required = vec![
            BasisSpectrum::new("Chl-a", vec![0.1, 0.1, 0.2]),
            BasisSpectrum::new("Chl-b", vec![0.4, 0.1, 0.1]),
            BasisSpectrum::new("Chl-c12", vec![0.2, 0.1, 0.1]),
        ];
        let p0 = initial_guess(&wave, &a_obs, &required, 0).unwrap();
        assert!((p0[0] - 3.0).abs() < 1e-12);
        assert!((p0[1] - 2.0).abs() < 1e-12);
        assert!((p0[2] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn repeated_fits_are_identical() {
        let provider = reference();
        let wave = fit_grid();
        let basis = chlorophyll_basis(&provider, &wave, PigmentSource::Bricaud).unwrap();
        let a_obs: Vec<f64> = PigmentModel::new(basis)
            .unwrap()
            .predict(&[0.7, 0.2, 0.4])
            .iter()
            .enumerate()
            .map(|(i, v)| v * (1.0 + 0.01 * ((i % 3) as f64 - 1.0)))
            .collect();

        let a = fit_a_chl(&provider, &wave, &a_obs, &[], PigmentSource::Bricaud).unwrap();
        let b = fit_a_chl(&provider, &wave, &a_obs, &[], PigmentSource::Bricaud).unwrap();
        assert_eq!(a.coefficients, b.coefficients);
        assert_eq!(a.covariance, b.covariance);
    }

    #[test]
    fn mismatched_lengths_fail_the_fit() {
        let provider = reference();
        let wave = fit_grid();
        let err = fit_a_chl(&provider, &wave, &[0.1, 0.2], &[], PigmentSource::Bricaud).unwrap_err();
        assert!(matches!(err, AppError::FitFailure(_)));

        let short = BasisSpectrum::new("bad", vec![1.0]);
        let a_obs = vec![0.1; wave.len()];
        let err = fit_a_chl(&provider, &wave, &a_obs, &[short], PigmentSource::Bricaud).unwrap_err();
        assert!(matches!(err, AppError::FitFailure(_)));
    }

    #[test]
    fn short_chlorophyll_basis_fails_the_fit() {
        let wave = fit_grid();
        let a_obs = vec![0.1; wave.len()];
        let required = vec![
            BasisSpectrum::new("Chl-a", vec![0.1; 10]),
            BasisSpectrum::new("Chl-b", vec![0.1; 10]),
            BasisSpectrum::new("Chl-c12", vec![0.1; 10]),
        ];
        let err = fit_pigments(&wave, &a_obs, required.clone(), &[]).unwrap_err();
        assert!(matches!(err, AppError::FitFailure(ref m) if m.contains("Chl-a")));

        let err = initial_guess(&wave, &a_obs, &required, 0).unwrap_err();
        assert!(matches!(err, AppError::FitFailure(_)));
    }

    #[test]
    fn zero_basis_at_reference_wavelength_fails() {
        // Chl-a is zero at 673 nm: the initial guess is infinite.
        let wave = vec![440.0, 600.0, 673.0, 700.0];
        let a_obs = vec![0.8, 0.1, 0.6, 0.1];
        let required = vec![
            BasisSpectrum::new("Chl-a", vec![0.1, 0.1, 0.0, 0.0]),
            BasisSpectrum::new("Chl-b", vec![0.4, 0.1, 0.1, 0.0]),
            BasisSpectrum::new("Chl-c12", vec![0.2, 0.0, 0.1, 0.1]),
        ];
        let err = fit_pigments(&wave, &a_obs, required, &[]).unwrap_err();
        assert!(matches!(err, AppError::FitFailure(_)));
    }
}
