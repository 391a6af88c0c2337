//! Synthetic absorption spectra from known pigment mixtures.
//!
//! Useful for checking that a fit recovers known coefficients and for
//! producing demo inputs (`oc synth`).

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{BasisSpectrum, Spectrum};
use crate::error::AppError;
use crate::models::PigmentModel;

/// How to build a synthetic spectrum.
#[derive(Debug, Clone)]
pub struct SampleSpec {
    /// One coefficient per basis spectrum.
    pub coefficients: Vec<f64>,
    /// Gaussian noise standard deviation as a fraction of each value.
    pub relative_noise: f64,
    pub seed: u64,
}

/// Mix `basis` with `spec.coefficients` and add seeded relative noise.
///
/// `errors` holds the noise standard deviation at each wavelength.
pub fn synthesize_spectrum(wave: &[f64], basis: Vec<BasisSpectrum>, spec: &SampleSpec) -> Result<Spectrum, AppError> {
    if basis.len() != spec.coefficients.len() {
        return Err(AppError::input(format!(
            "{} coefficients for {} basis spectra.",
            spec.coefficients.len(),
            basis.len()
        )));
    }
    if !(spec.relative_noise.is_finite() && spec.relative_noise >= 0.0) {
        return Err(AppError::input("Relative noise must be finite and >= 0."));
    }

    let model = PigmentModel::new(basis)?;
    let clean = model.predict(&spec.coefficients);
    if clean.len() != wave.len() {
        return Err(AppError::input(format!(
            "Basis spectra have {} values for {} wavelengths.",
            clean.len(),
            wave.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::input(format!("Noise distribution error: {e}")))?;

    let mut values = Vec::with_capacity(clean.len());
    let mut errors = Vec::with_capacity(clean.len());
    for &v in &clean {
        let sigma = spec.relative_noise * v.abs();
        let noise = if sigma > 0.0 { sigma * normal.sample(&mut rng) } else { 0.0 };
        values.push(v + noise);
        errors.push(sigma);
    }

    Ok(Spectrum {
        wave: wave.to_vec(),
        values,
        errors,
    })
}

/// Evenly spaced wavelength grid `[min, max]` with step `step` (inclusive of `max`
/// when it falls on the grid).
pub fn wavelength_grid(min: f64, max: f64, step: f64) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && step.is_finite() && step > 0.0 && max >= min) {
        return Err(AppError::input(format!(
            "Invalid wavelength grid: min={min}, max={max}, step={step}."
        )));
    }
    let n = ((max - min) / step + 1e-9).floor() as usize + 1;
    Ok((0..n).map(|i| min + step * i as f64).collect())
}
