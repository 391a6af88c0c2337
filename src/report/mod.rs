//! Reporting utilities: residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::SpectralResidual;
use crate::error::AppError;

/// Pair observed and fitted values per wavelength.
pub fn compute_residuals(wave: &[f64], observed: &[f64], fitted: &[f64]) -> Result<Vec<SpectralResidual>, AppError> {
    if observed.len() != wave.len() || fitted.len() != wave.len() {
        return Err(AppError::input(format!(
            "Residuals need equal lengths (wave={}, observed={}, fitted={}).",
            wave.len(),
            observed.len(),
            fitted.len()
        )));
    }
    let mut out = Vec::with_capacity(wave.len());
    for ((&w, &obs), &fit) in wave.iter().zip(observed).zip(fitted) {
        if !fit.is_finite() {
            return Err(AppError::fit("Non-finite model prediction during residual computation."));
        }
        out.push(SpectralResidual {
            wave: w,
            observed: obs,
            fitted: fit,
            residual: obs - fit,
        });
    }
    Ok(out)
}

/// Wavelength with the largest absolute residual.
pub fn worst_residual(residuals: &[SpectralResidual]) -> Option<&SpectralResidual> {
    residuals
        .iter()
        .filter(|r| r.residual.is_finite())
        .max_by(|a, b| a.residual.abs().total_cmp(&b.residual.abs()))
}
