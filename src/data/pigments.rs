//! Pigment absorption basis spectra.
//!
//! - `a_chl`: chlorophyll (or other named pigment) absorption from a
//!   reference table, linearly interpolated onto arbitrary wavelengths with
//!   zero outside the tabulated range.
//! - `gaussian_bands`: the fixed set of Gaussian pigment absorption bands,
//!   usable as extra basis spectra in the pigment fit.

use crate::data::reference::ReferenceProvider;
use crate::domain::{BasisSpectrum, PigmentKind, PigmentSource};
use crate::error::AppError;
use crate::math::LinearInterpolator;

/// Gaussian band centers (nm).
pub const GAUSSIAN_PEAKS_NM: [f64; 12] = [
    406.0, 434.0, 453.0, 470.0, 492.0, 523.0, 550.0, 584.0, 617.0, 638.0, 660.0, 675.0,
];

/// Gaussian band full widths at half maximum (nm).
pub const GAUSSIAN_FWHM_NM: [f64; 12] = [
    37.68, 28.26, 28.26, 30.615, 37.68, 32.97, 32.97, 37.68, 30.615, 25.905, 25.905, 23.55,
];

/// Absorption of `kind` from `source`, evaluated at `wave`.
pub fn a_chl(
    provider: &dyn ReferenceProvider,
    wave: &[f64],
    kind: &PigmentKind,
    source: PigmentSource,
) -> Result<Vec<f64>, AppError> {
    let table = provider.load(source)?;
    let values = table.column(kind.column_key())?;
    let f = LinearInterpolator::new(&table.wave, values, 0.0)?;
    Ok(f.eval_many(wave))
}

/// Like [`a_chl`], with the pigment type and source given as strings.
///
/// The source name is validated before any table is loaded.
pub fn a_chl_named(
    provider: &dyn ReferenceProvider,
    wave: &[f64],
    ctype: &str,
    source: &str,
) -> Result<Vec<f64>, AppError> {
    let source: PigmentSource = source.parse()?;
    let kind: PigmentKind = ctype.parse()?;
    a_chl(provider, wave, &kind, source)
}

/// Chlorophyll-a, -b and -c12 basis spectra, in that order.
///
/// The reference table is loaded once for all three.
pub fn chlorophyll_basis(
    provider: &dyn ReferenceProvider,
    wave: &[f64],
    source: PigmentSource,
) -> Result<Vec<BasisSpectrum>, AppError> {
    let table = provider.load(source)?;
    PigmentKind::REQUIRED
        .iter()
        .map(|kind| {
            let f = LinearInterpolator::new(&table.wave, table.column(kind.column_key())?, 0.0)?;
            Ok(BasisSpectrum::new(kind.column_key(), f.eval_many(wave)))
        })
        .collect()
}

/// Unit-peak Gaussian band.
pub fn gaussian_band(wave: &[f64], center: f64, fwhm: f64) -> Vec<f64> {
    let sigma = fwhm / (2.0 * (2.0 * std::f64::consts::LN_2).sqrt());
    wave.iter()
        .map(|&w| (-0.5 * ((w - center) / sigma).powi(2)).exp())
        .collect()
}

/// All fixed Gaussian pigment bands, named `G<center>`.
pub fn gaussian_bands(wave: &[f64]) -> Vec<BasisSpectrum> {
    GAUSSIAN_PEAKS_NM
        .iter()
        .zip(GAUSSIAN_FWHM_NM.iter())
        .map(|(&c, &w)| BasisSpectrum::new(format!("G{c:.0}"), gaussian_band(wave, c, w)))
        .collect()
}
