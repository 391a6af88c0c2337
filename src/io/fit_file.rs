//! Read/write pigment fit JSON files.
//!
//! Fit JSON is the portable representation of a pigment fit:
//! - reference source, coefficients with standard errors, covariance
//! - fit quality
//! - observed and fitted values on the fitting grid for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::Utc;

use crate::domain::{FitFile, FitGrid, PigmentCoefficient, PigmentSource};
use crate::error::AppError;
use crate::fit::PigmentFit;

/// Assemble the JSON document for a fit.
pub fn build_fit_file(
    fit: &PigmentFit,
    source: PigmentSource,
    wave: &[f64],
    observed: &[f64],
) -> FitFile {
    let coefficients = fit
        .names
        .iter()
        .zip(fit.coefficients.iter())
        .zip(fit.std_errors())
        .map(|((name, &value), std_error)| PigmentCoefficient {
            name: name.clone(),
            value,
            std_error: finite(std_error),
        })
        .collect();

    FitFile {
        tool: "oc".to_string(),
        generated_at: Utc::now(),
        source,
        coefficients,
        covariance: fit
            .covariance
            .iter()
            .map(|row| row.iter().copied().map(finite).collect())
            .collect(),
        fit_quality: fit.quality.clone(),
        grid: FitGrid {
            wave_nm: wave.to_vec(),
            observed: observed.to_vec(),
            fitted: fit.fitted.clone(),
        },
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit_file: &FitFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), fit_file)?;
    Ok(())
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let fit: FitFile = serde_json::from_reader(std::io::BufReader::new(file))?;
    if fit.grid.wave_nm.len() != fit.grid.observed.len() || fit.grid.wave_nm.len() != fit.grid.fitted.len() {
        return Err(AppError::input(format!(
            "Fit JSON '{}' has mismatched grid lengths.",
            path.display()
        )));
    }
    Ok(fit)
}
