//! PCA of Loisel et al. (2023) Hydrolight absorption and backscattering.
//!
//! Data layout under the data root:
//!
//! ```text
//! data/Loisel2023/Hydrolight{X}{Y:02}/a.csv
//! data/Loisel2023/Hydrolight{X}{Y:02}/b.csv
//! data/Loisel2023/Hydrolight{X}{Y:02}/Rrs.csv
//! ```
//!
//! Each file has a header row and one row per simulated spectrum.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::io::ingest::load_matrix_csv;
use crate::math::Pca;

/// One Hydrolight simulation set.
#[derive(Debug, Clone)]
pub struct HydrolightData {
    /// Absorption, `n × n_wave`.
    pub a: DMatrix<f64>,
    /// Backscattering, `n × n_wave`.
    pub b: DMatrix<f64>,
    /// Remote-sensing reflectance, `n × n_wave`.
    pub rrs: DMatrix<f64>,
}

/// PCA scores of `a` and `b` plus the matching reflectances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrolightCoefficients {
    pub a: Vec<Vec<f64>>,
    pub b: Vec<Vec<f64>>,
    #[serde(rename = "Rs")]
    pub rs: Vec<Vec<f64>>,
}

/// Directory of the `Hydrolight{X}{Y:02}` set under `root`.
pub fn hydrolight_dir(root: &Path, x: u32, y: u32) -> PathBuf {
    root.join("data")
        .join("Loisel2023")
        .join(format!("Hydrolight{x}{y:02}"))
}

/// Load the `Hydrolight{X}{Y:02}` set under `root`.
pub fn load_hydrolight(root: &Path, x: u32, y: u32) -> Result<HydrolightData, AppError> {
    let dir = hydrolight_dir(root, x, y);
    log::info!("Loading Hydrolight set from {}", dir.display());
    let data = HydrolightData {
        a: load_matrix_csv(&dir.join("a.csv"))?,
        b: load_matrix_csv(&dir.join("b.csv"))?,
        rrs: load_matrix_csv(&dir.join("Rrs.csv"))?,
    };
    if data.a.nrows() != data.b.nrows() || data.a.nrows() != data.rrs.nrows() {
        return Err(AppError::input(format!(
            "Hydrolight{x}{y:02}: row counts differ (a={}, b={}, Rrs={}).",
            data.a.nrows(),
            data.b.nrows(),
            data.rrs.nrows()
        )));
    }
    Ok(data)
}

/// Fit separate PCAs to `a` (`na` components) and `b` (`nb` components).
pub fn fit_hydrolight(a: &DMatrix<f64>, b: &DMatrix<f64>, na: usize, nb: usize) -> Result<(Pca, Pca), AppError> {
    let pca_a = Pca::fit(a, na)?;
    let pca_b = Pca::fit(b, nb)?;
    log::info!(
        "Hydrolight PCA: a explains {:.4}, b explains {:.4}",
        pca_a.explained_variance_ratio.iter().sum::<f64>(),
        pca_b.explained_variance_ratio.iter().sum::<f64>()
    );
    Ok((pca_a, pca_b))
}

/// Scores of every spectrum in `data` under the fitted decompositions.
pub fn hydrolight_coefficients(pca_a: &Pca, pca_b: &Pca, data: &HydrolightData) -> Result<HydrolightCoefficients, AppError> {
    Ok(HydrolightCoefficients {
        a: rows(&pca_a.transform(&data.a)?),
        b: rows(&pca_b.transform(&data.b)?),
        rs: rows(&data.rrs),
    })
}

/// Write coefficients as JSON.
pub fn save_coefficients(path: &Path, coeffs: &HydrolightCoefficients) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    serde_json::to_writer(BufWriter::new(file), coeffs)?;
    log::info!("Wrote: {}", path.display());
    Ok(())
}

/// Load, fit and optionally save the coefficients of one Hydrolight set.
pub fn l23_hydrolight(
    root: &Path,
    x: u32,
    y: u32,
    na: usize,
    nb: usize,
    save_outputs: Option<&Path>,
) -> Result<(Pca, Pca), AppError> {
    let data = load_hydrolight(root, x, y)?;
    let (pca_a, pca_b) = fit_hydrolight(&data.a, &data.b, na, nb)?;
    if let Some(path) = save_outputs {
        let coeffs = hydrolight_coefficients(&pca_a, &pca_b, &data)?;
        save_coefficients(path, &coeffs)?;
    }
    Ok((pca_a, pca_b))
}

fn rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}
