//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Reference dataset providing tabulated pigment absorption spectra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PigmentSource {
    /// Bricaud et al. chlorophyll-specific absorption.
    Bricaud,
    /// Clementson & Wojtasiewicz (2019) pigment absorption spectra.
    #[value(name = "clementson2019", alias = "clementson")]
    Clementson2019,
}

impl PigmentSource {
    pub fn name(self) -> &'static str {
        match self {
            PigmentSource::Bricaud => "bricaud",
            PigmentSource::Clementson2019 => "clementson2019",
        }
    }

    /// File name of the tabulated dataset inside the reference data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            PigmentSource::Bricaud => "bricaud.csv",
            PigmentSource::Clementson2019 => "clementson2019.csv",
        }
    }
}

impl fmt::Display for PigmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PigmentSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bricaud" => Ok(PigmentSource::Bricaud),
            "clementson" | "clementson2019" => Ok(PigmentSource::Clementson2019),
            _ => Err(AppError::UnsupportedSource(s.to_string())),
        }
    }
}

/// Which pigment column to read from a reference table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PigmentKind {
    ChlA,
    ChlB,
    ChlC12,
    /// Explicit column key, used verbatim.
    Key(String),
}

impl PigmentKind {
    pub const REQUIRED: [PigmentKind; 3] = [PigmentKind::ChlA, PigmentKind::ChlB, PigmentKind::ChlC12];

    pub fn column_key(&self) -> &str {
        match self {
            PigmentKind::ChlA => "Chl-a",
            PigmentKind::ChlB => "Chl-b",
            PigmentKind::ChlC12 => "Chl-c12",
            PigmentKind::Key(key) => key,
        }
    }
}

impl fmt::Display for PigmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_key())
    }
}

impl FromStr for PigmentKind {
    type Err = AppError;

    /// Parse a chlorophyll "ctype" (`a`, `b`, `c12`); any other value `x`
    /// selects the column `Chl-x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AppError::input("Empty pigment type."));
        }
        Ok(match s {
            "a" => PigmentKind::ChlA,
            "b" => PigmentKind::ChlB,
            "c12" => PigmentKind::ChlC12,
            other => PigmentKind::Key(format!("Chl-{other}")),
        })
    }
}

/// Tara spectrum flavor: particulate absorption or beam attenuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Ap,
    Cp,
}

impl Flavor {
    /// Column prefix in the Tara database (`ap400`, `cp532.5`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            Flavor::Ap => "ap",
            Flavor::Cp => "cp",
        }
    }
}

/// One absorption curve sampled on the fitting grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisSpectrum {
    pub name: String,
    pub values: Vec<f64>,
}

impl BasisSpectrum {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A spectrum with (optional-by-NaN) per-wavelength errors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Spectrum {
    /// Wavelengths (nm).
    pub wave: Vec<f64>,
    pub values: Vec<f64>,
    pub errors: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.wave.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wave.is_empty()
    }
}

/// Per-wavelength fitted value and residual.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralResidual {
    pub wave: f64,
    pub observed: f64,
    pub fitted: f64,
    /// `observed - fitted`.
    pub residual: f64,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
}

/// One pigment coefficient with its standard error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PigmentCoefficient {
    pub name: String,
    pub value: f64,
    /// `None` when the covariance is undefined (too few points).
    pub std_error: Option<f64>,
}

/// A saved pigment fit (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub source: PigmentSource,
    pub coefficients: Vec<PigmentCoefficient>,
    /// Non-finite entries are stored as `null`.
    pub covariance: Vec<Vec<Option<f64>>>,
    pub fit_quality: FitQuality,
    pub grid: FitGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitGrid {
    pub wave_nm: Vec<f64>,
    pub observed: Vec<f64>,
    pub fitted: Vec<f64>,
}

/// A full `oc fit` run configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub spectrum_path: PathBuf,
    pub wave_column: String,
    pub value_column: String,
    pub source: PigmentSource,
    /// Optional CSV of extra pigment spectra (`wave` + one column per pigment).
    pub extras_path: Option<PathBuf>,
    /// Add the fixed Gaussian pigment bands as extra basis spectra.
    pub gaussian_bands: bool,
    /// Reference data directory override (else `$OS_COLOR/data/ph`).
    pub data_dir: Option<PathBuf>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}
