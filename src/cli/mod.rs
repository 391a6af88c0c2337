//! Command-line parsing for the ocean-color toolkit.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Flavor, PigmentSource};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "oc", version, about = "Ocean-color pigment fitting and spectral utilities")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit chlorophyll (+ extra pigment) coefficients to an absorption spectrum.
    Fit(FitArgs),
    /// Print a reference pigment absorption spectrum on a wavelength grid.
    Basis(BasisArgs),
    /// Write a synthetic absorption spectrum from known chlorophyll coefficients.
    Synth(SynthArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
    /// Extract spectra from a Tara Oceans table.
    Tara(TaraArgs),
    /// PCA of a Loisel+2023 Hydrolight set.
    Pca(PcaArgs),
}

/// Reference data location shared by commands that read pigment tables.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Directory holding bricaud.csv / clementson2019.csv (default: $OS_COLOR/data/ph).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Evenly spaced wavelength grid.
#[derive(Debug, Args, Clone)]
pub struct GridArgs {
    /// First wavelength (nm).
    #[arg(long, default_value_t = 400.0)]
    pub wave_min: f64,

    /// Last wavelength (nm).
    #[arg(long, default_value_t = 700.0)]
    pub wave_max: f64,

    /// Grid step (nm).
    #[arg(long, default_value_t = 1.0)]
    pub step: f64,
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// CSV with the observed absorption spectrum.
    #[arg(value_name = "CSV")]
    pub spectrum: PathBuf,

    /// Wavelength column name.
    #[arg(long, default_value = "wave")]
    pub wave_column: String,

    /// Absorption column name.
    #[arg(long, default_value = "a")]
    pub value_column: String,

    /// Reference pigment dataset.
    #[arg(short, long, value_enum, default_value_t = PigmentSource::Bricaud)]
    pub source: PigmentSource,

    /// CSV of extra pigment spectra (wavelength column + one column per pigment).
    #[arg(long, value_name = "CSV")]
    pub extras: Option<PathBuf>,

    /// Add the fixed Gaussian pigment bands as extra basis spectra.
    #[arg(long)]
    pub gaussian_bands: bool,

    #[command(flatten)]
    pub data: DataArgs,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export per-wavelength results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the fit (coefficients + covariance + fitted grid) to JSON.
    #[arg(long = "export-fit")]
    pub export_fit: Option<PathBuf>,
}

/// Options for printing a basis spectrum.
#[derive(Debug, Parser, Clone)]
pub struct BasisArgs {
    /// Reference dataset name (bricaud, clementson2019).
    #[arg(short, long, default_value = "bricaud")]
    pub source: String,

    /// Pigment type: a, b, c12, or another suffix of a `Chl-` column.
    #[arg(short, long, default_value = "a")]
    pub ctype: String,

    #[command(flatten)]
    pub grid: GridArgs,

    #[command(flatten)]
    pub data: DataArgs,
}

/// Options for synthetic spectra.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(value_name = "CSV")]
    pub output: PathBuf,

    /// Reference pigment dataset.
    #[arg(short, long, value_enum, default_value_t = PigmentSource::Bricaud)]
    pub source: PigmentSource,

    /// Chl-a, Chl-b, Chl-c12 coefficients.
    #[arg(long, value_delimiter = ',', default_values_t = [1.0, 0.3, 0.2])]
    pub coeffs: Vec<f64>,

    /// Gaussian noise as a fraction of each value.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Random seed for the noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub grid: GridArgs,

    #[command(flatten)]
    pub data: DataArgs,
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `oc fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for Tara Oceans tables.
#[derive(Debug, Parser, Clone)]
pub struct TaraArgs {
    /// Tara Oceans CSV table.
    #[arg(value_name = "CSV")]
    pub table: PathBuf,

    /// Spectrum flavor.
    #[arg(short, long, value_enum, default_value_t = Flavor::Ap)]
    pub flavor: Flavor,

    /// Use one row instead of the table average.
    #[arg(long)]
    pub row: Option<usize>,

    /// Keep NaN wavelengths of a single row.
    #[arg(long, requires = "row")]
    pub keep_nan: bool,

    /// Print per-row values averaged around this wavelength (nm) instead of a spectrum.
    #[arg(long, value_name = "NM")]
    pub single: Option<f64>,

    /// Full width of the `--single` window (nm).
    #[arg(long, default_value_t = 10.0)]
    pub window: f64,

    /// Interpolate the spectrum onto a grid with this step (nm).
    #[arg(long, value_name = "NM", conflicts_with = "rebin")]
    pub interp: Option<f64>,

    /// Bin the spectrum onto bins of this width (nm).
    #[arg(long, value_name = "NM")]
    pub rebin: Option<f64>,

    /// Render an ASCII plot of the spectrum.
    #[arg(long)]
    pub plot: bool,
}

/// Options for Hydrolight PCA.
#[derive(Debug, Parser, Clone)]
pub struct PcaArgs {
    /// First Hydrolight set index.
    #[arg(short = 'x', long, default_value_t = 4)]
    pub x: u32,

    /// Second Hydrolight set index.
    #[arg(short = 'y', long, default_value_t = 0)]
    pub y: u32,

    /// Components for absorption.
    #[arg(long, default_value_t = 3)]
    pub na: usize,

    /// Components for backscattering.
    #[arg(long, default_value_t = 3)]
    pub nb: usize,

    /// Data root (default: $OS_COLOR).
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Write PCA coefficients to this JSON file.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Initialize `env_logger` with a default level from `-v` count.
pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::try_parse_from(["oc", "fit", "spec.csv"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.source, PigmentSource::Bricaud);
        assert_eq!(args.value_column, "a");
        assert!(args.extras.is_none());
        assert!(!args.gaussian_bands);
    }

    #[test]
    fn source_accepts_alias() {
        let cli = Cli::try_parse_from(["oc", "fit", "spec.csv", "-s", "clementson"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.source, PigmentSource::Clementson2019);
        assert!(Cli::try_parse_from(["oc", "fit", "spec.csv", "-s", "gordon"]).is_err());
    }

    #[test]
    fn synth_coefficients_are_comma_separated() {
        let cli = Cli::try_parse_from(["oc", "-v", "synth", "out.csv", "--coeffs", "2,0.5,1"]).unwrap();
        assert_eq!(cli.verbose, 1);
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.coeffs, vec![2.0, 0.5, 1.0]);
        assert_eq!(args.grid.step, 1.0);
    }

    #[test]
    fn tara_interp_and_rebin_conflict() {
        assert!(Cli::try_parse_from(["oc", "tara", "t.csv", "--interp", "5", "--rebin", "5"]).is_err());
        assert!(Cli::try_parse_from(["oc", "tara", "t.csv", "--keep-nan"]).is_err());
    }
}
