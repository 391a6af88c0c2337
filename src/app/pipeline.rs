//! Shared "fit pipeline" logic behind `oc fit`.
//!
//! Keeping this in one place separates the workflow from presentation:
//! spectrum ingest -> extra basis spectra -> pigment fit -> residuals

use crate::data::{CsvReferenceProvider, ReferenceProvider, gaussian_bands};
use crate::domain::{BasisSpectrum, FitConfig, SpectralResidual, Spectrum};
use crate::error::AppError;
use crate::fit::{PigmentFit, fit_a_chl};
use crate::io::ingest::{load_basis_csv, load_spectrum_csv};
use crate::report::compute_residuals;

/// All computed outputs of a single `oc fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub spectrum: Spectrum,
    pub extras: Vec<BasisSpectrum>,
    pub fit: PigmentFit,
    pub residuals: Vec<SpectralResidual>,
}

/// Execute the full fitting pipeline with file-backed reference tables.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let provider = CsvReferenceProvider::resolve(config.data_dir.as_deref())?;
    log::info!("Reference tables: {}", provider.root().display());
    run_fit_with_provider(config, &provider)
}

/// Execute the fitting pipeline against any reference provider.
pub fn run_fit_with_provider(config: &FitConfig, provider: &dyn ReferenceProvider) -> Result<RunOutput, AppError> {
    // 1) Observed spectrum.
    let spectrum = load_spectrum_csv(&config.spectrum_path, &config.wave_column, &config.value_column)?;
    log::info!(
        "Loaded {} points from {}",
        spectrum.len(),
        config.spectrum_path.display()
    );

    // 2) Extra basis spectra on the observed grid.
    let mut extras = match &config.extras_path {
        Some(path) => load_basis_csv(path, &spectrum.wave)?,
        None => Vec::new(),
    };
    if config.gaussian_bands {
        extras.extend(gaussian_bands(&spectrum.wave));
    }
    if !extras.is_empty() {
        log::info!("Extra pigments: {}", extras.len());
    }

    // 3) Fit.
    let fit = fit_a_chl(provider, &spectrum.wave, &spectrum.values, &extras, config.source)?;

    // 4) Residuals.
    let residuals = compute_residuals(&spectrum.wave, &spectrum.values, &fit.fitted)?;

    Ok(RunOutput {
        spectrum,
        extras,
        fit,
        residuals,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::data::{SampleSpec, chlorophyll_basis, gaussian_band, synthesize_spectrum, wavelength_grid};
    use crate::domain::PigmentSource;
    use crate::io::export::write_spectrum_csv;

    fn write_reference(dir: &Path) {
        let wave = wavelength_grid(350.0, 750.0, 1.0).unwrap();
        let a = gaussian_band(&wave, 440.0, 50.0);
        let a2 = gaussian_band(&wave, 675.0, 25.0);
        let b = gaussian_band(&wave, 470.0, 40.0);
        let c = gaussian_band(&wave, 455.0, 30.0);
        let c2 = gaussian_band(&wave, 635.0, 20.0);

        let mut text = String::from("wave,Chl-a,Chl-b,Chl-c12\n");
        for i in 0..wave.len() {
            text.push_str(&format!(
                "{},{},{},{}\n",
                wave[i],
                0.04 * a[i] + 0.02 * a2[i],
                0.05 * b[i],
                0.03 * c[i] + 0.01 * c2[i]
            ));
        }
        fs::write(dir.join("clementson2019.csv"), text).unwrap();
    }

    fn config(dir: &Path) -> FitConfig {
        FitConfig {
            spectrum_path: dir.join("obs.csv"),
            wave_column: "wave".to_string(),
            value_column: "a".to_string(),
            source: PigmentSource::Clementson2019,
            extras_path: None,
            gaussian_bands: false,
            data_dir: Some(dir.to_path_buf()),
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_fit: None,
        }
    }

    #[test]
    fn fits_spectrum_from_files() {
        let dir = tempfile::tempdir().unwrap();
        write_reference(dir.path());

        let provider = CsvReferenceProvider::new(dir.path());
        let wave = wavelength_grid(400.0, 700.0, 2.0).unwrap();
        let basis = chlorophyll_basis(&provider, &wave, PigmentSource::Clementson2019).unwrap();
        let spec = SampleSpec {
            coefficients: vec![2.0, 0.5, 1.0],
            relative_noise: 0.0,
            seed: 1,
        };
        let obs = synthesize_spectrum(&wave, basis, &spec).unwrap();
        write_spectrum_csv(&dir.path().join("obs.csv"), &obs, "a").unwrap();

        let run = run_fit(&config(dir.path())).unwrap();
        assert_eq!(run.spectrum.len(), wave.len());
        assert_eq!(run.residuals.len(), wave.len());
        for (got, want) in run.fit.coefficients.iter().zip([2.0, 0.5, 1.0]) {
            assert!(((got - want) / want).abs() < 1e-3, "got {got}, want {want}");
        }
        assert!(run.residuals.iter().all(|r| r.residual.abs() < 1e-6));
    }

    #[test]
    fn gaussian_bands_extend_the_basis() {
        let dir = tempfile::tempdir().unwrap();
        write_reference(dir.path());

        let provider = CsvReferenceProvider::new(dir.path());
        let wave = wavelength_grid(400.0, 700.0, 2.0).unwrap();
        let mut basis = chlorophyll_basis(&provider, &wave, PigmentSource::Clementson2019).unwrap();
        basis.extend(gaussian_bands(&wave));
        let mut coefficients = vec![1.0, 0.4, 0.6];
        coefficients.extend((0..12).map(|i| 0.001 * (i + 1) as f64));
        let spec = SampleSpec {
            coefficients,
            relative_noise: 0.0,
            seed: 1,
        };
        let obs = synthesize_spectrum(&wave, basis, &spec).unwrap();
        write_spectrum_csv(&dir.path().join("obs.csv"), &obs, "a").unwrap();

        let mut cfg = config(dir.path());
        cfg.gaussian_bands = true;
        let run = run_fit(&cfg).unwrap();
        assert_eq!(run.extras.len(), 12);
        assert_eq!(run.fit.n_params(), 15);
        assert_eq!(run.fit.names[3], "G406");
        assert!(run.fit.initial_guess[3..].iter().all(|&g| g == 10.0));
    }

    #[test]
    fn missing_reference_table_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("obs.csv"), "wave,a\n440,0.1\n673,0.2\n").unwrap();
        let err = run_fit(&config(dir.path())).unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }
}
