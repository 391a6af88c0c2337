//! CSV exports: per-wavelength fit results and plain spectra.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts. Spectra are written in the layout `load_spectrum_csv` reads back
//! (`wave`, `<value>`, `sig_<value>`).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{SpectralResidual, Spectrum};
use crate::error::AppError;

/// Write per-wavelength residuals to a CSV file.
pub fn write_results_csv(path: &Path, residuals: &[SpectralResidual]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    let mut out = BufWriter::new(file);
    write_results(&mut out, residuals).map_err(|e| AppError::io(path, e))?;
    out.flush().map_err(|e| AppError::io(path, e))
}

fn write_results<W: Write>(out: &mut W, residuals: &[SpectralResidual]) -> std::io::Result<()> {
    writeln!(out, "wave_nm,observed,fitted,residual")?;
    for r in residuals {
        writeln!(
            out,
            "{:.3},{:.6e},{:.6e},{:.6e}",
            r.wave, r.observed, r.fitted, r.residual
        )?;
    }
    Ok(())
}

/// Write a spectrum as CSV to `out`.
pub fn write_spectrum<W: Write>(out: W, spectrum: &Spectrum, value_column: &str) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let sig_column = format!("sig_{value_column}");
    writer.write_record(["wave", value_column, sig_column.as_str()])?;
    for i in 0..spectrum.len() {
        let error = spectrum.errors.get(i).copied().unwrap_or(f64::NAN);
        writer.write_record([
            spectrum.wave[i].to_string(),
            fmt_cell(spectrum.values[i]),
            fmt_cell(error),
        ])?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write a spectrum to a CSV file.
pub fn write_spectrum_csv(path: &Path, spectrum: &Spectrum, value_column: &str) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    write_spectrum(BufWriter::new(file), spectrum, value_column)?;
    log::info!("Wrote {} points to {}", spectrum.len(), path.display());
    Ok(())
}

fn fmt_cell(v: f64) -> String {
    if v.is_finite() { v.to_string() } else { String::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::load_spectrum_csv;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = vec![SpectralResidual {
            wave: 440.0,
            observed: 0.02,
            fitted: 0.015,
            residual: 0.005,
        }];
        write_results_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "wave_nm,observed,fitted,residual");
        assert_eq!(lines[1], "440.000,2.000000e-2,1.500000e-2,5.000000e-3");
    }

    #[test]
    fn spectrum_csv_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.csv");
        let spectrum = Spectrum {
            wave: vec![440.0, 673.0],
            values: vec![0.031, 0.0125],
            errors: vec![0.001, f64::NAN],
        };
        write_spectrum_csv(&path, &spectrum, "a").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("wave,a,sig_a"));

        let back = load_spectrum_csv(&path, "wave", "a").unwrap();
        assert_eq!(back.wave, spectrum.wave);
        assert_eq!(back.values, spectrum.values);
        assert_eq!(back.errors[0], 0.001);
        assert!(back.errors[1].is_nan());
    }
}
