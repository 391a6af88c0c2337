//! Spectra from Tara Oceans tables.
//!
//! A Tara table has one row per sample and one column per wavelength and
//! flavor (`ap400`, `cp532.5`, ...), each with a matching error column
//! (`sig_ap400`). Missing measurements are stored as `-9999` and become `NaN`
//! here.

use nalgebra::DMatrix;

use crate::domain::{Flavor, Spectrum};
use crate::error::AppError;
use crate::io::ingest::NumericTable;
use crate::math::interp_linear;

/// Fill value for missing measurements.
pub const FILL_VALUE: f64 = -9999.0;

/// Default full width of the `single_value` averaging window (nm).
pub const DEFAULT_WINDOW_NM: f64 = 10.0;

/// Spectra of every row of a table, wavelength-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectraSet {
    pub wave: Vec<f64>,
    /// `n_wave × n_rows`.
    pub values: DMatrix<f64>,
    /// `n_wave × n_rows`.
    pub errors: DMatrix<f64>,
}

/// Spectra binned onto a coarser wavelength grid, spectrum-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RebinnedSpectra {
    /// Bin centers (nm).
    pub wave: Vec<f64>,
    /// `n_spectra × n_bins`.
    pub values: DMatrix<f64>,
    /// `n_spectra × n_bins`.
    pub errors: DMatrix<f64>,
}

/// Wavelengths and matching column keys for `flavor`, sorted by wavelength.
///
/// A key matches when its first two characters are the flavor prefix and the
/// rest parses as a number. Prefixed keys with a non-numeric rest are skipped.
pub fn parse_wavelengths<'a>(keys: impl IntoIterator<Item = &'a str>, flavor: Flavor) -> (Vec<f64>, Vec<String>) {
    let prefix = flavor.prefix();
    let mut pairs: Vec<(f64, String)> = keys
        .into_iter()
        .filter_map(|key| {
            let rest = key.strip_prefix(prefix)?;
            match rest.trim().parse::<f64>() {
                Ok(wv) => Some((wv, key.to_string())),
                Err(_) => {
                    log::debug!("Skipping column '{key}': no wavelength after '{prefix}'");
                    None
                }
            }
        })
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.into_iter().unzip()
}

/// `true` when `v` is the `-9999` fill value (within `np.isclose` tolerance).
pub fn is_fill(v: f64) -> bool {
    (v - FILL_VALUE).abs() <= 1e-8 + 1e-5 * FILL_VALUE.abs()
}

fn mask_fill(v: f64) -> f64 {
    if is_fill(v) { f64::NAN } else { v }
}

/// Values and errors (`sig_<key>`) for `keys`, one matrix row per key.
pub fn spectra_from_keys(table: &NumericTable, keys: &[String]) -> Result<(DMatrix<f64>, DMatrix<f64>), AppError> {
    let n = table.n_rows();
    let mut values = DMatrix::from_element(keys.len(), n, f64::NAN);
    let mut errors = DMatrix::from_element(keys.len(), n, f64::NAN);
    for (i, key) in keys.iter().enumerate() {
        let v = table.column(key, "Tara table")?;
        let e = table.column(&format!("sig_{key}"), "Tara table")?;
        for j in 0..n {
            values[(i, j)] = mask_fill(v[j]);
            errors[(i, j)] = mask_fill(e[j]);
        }
    }
    Ok((values, errors))
}

/// All `flavor` spectra of a table.
pub fn spectra_from_table(table: &NumericTable, flavor: Flavor) -> Result<SpectraSet, AppError> {
    let (wave, keys) = parse_wavelengths(table.headers().iter().map(String::as_str), flavor);
    let (values, errors) = spectra_from_keys(table, &keys)?;
    Ok(SpectraSet { wave, values, errors })
}

/// Mean spectrum over all rows, ignoring `NaN`.
///
/// Wavelengths with no finite value in any row are dropped.
pub fn average_spectrum(table: &NumericTable, flavor: Flavor) -> Result<Spectrum, AppError> {
    let set = spectra_from_table(table, flavor)?;
    let mut out = Spectrum::default();
    for (i, &wv) in set.wave.iter().enumerate() {
        let value = nanmean(set.values.row(i).iter().copied());
        if !value.is_finite() {
            continue;
        }
        out.wave.push(wv);
        out.values.push(value);
        out.errors.push(nanmean(set.errors.row(i).iter().copied()));
    }
    log::debug!("Average {flavor:?} spectrum: {} of {} wavelengths", out.len(), set.wave.len());
    Ok(out)
}

/// The `flavor` spectrum of one row.
///
/// Unless `keep_nan`, wavelengths with a non-finite value are dropped.
pub fn spectrum_from_row(table: &NumericTable, row: usize, flavor: Flavor, keep_nan: bool) -> Result<Spectrum, AppError> {
    if row >= table.n_rows() {
        return Err(AppError::input(format!(
            "Row {row} out of range (table has {} rows).",
            table.n_rows()
        )));
    }
    let (wave, keys) = parse_wavelengths(table.headers().iter().map(String::as_str), flavor);
    let mut out = Spectrum::default();
    for (wv, key) in wave.into_iter().zip(keys.iter()) {
        let value = mask_fill(table.column(key, "Tara table")?[row]);
        let error = mask_fill(table.column(&format!("sig_{key}"), "Tara table")?[row]);
        if !keep_nan && !value.is_finite() {
            continue;
        }
        out.wave.push(wv);
        out.values.push(value);
        out.errors.push(error);
    }
    Ok(out)
}

/// Per-row mean value and error over `wv_cen ± wv_delta/2`.
pub fn single_value(
    table: &NumericTable,
    wv_cen: f64,
    wv_delta: f64,
    flavor: Flavor,
) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let (wave, keys) = parse_wavelengths(table.headers().iter().map(String::as_str), flavor);
    let lo = wv_cen - wv_delta / 2.0;
    let hi = wv_cen + wv_delta / 2.0;
    let keys: Vec<String> = wave
        .iter()
        .zip(keys)
        .filter(|&(&wv, _)| wv >= lo && wv <= hi)
        .map(|(_, k)| k)
        .collect();
    if keys.is_empty() {
        log::warn!("No {flavor:?} wavelengths within [{lo}, {hi}] nm");
    }

    let (values, errors) = spectra_from_keys(table, &keys)?;
    let value = (0..table.n_rows())
        .map(|j| nanmean(values.column(j).iter().copied()))
        .collect();
    let sig = (0..table.n_rows())
        .map(|j| nanmean(errors.column(j).iter().copied()))
        .collect();
    Ok((value, sig))
}

/// Linear interpolation of values and errors onto `grid`; `NaN` outside.
pub fn interpolate_to_grid(
    wave: &[f64],
    values: &[f64],
    errors: &[f64],
    grid: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    Ok((
        interp_linear(wave, values, grid, f64::NAN)?,
        interp_linear(wave, errors, grid, f64::NAN)?,
    ))
}

/// Bin spectra onto the bins `[grid[i], grid[i+1])`.
///
/// `values` and `errors` are `n_wave × n_spectra`. Each bin holds the mean of
/// the finite values inside it (errors averaged over the same samples); empty
/// bins are `NaN`.
pub fn rebin_to_grid(
    wave: &[f64],
    values: &DMatrix<f64>,
    errors: &DMatrix<f64>,
    grid: &[f64],
) -> Result<RebinnedSpectra, AppError> {
    if grid.len() < 2 {
        return Err(AppError::input("Rebin grid needs at least two edges."));
    }
    if values.nrows() != wave.len() || errors.shape() != values.shape() {
        return Err(AppError::input(format!(
            "Rebin shapes disagree: {} wavelengths, values {:?}, errors {:?}.",
            wave.len(),
            values.shape(),
            errors.shape()
        )));
    }

    let n_spec = values.ncols();
    let n_bins = grid.len() - 1;
    let mut out_wave = Vec::with_capacity(n_bins);
    let mut out_values = DMatrix::from_element(n_spec, n_bins, f64::NAN);
    let mut out_errors = DMatrix::from_element(n_spec, n_bins, f64::NAN);

    for (b, edges) in grid.windows(2).enumerate() {
        let (w0, w1) = (edges[0], edges[1]);
        out_wave.push((w0 + w1) / 2.0);
        let rows: Vec<usize> = (0..wave.len()).filter(|&i| wave[i] >= w0 && wave[i] < w1).collect();

        for s in 0..n_spec {
            let mut n = 0usize;
            let mut v_sum = 0.0;
            let mut e_sum = 0.0;
            for &i in &rows {
                let v = values[(i, s)];
                if !v.is_finite() {
                    continue;
                }
                n += 1;
                v_sum += v;
                let e = errors[(i, s)];
                if e.is_finite() {
                    e_sum += e;
                }
            }
            if n > 0 {
                out_values[(s, b)] = v_sum / n as f64;
                out_errors[(s, b)] = e_sum / n as f64;
            }
        }
    }

    Ok(RebinnedSpectra {
        wave: out_wave,
        values: out_values,
        errors: out_errors,
    })
}

fn nanmean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, v: &[f64]) -> (String, Vec<f64>) {
        (name.to_string(), v.to_vec())
    }

    /// Two rows, `ap` at 410/400/420 (unsorted headers) plus one `cp` column.
    fn table() -> NumericTable {
        NumericTable::from_columns(vec![
            col("lat", &[10.0, 20.0]),
            col("ap410", &[0.02, -9999.0]),
            col("sig_ap410", &[0.002, -9999.0]),
            col("ap400", &[0.01, 0.03]),
            col("sig_ap400", &[0.001, 0.003]),
            col("ap420", &[-9999.0, -9999.0]),
            col("sig_ap420", &[0.1, 0.1]),
            col("cp532.5", &[0.5, 0.7]),
            col("sig_cp532.5", &[0.05, 0.07]),
        ])
        .unwrap()
    }

    #[test]
    fn parses_and_sorts_wavelengths() {
        let t = table();
        let (wave, keys) = parse_wavelengths(t.headers().iter().map(String::as_str), Flavor::Ap);
        assert_eq!(wave, vec![400.0, 410.0, 420.0]);
        assert_eq!(keys, ["ap400", "ap410", "ap420"]);

        let (wave, _) = parse_wavelengths(["cp532.5", "cpx", "sig_cp1"], Flavor::Cp);
        assert_eq!(wave, vec![532.5]);

        let (wave, keys) = parse_wavelengths(["apXYZ", "ap400", "ap"], Flavor::Ap);
        assert_eq!(wave, vec![400.0]);
        assert_eq!(keys, ["ap400"]);
    }

    #[test]
    fn fill_value_is_masked() {
        assert!(is_fill(-9999.0));
        assert!(is_fill(-9999.05));
        assert!(!is_fill(-9998.0));

        let set = spectra_from_table(&table(), Flavor::Ap).unwrap();
        assert_eq!(set.values.shape(), (3, 2));
        assert!(set.values[(1, 1)].is_nan());
        assert!(set.values[(2, 0)].is_nan());
        assert_eq!(set.errors[(2, 0)], 0.1);
    }

    #[test]
    fn average_ignores_nan_and_drops_empty_wavelengths() {
        let avg = average_spectrum(&table(), Flavor::Ap).unwrap();
        assert_eq!(avg.wave, vec![400.0, 410.0]);
        assert!((avg.values[0] - 0.02).abs() < 1e-15);
        assert_eq!(avg.values[1], 0.02);
        assert!((avg.errors[0] - 0.002).abs() < 1e-15);
    }

    #[test]
    fn row_spectrum_optionally_keeps_nan() {
        let t = table();
        let s = spectrum_from_row(&t, 1, Flavor::Ap, false).unwrap();
        assert_eq!(s.wave, vec![400.0]);
        let s = spectrum_from_row(&t, 1, Flavor::Ap, true).unwrap();
        assert_eq!(s.wave, vec![400.0, 410.0, 420.0]);
        assert!(s.values[1].is_nan());
        assert!(spectrum_from_row(&t, 2, Flavor::Ap, false).is_err());
    }

    #[test]
    fn single_value_averages_window() {
        let (value, sig) = single_value(&table(), 405.0, DEFAULT_WINDOW_NM, Flavor::Ap).unwrap();
        assert!((value[0] - 0.015).abs() < 1e-15);
        assert_eq!(value[1], 0.03);
        assert!((sig[0] - 0.0015).abs() < 1e-15);

        let (value, _) = single_value(&table(), 700.0, DEFAULT_WINDOW_NM, Flavor::Ap).unwrap();
        assert!(value.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn missing_error_column_is_reported() {
        let t = NumericTable::from_columns(vec![col("ap400", &[0.1])]).unwrap();
        let err = spectra_from_table(&t, Flavor::Ap).unwrap_err();
        assert!(matches!(err, AppError::MissingColumn { ref column, .. } if column == "sig_ap400"));
    }

    #[test]
    fn interpolation_fills_nan_outside() {
        let (v, e) = interpolate_to_grid(&[400.0, 410.0], &[1.0, 2.0], &[0.1, 0.3], &[395.0, 405.0, 410.0]).unwrap();
        assert!(v[0].is_nan());
        assert_eq!(v[1], 1.5);
        assert_eq!(v[2], 2.0);
        assert!((e[1] - 0.2).abs() < 1e-15);
    }

    #[test]
    fn rebin_means_finite_values_per_bin() {
        let wave = [400.0, 402.0, 405.0, 410.0];
        let values = DMatrix::from_row_slice(4, 2, &[
            1.0, 5.0,
            3.0, f64::NAN,
            9.0, 7.0,
            4.0, 4.0,
        ]);
        let errors = DMatrix::from_element(4, 2, 0.5);
        let out = rebin_to_grid(&wave, &values, &errors, &[400.0, 405.0, 410.0, 415.0, 420.0]).unwrap();

        assert_eq!(out.wave, vec![402.5, 407.5, 412.5, 417.5]);
        assert_eq!(out.values.shape(), (2, 4));
        assert_eq!(out.values[(0, 0)], 2.0);
        assert_eq!(out.values[(1, 0)], 5.0);
        assert_eq!(out.values[(0, 1)], 9.0);
        assert_eq!(out.values[(0, 2)], 4.0);
        assert!(out.values[(0, 3)].is_nan());
        assert_eq!(out.errors[(1, 0)], 0.5);
    }
}
