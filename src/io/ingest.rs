//! CSV ingest for numeric spectral tables.
//!
//! Every CSV this crate reads (observed spectra, extra pigment spectra,
//! reference pigment tables, Tara Oceans tables, PCA matrices) is a header row
//! followed by numeric cells. This module turns such a file into a
//! column-oriented [`NumericTable`]:
//!
//! - headers are trimmed and stripped of a UTF-8 BOM
//! - cells that are empty or not numbers become `NaN`
//! - records with the wrong number of fields are skipped and reported

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use nalgebra::DMatrix;

use crate::domain::{BasisSpectrum, Spectrum};
use crate::error::AppError;
use crate::math::interp_linear;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Column-oriented numeric CSV contents.
#[derive(Debug, Clone, Default)]
pub struct NumericTable {
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
    n_rows: usize,
    pub row_errors: Vec<RowError>,
}

impl NumericTable {
    /// Build a table from named columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self, AppError> {
        let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((name, v)) = columns.iter().find(|(_, v)| v.len() != n_rows) {
            return Err(AppError::input(format!(
                "Column '{name}' has {} rows, expected {n_rows}.",
                v.len()
            )));
        }
        let (headers, columns) = columns.into_iter().unzip();
        Ok(Self {
            headers,
            columns,
            n_rows,
            row_errors: Vec::new(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    /// Column by exact header name.
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Column by exact header name, or a `MissingColumn` error.
    pub fn column(&self, name: &str, context: &str) -> Result<&[f64], AppError> {
        self.get(name).ok_or_else(|| AppError::MissingColumn {
            column: name.to_string(),
            context: context.to_string(),
        })
    }

    /// First header matching any of `names`, case-insensitively.
    pub fn find_header(&self, names: &[&str]) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
            .map(String::as_str)
    }

    /// Cell value at `(row, column name)`.
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        self.get(name).and_then(|c| c.get(row).copied())
    }

    /// All columns as a row-major `n_rows × n_cols` matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.n_rows, self.n_cols(), |i, j| self.columns[j][i])
    }
}

/// Load a numeric CSV file.
pub fn load_table(path: &Path) -> Result<NumericTable, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let table = read_table(file)?;
    if !table.row_errors.is_empty() {
        log::warn!(
            "{}: skipped {} malformed rows",
            path.display(),
            table.row_errors.len()
        );
    }
    log::debug!(
        "{}: {} rows x {} columns",
        path.display(),
        table.n_rows(),
        table.n_cols()
    );
    Ok(table)
}

/// Read a numeric CSV from any reader.
pub fn read_table<R: Read>(reader: R) -> Result<NumericTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header_name).collect();
    if headers.is_empty() {
        return Err(AppError::NoData("CSV has no header row.".to_string()));
    }

    let mut columns = vec![Vec::new(); headers.len()];
    let mut row_errors = Vec::new();
    let mut n_rows = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header and CSV lines are 1-based.
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        if record.len() != headers.len() {
            row_errors.push(RowError {
                line,
                message: format!("Expected {} fields, found {}.", headers.len(), record.len()),
            });
            continue;
        }
        push_record(&record, &mut columns);
        n_rows += 1;
    }

    Ok(NumericTable {
        headers,
        columns,
        n_rows,
        row_errors,
    })
}

/// Load an observed spectrum from `wave_column` / `value_column`.
///
/// Rows with a non-finite wavelength or value are dropped. An optional
/// `sig_<value_column>` column provides per-wavelength errors.
pub fn load_spectrum_csv(path: &Path, wave_column: &str, value_column: &str) -> Result<Spectrum, AppError> {
    let table = load_table(path)?;
    let context = path.display().to_string();
    let wave = table.column(wave_column, &context)?;
    let values = table.column(value_column, &context)?;
    let errors = table.get(&format!("sig_{value_column}"));

    let mut spectrum = Spectrum::default();
    for i in 0..table.n_rows() {
        if !(wave[i].is_finite() && values[i].is_finite()) {
            continue;
        }
        spectrum.wave.push(wave[i]);
        spectrum.values.push(values[i]);
        spectrum.errors.push(errors.map(|e| e[i]).unwrap_or(f64::NAN));
    }

    if spectrum.is_empty() {
        return Err(AppError::NoData(format!(
            "No finite ({wave_column}, {value_column}) rows in {context}."
        )));
    }
    Ok(spectrum)
}

/// Load extra basis spectra and resample them onto `grid`.
///
/// The file has a wavelength column (`wave`, `wavelength` or `lambda`) and one
/// column per pigment. Values outside a pigment's tabulated range are `0`.
pub fn load_basis_csv(path: &Path, grid: &[f64]) -> Result<Vec<BasisSpectrum>, AppError> {
    let table = load_table(path)?;
    let context = path.display().to_string();
    let wave_name = table
        .find_header(&WAVE_HEADERS)
        .ok_or_else(|| AppError::MissingColumn {
            column: "wave".to_string(),
            context: context.clone(),
        })?
        .to_string();
    let wave = table.column(&wave_name, &context)?;

    table
        .headers()
        .iter()
        .filter(|h| **h != wave_name)
        .map(|name| {
            let values = table.column(name, &context)?;
            Ok(BasisSpectrum::new(name.clone(), interp_linear(wave, values, grid, 0.0)?))
        })
        .collect()
}

/// Load a matrix of spectra: one row per sample, one column per wavelength.
pub fn load_matrix_csv(path: &Path) -> Result<DMatrix<f64>, AppError> {
    let table = load_table(path)?;
    if table.n_rows() == 0 {
        return Err(AppError::NoData(format!("{} has no data rows.", path.display())));
    }
    Ok(table.to_matrix())
}

/// Accepted names for wavelength columns.
pub const WAVE_HEADERS: [&str; 4] = ["wave", "wavelength", "lambda", "wv_nm"];

fn push_record(record: &StringRecord, columns: &mut [Vec<f64>]) {
    for (col, cell) in columns.iter_mut().zip(record.iter()) {
        col.push(parse_cell(cell));
    }
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, column lookups fail.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_cell(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_columns_and_masks_non_numeric_cells() {
        let csv = "\u{feff}wave,ap400,label\n400,0.1,x\n410,,y\n";
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.headers(), ["wave", "ap400", "label"]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.get("wave").unwrap(), [400.0, 410.0]);
        assert!(table.value(1, "ap400").unwrap().is_nan());
        assert!(table.value(0, "label").unwrap().is_nan());
    }

    #[test]
    fn skips_ragged_rows() {
        let csv = "a,b\n1,2\n3\n4,5\n";
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.row_errors.len(), 1);
        assert_eq!(table.row_errors[0].line, 3);
    }

    #[test]
    fn missing_column_is_reported() {
        let table = read_table("a,b\n1,2\n".as_bytes()).unwrap();
        let err = table.column("wave", "test.csv").unwrap_err();
        assert!(matches!(err, AppError::MissingColumn { ref column, .. } if column == "wave"));
    }

    #[test]
    fn spectrum_csv_drops_non_finite_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "wave,a,sig_a").unwrap();
        writeln!(file, "400,0.02,0.001").unwrap();
        writeln!(file, "405,nan,0.001").unwrap();
        writeln!(file, "410,0.03,").unwrap();
        file.flush().unwrap();

        let s = load_spectrum_csv(file.path(), "wave", "a").unwrap();
        assert_eq!(s.wave, vec![400.0, 410.0]);
        assert_eq!(s.values, vec![0.02, 0.03]);
        assert_eq!(s.errors[0], 0.001);
        assert!(s.errors[1].is_nan());
    }

    #[test]
    fn basis_csv_is_resampled_onto_grid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Wavelength,Fuco,Perid").unwrap();
        writeln!(file, "400,0.0,1.0").unwrap();
        writeln!(file, "500,1.0,1.0").unwrap();
        file.flush().unwrap();

        let basis = load_basis_csv(file.path(), &[350.0, 450.0, 500.0]).unwrap();
        assert_eq!(basis.len(), 2);
        assert_eq!(basis[0].name, "Fuco");
        assert_eq!(basis[0].values, vec![0.0, 0.5, 1.0]);
        assert_eq!(basis[1].values, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn matrix_is_row_major() {
        let table = read_table("w1,w2\n1,2\n3,4\n5,6\n".as_bytes()).unwrap();
        let m = table.to_matrix();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m[(2, 1)], 6.0);
    }
}
