//! Reference pigment absorption tables.
//!
//! Two tabulated datasets are supported (see [`PigmentSource`]). Each table has
//! a wavelength column and one column per pigment, keyed by name
//! (`Chl-a`, `Chl-b`, `Chl-c12`, ...).
//!
//! Tables come from a [`ReferenceProvider`]. The file-backed provider reads
//! `bricaud.csv` / `clementson2019.csv` from the reference data directory,
//! `$OS_COLOR/data/ph` unless overridden. `.env` is honored.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::domain::PigmentSource;
use crate::error::AppError;
use crate::io::ingest::{NumericTable, WAVE_HEADERS, load_table};

/// Environment variable pointing at the data root.
pub const DATA_ROOT_ENV: &str = "OS_COLOR";

/// One tabulated reference dataset.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    pub source: PigmentSource,
    pub wave: Vec<f64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl ReferenceTable {
    pub fn new(
        source: PigmentSource,
        wave: Vec<f64>,
        columns: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, AppError> {
        if let Some((name, v)) = columns.iter().find(|(_, v)| v.len() != wave.len()) {
            return Err(AppError::input(format!(
                "{source} column '{name}' has {} values for {} wavelengths.",
                v.len(),
                wave.len()
            )));
        }
        Ok(Self { source, wave, columns })
    }

    /// Build from a loaded CSV: the wavelength column plus every other column.
    pub fn from_numeric(source: PigmentSource, table: &NumericTable) -> Result<Self, AppError> {
        let wave_name = table
            .find_header(&WAVE_HEADERS)
            .ok_or_else(|| AppError::MissingColumn {
                column: "wave".to_string(),
                context: format!("{source} reference table"),
            })?;
        let wave = table.get(wave_name).unwrap_or_default().to_vec();
        let columns = table
            .headers()
            .iter()
            .filter(|h| h.as_str() != wave_name)
            .filter_map(|h| table.get(h).map(|v| (h.clone(), v.to_vec())))
            .collect();
        Self::new(source, wave, columns)
    }

    pub fn column(&self, key: &str) -> Result<&[f64], AppError> {
        self.columns
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| AppError::MissingColumn {
                column: key.to_string(),
                context: format!("{} reference table", self.source),
            })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Supplies reference tables by source.
pub trait ReferenceProvider {
    fn load(&self, source: PigmentSource) -> Result<ReferenceTable, AppError>;
}

/// Reads reference tables from CSV files in a directory.
#[derive(Debug, Clone)]
pub struct CsvReferenceProvider {
    root: PathBuf,
}

impl CsvReferenceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use `$OS_COLOR/data/ph` (after loading `.env`).
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(data_root_from_env()?.join("data").join("ph")))
    }

    /// Use `dir` when given, else fall back to [`Self::from_env`].
    pub fn resolve(dir: Option<&Path>) -> Result<Self, AppError> {
        match dir {
            Some(dir) => Ok(Self::new(dir)),
            None => Self::from_env(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_bricaud(&self) -> Result<ReferenceTable, AppError> {
        self.load_file(PigmentSource::Bricaud)
    }

    fn load_clementson2019(&self) -> Result<ReferenceTable, AppError> {
        self.load_file(PigmentSource::Clementson2019)
    }

    fn load_file(&self, source: PigmentSource) -> Result<ReferenceTable, AppError> {
        let path = self.root.join(source.file_name());
        log::debug!("Loading {source} reference table from {}", path.display());
        let table = load_table(&path)?;
        ReferenceTable::from_numeric(source, &table)
    }
}

impl ReferenceProvider for CsvReferenceProvider {
    fn load(&self, source: PigmentSource) -> Result<ReferenceTable, AppError> {
        match source {
            PigmentSource::Bricaud => self.load_bricaud(),
            PigmentSource::Clementson2019 => self.load_clementson2019(),
        }
    }
}

/// Tables held in memory, e.g. for tests or embedding applications.
///
/// Counts loads so callers can check that no table was touched.
#[derive(Debug, Default)]
pub struct InMemoryReference {
    tables: HashMap<PigmentSource, ReferenceTable>,
    loads: Cell<usize>,
}

impl InMemoryReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: ReferenceTable) -> Self {
        self.tables.insert(table.source, table);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.get()
    }
}

impl ReferenceProvider for InMemoryReference {
    fn load(&self, source: PigmentSource) -> Result<ReferenceTable, AppError> {
        self.loads.set(self.loads.get() + 1);
        self.tables
            .get(&source)
            .cloned()
            .ok_or_else(|| AppError::NoData(format!("No {source} reference table registered.")))
    }
}

/// Data root from `$OS_COLOR`, loading `.env` first.
pub fn data_root_from_env() -> Result<PathBuf, AppError> {
    dotenvy::dotenv().ok();
    std::env::var(DATA_ROOT_ENV)
        .map(PathBuf::from)
        .map_err(|_| AppError::Config(format!("Missing {DATA_ROOT_ENV} in environment (.env).")))
}
