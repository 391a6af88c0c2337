//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - reference data selectors (`PigmentSource`, `PigmentKind`, `Flavor`)
//! - spectra and basis spectra (`Spectrum`, `BasisSpectrum`)
//! - fit outputs and their JSON form (`FitFile`, `FitQuality`, etc.)

pub mod types;

pub use types::*;
