//! Tara Oceans spectral utilities.

pub mod spectra;

pub use spectra::*;
