//! Pigment fitting.
//!
//! Responsibilities:
//!
//! - build the chlorophyll + extra basis set for a wavelength grid
//! - estimate initial coefficients from reference wavelengths
//! - run the unconstrained least-squares fit and collect covariance

pub mod fitter;

pub use fitter::*;
