//! Spectral mixture models.
//!
//! Models are small structs over pre-sampled basis spectra so that fitting
//! code can stay generic over `math::ParametricModel`.

pub mod model;

pub use model::*;
