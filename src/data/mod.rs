//! Reference pigment data, basis spectra and synthetic samples.

pub mod pigments;
pub mod reference;
pub mod sample;

pub use pigments::*;
pub use reference::*;
pub use sample::*;
