//! Mathematical utilities: interpolation, least-squares fitting and PCA.

pub mod interp;
pub mod lsq;
pub mod pca;

pub use interp::*;
pub use lsq::*;
pub use pca::*;
