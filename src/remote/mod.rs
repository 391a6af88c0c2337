//! Remote-sensing inversion helpers: PCA of Hydrolight simulations and the
//! reflectance likelihood.

pub mod mcmc;
pub mod pca;

pub use mcmc::*;
pub use pca::*;
