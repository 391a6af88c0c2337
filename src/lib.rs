//! `ocean-color` library crate.
//!
//! The binary (`oc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the pigment fitter and spectral utilities are reusable from other tools

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod remote;
pub mod report;
pub mod tara;
