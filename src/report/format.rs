//! Formatted terminal output for pigment fits.
//!
//! Formatting lives here so that:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (snapshot tests below)

use crate::domain::{FitConfig, SpectralResidual, Spectrum};
use crate::fit::PigmentFit;
use crate::report::worst_residual;

/// Format the full run summary (input stats + coefficients + diagnostics).
pub fn format_fit_summary(spectrum: &Spectrum, fit: &PigmentFit, config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== oc - pigment absorption fit ===\n");
    out.push_str(&format!("Source: {}\n", config.source));
    out.push_str(&format!("Spectrum: {}\n", config.spectrum_path.display()));
    if let (Some(w0), Some(w1)) = (spectrum.wave.first(), spectrum.wave.last()) {
        out.push_str(&format!(
            "Points: n={} | wave=[{w0:.1}, {w1:.1}] nm\n",
            spectrum.len()
        ));
    }

    out.push_str("\nCoefficients:\n");
    out.push_str(&format_coefficients(fit));

    out.push_str(&format!(
        "\nSSE={:.4e} RMSE={:.4e} n={} ({} evaluations, {})\n",
        fit.quality.sse, fit.quality.rmse, fit.quality.n, fit.n_evaluations, fit.termination
    ));
    out
}

/// Coefficient table: name, initial guess, fitted value, standard error.
pub fn format_coefficients(fit: &PigmentFit) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<12} {:>12} {:>12} {:>12}\n", "pigment", "guess", "value", "std_err"));
    out.push_str(&format!("{:-<12} {:-<12} {:-<12} {:-<12}\n", "", "", "", ""));
    for (i, name) in fit.names.iter().enumerate() {
        out.push_str(&format!(
            "{:<12} {:>12} {:>12} {:>12}\n",
            truncate(name, 12),
            fmt_num(fit.initial_guess[i]),
            fmt_num(fit.coefficients[i]),
            fmt_num(fit.covariance[i][i].sqrt()),
        ));
    }
    out
}

/// Largest residual line, if any.
pub fn format_residual_note(residuals: &[SpectralResidual]) -> String {
    match worst_residual(residuals) {
        Some(r) => format!(
            "Largest residual: {:+.4e} at {:.1} nm (obs={:.4e}, fit={:.4e})\n",
            r.residual, r.wave, r.observed, r.fitted
        ),
        None => String::new(),
    }
}

fn fmt_num(v: f64) -> String {
    if v.is_finite() { format!("{v:.5}") } else { "inf".to_string() }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('.');
    out
}
