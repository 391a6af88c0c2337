//! Nonlinear least-squares curve fitting.
//!
//! This is the "fit a model function to data" primitive the pigment fitter is
//! built on. We minimize
//!
//! ```text
//! ½ Σ (f(x_i; p) - y_i)^2
//! ```
//!
//! over `p` with the Levenberg–Marquardt implementation from the
//! `levenberg-marquardt` crate, starting from a caller-supplied initial guess.
//! No bounds are applied to `p`.
//!
//! The covariance of the estimate follows the usual unweighted convention:
//!
//! ```text
//! cov = (JᵀJ)⁺ · SSE / (N - P)
//! ```
//!
//! where `(JᵀJ)⁺` is formed from the SVD of the Jacobian at the solution with
//! singular values below `eps · max(N, P) · s_max` discarded. When `N <= P`
//! the residual variance is undefined and the covariance is all `+inf`.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};

use crate::error::AppError;

/// Convergence tolerance on relative reduction of the objective and the step.
const TOL: f64 = 1.49012e-8;

/// A model evaluated on a fixed set of `n_points` abscissae.
pub trait ParametricModel {
    fn n_params(&self) -> usize;

    fn n_points(&self) -> usize;

    /// Evaluate the model at every point into `out` (length `n_points`).
    fn eval(&self, params: &[f64], out: &mut [f64]);

    /// Analytic Jacobian `∂f_i/∂p_k` (`n_points × n_params`), if available.
    ///
    /// Returning `None` switches to forward finite differences.
    fn jacobian(&self, _params: &[f64]) -> Option<DMatrix<f64>> {
        None
    }
}

/// Result of a [`curve_fit`] call.
#[derive(Debug, Clone)]
pub struct CurveFit {
    pub params: Vec<f64>,
    pub covariance: DMatrix<f64>,
    pub sse: f64,
    pub n_evaluations: usize,
    pub termination: String,
}

/// Fit `model` to `y` starting from `p0`.
pub fn curve_fit<M: ParametricModel>(model: &M, y: &[f64], p0: &[f64]) -> Result<CurveFit, AppError> {
    let n = model.n_points();
    let p = model.n_params();

    if y.len() != n {
        return Err(AppError::fit(format!(
            "Observed array has {} values but the model is evaluated at {} points.",
            y.len(),
            n
        )));
    }
    if p0.len() != p {
        return Err(AppError::fit(format!(
            "Initial guess has {} values but the model has {} parameters.",
            p0.len(),
            p
        )));
    }
    if p == 0 {
        return Err(AppError::fit("Model has no parameters."));
    }
    if p > n {
        return Err(AppError::fit(format!(
            "Improper input: {p} parameters exceed {n} data points."
        )));
    }
    if p0.iter().any(|v| !v.is_finite()) {
        return Err(AppError::fit(format!("Initial guess contains non-finite values: {p0:?}")));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(AppError::fit("Observed array contains non-finite values."));
    }

    let problem = Problem {
        model,
        y,
        params: DVector::from_column_slice(p0),
    };

    let (solved, report) = LevenbergMarquardt::new()
        .with_ftol(TOL)
        .with_xtol(TOL)
        .minimize(problem);

    let termination = format!("{:?}", report.termination);
    if !report.termination.was_successful() {
        return Err(AppError::fit(format!(
            "Optimal parameters not found ({termination}) after {} evaluations.",
            report.number_of_evaluations
        )));
    }

    let params: Vec<f64> = solved.params.iter().copied().collect();
    let residuals = solved
        .residual_vector()
        .ok_or_else(|| AppError::fit("Non-finite residuals at the solution."))?;
    let sse = residuals.norm_squared();

    let jac = solved
        .jacobian_matrix()
        .ok_or_else(|| AppError::fit("Non-finite Jacobian at the solution."))?;
    let covariance = covariance_from_jacobian(&jac, sse);

    log::debug!(
        "curve_fit: {termination} after {} evaluations, sse={sse:.6e}",
        report.number_of_evaluations
    );

    Ok(CurveFit {
        params,
        covariance,
        sse,
        n_evaluations: report.number_of_evaluations,
        termination,
    })
}

/// Parameter covariance from the Jacobian at the solution.
pub fn covariance_from_jacobian(jac: &DMatrix<f64>, sse: f64) -> DMatrix<f64> {
    let (n, p) = jac.shape();
    if n <= p {
        log::warn!("Covariance of the parameters could not be estimated ({n} points, {p} parameters).");
        return DMatrix::from_element(p, p, f64::INFINITY);
    }

    let svd = jac.clone().svd(false, true);
    let Some(v_t) = svd.v_t else {
        return DMatrix::from_element(p, p, f64::INFINITY);
    };

    let s_max = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    let threshold = f64::EPSILON * n.max(p) as f64 * s_max;

    // (JᵀJ)⁺ = Σ_k v_k v_kᵀ / s_k² over the retained singular values.
    let mut pinv = DMatrix::<f64>::zeros(p, p);
    for (k, &s) in svd.singular_values.iter().enumerate() {
        if s <= threshold {
            continue;
        }
        let v = v_t.row(k).transpose();
        pinv += (&v * v.transpose()) / (s * s);
    }

    let scale = sse / (n - p) as f64;
    let cov = pinv * scale;
    if cov.iter().any(|v| v.is_nan()) {
        log::warn!("Covariance of the parameters contains NaN; reporting +inf.");
        return DMatrix::from_element(p, p, f64::INFINITY);
    }
    cov
}

/// Adapter between a [`ParametricModel`] and the LM solver.
///
/// The solver clones this during iteration, so it only borrows the data.
struct Problem<'a, M> {
    model: &'a M,
    y: &'a [f64],
    params: DVector<f64>,
}

impl<M> Clone for Problem<'_, M> {
    fn clone(&self) -> Self {
        Self {
            model: self.model,
            y: self.y,
            params: self.params.clone(),
        }
    }
}

impl<M: ParametricModel> Problem<'_, M> {
    fn residual_vector(&self) -> Option<DVector<f64>> {
        let mut pred = vec![0.0; self.y.len()];
        self.model.eval(self.params.as_slice(), &mut pred);
        let r = DVector::from_iterator(
            pred.len(),
            pred.iter().zip(self.y.iter()).map(|(f, y)| f - y),
        );
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian_matrix(&self) -> Option<DMatrix<f64>> {
        let jac = match self.model.jacobian(self.params.as_slice()) {
            Some(j) => j,
            None => self.finite_difference_jacobian(),
        };
        jac.iter().all(|v| v.is_finite()).then_some(jac)
    }

    /// Forward differences with step `sqrt(eps) · max(|p_k|, 1)`.
    fn finite_difference_jacobian(&self) -> DMatrix<f64> {
        let n = self.y.len();
        let p = self.params.len();
        let base_params: Vec<f64> = self.params.iter().copied().collect();

        let mut f0 = vec![0.0; n];
        self.model.eval(&base_params, &mut f0);

        let mut jac = DMatrix::<f64>::zeros(n, p);
        let mut shifted = base_params.clone();
        let mut f1 = vec![0.0; n];
        for k in 0..p {
            let h = f64::EPSILON.sqrt() * base_params[k].abs().max(1.0);
            shifted[k] = base_params[k] + h;
            self.model.eval(&shifted, &mut f1);
            for i in 0..n {
                jac[(i, k)] = (f1[i] - f0[i]) / h;
            }
            shifted[k] = base_params[k];
        }
        jac
    }
}

impl<M: ParametricModel> LeastSquaresProblem<f64, Dyn, Dyn> for Problem<'_, M> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.residual_vector()
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        self.jacobian_matrix()
    }
}
