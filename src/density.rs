//! Scalar log-density helpers used to accumulate one-step-ahead
//! marginal log-likelihood.

use statrs::distribution::{Continuous, Normal, StudentsT};

/// `log phi(y; mean, variance)`, the log-density of a Gaussian.
pub(crate) fn gaussian_log_density(y: f64, mean: f64, variance: f64) -> f64 {
    let normal = Normal::new(mean, variance.sqrt()).expect("variance must be positive and finite");
    normal.ln_pdf(y)
}

/// `log t_dof(y; location, scale^2)`, the log-density of a scaled Student-t
/// distribution with `dof` degrees of freedom, used when the observation
/// variance is an unknown discounted inverse-gamma quantity.
pub(crate) fn student_t_log_density(y: f64, location: f64, scale_sq: f64, dof: f64) -> f64 {
    let t = StudentsT::new(location, scale_sq.sqrt(), dof)
        .expect("dof must be positive and scale must be positive and finite");
    t.ln_pdf(y)
}
