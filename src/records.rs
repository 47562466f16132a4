use nalgebra::{Cholesky, DMatrix, DVector};

#[cfg(feature = "std")]
use log::warn;

#[cfg(not(feature = "std"))]
macro_rules! warn {
    ($($arg:tt)*) => {{}};
}

/// Per-step forward-filter moments, stored as one dense buffer per field
/// (struct-of-arrays) rather than a `Vec` of a combined struct. This matches
/// the access pattern of the linear algebra (whole-column reductions for
/// `mae`/`ll_sum`) better than an array-of-structs would.
#[derive(Debug, Clone, Default)]
pub struct ForwardRecords {
    /// Prior state mean after evolution, `a_t = G m_{t-1}`.
    pub a: Vec<DVector<f64>>,
    /// Prior state covariance after evolution.
    pub r: Vec<DMatrix<f64>>,
    /// One-step forecast mean.
    pub f: Vec<f64>,
    /// One-step forecast variance.
    pub q: Vec<f64>,
    /// Innovation, `e_t = Y_t - f_t`.
    pub e: Vec<f64>,
    /// Kalman gain, `A_t = R_t F_t / Q_t`.
    pub gain: Vec<DVector<f64>>,
    /// Posterior state mean.
    pub m: Vec<DVector<f64>>,
    /// Posterior state covariance.
    pub c: Vec<DMatrix<f64>>,
    /// Inverse-gamma degrees of freedom (discounted-V mode only).
    pub n: Vec<f64>,
    /// Inverse-gamma scale, i.e. the posterior mean estimate of `V` (discounted-V mode only).
    pub s: Vec<f64>,
    /// Per-step log-density of `Y_t` under its one-step forecast.
    pub ll: Vec<f64>,
    /// Whether the observation at this step was missing (update skipped).
    pub missing: Vec<bool>,
}

impl ForwardRecords {
    pub fn with_capacity(t: usize) -> Self {
        Self {
            a: Vec::with_capacity(t),
            r: Vec::with_capacity(t),
            f: Vec::with_capacity(t),
            q: Vec::with_capacity(t),
            e: Vec::with_capacity(t),
            gain: Vec::with_capacity(t),
            m: Vec::with_capacity(t),
            c: Vec::with_capacity(t),
            n: Vec::with_capacity(t),
            s: Vec::with_capacity(t),
            ll: Vec::with_capacity(t),
            missing: Vec::with_capacity(t),
        }
    }

    pub fn len(&self) -> usize {
        self.m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.m.is_empty()
    }

    /// Sum of per-step log-likelihood contributions.
    pub fn ll_sum(&self) -> f64 {
        self.ll.iter().sum()
    }

    /// Mean absolute one-step forecast error over non-missing steps.
    pub fn mae(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for (idx, &miss) in self.missing.iter().enumerate() {
            if !miss {
                total += self.e[idx].abs();
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}

/// Per-step smoothed marginal moments, filled in by the backward smoother.
#[derive(Debug, Clone, Default)]
pub struct SmoothRecords {
    pub m_star: Vec<DVector<f64>>,
    pub c_star: Vec<DMatrix<f64>>,
}

impl SmoothRecords {
    pub fn len(&self) -> usize {
        self.m_star.len()
    }

    pub fn is_empty(&self) -> bool {
        self.m_star.is_empty()
    }
}

/// Resymmetrize a matrix to cancel numerical drift: `(X + X^T) / 2`.
pub(crate) fn resymmetrize(mat: &DMatrix<f64>) -> DMatrix<f64> {
    (mat + mat.transpose()) * 0.5
}

/// Invert a symmetric positive-definite matrix via Cholesky; if it is
/// singular, fall back to a Moore-Penrose pseudo-inverse. `step`, when
/// given, is logged at `warn` level alongside the fallback, matching the
/// smoother's contract of recording a warning on this path.
pub(crate) fn invert_or_pseudo(r: &DMatrix<f64>, step: Option<usize>) -> DMatrix<f64> {
    match Cholesky::new(r.clone()) {
        Some(chol) => chol.inverse(),
        None => {
            if let Some(step) = step {
                warn!("R_{step} is singular; falling back to pseudo-inverse");
            }
            r.clone()
                .pseudo_inverse(1e-12)
                .unwrap_or_else(|_| DMatrix::zeros(r.nrows(), r.ncols()))
        }
    }
}
