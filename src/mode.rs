use nalgebra::DMatrix;

/// How per-step process noise is determined.
///
/// Kept as a tagged variant rather than a boolean plus coupled scalars so
/// that "both set" and "neither set" configurations are unrepresentable.
#[derive(Debug, Clone)]
pub enum EvolutionMode {
    /// A fixed `(n, n)` process-noise covariance `W` added at every step.
    Fixed(DMatrix<f64>),
    /// A discount factor `delta in (0, 1]`. The prior-predictive covariance
    /// becomes `R_t = G C_{t-1} G^T / delta` instead of adding an explicit `W`.
    Discount(f64),
}

/// How the scalar observation variance is determined.
#[derive(Debug, Clone)]
pub enum ObservationMode {
    /// A fixed, known variance `V > 0`, constant across all steps.
    Known(f64),
    /// An unknown variance tracked via a discounted inverse-gamma posterior.
    Discounted {
        delta_obs: f64,
        n0: f64,
        s0: f64,
    },
}

impl ObservationMode {
    /// Convenience constructor with conventional diffuse-prior defaults
    /// (`n0=1.0, s0=1.0`); caller supplies only the discount factor.
    pub fn discounted_default(delta_obs: f64) -> Self {
        ObservationMode::Discounted {
            delta_obs,
            n0: 1.0,
            s0: 1.0,
        }
    }
}
