use nalgebra::{DMatrix, DVector};

use crate::design::DesignInput;
use crate::error::{Error, ErrorKind};
use crate::filter::Ffbs;
use crate::mode::{EvolutionMode, ObservationMode};

/// Builds an [`Ffbs`] from the same named options as the flat configuration
/// interface this crate's recursion is specified against, rather than
/// requiring callers to construct [`EvolutionMode`]/[`ObservationMode`]
/// directly. `evolution_discount`/`obs_discount` default to `true`, so the
/// defaults alone (no `w`/`v` set) produce a fully discounted filter.
pub struct FfbsBuilder {
    design: DesignInput,
    g: DMatrix<f64>,
    y: Vec<f64>,
    m0: DVector<f64>,
    c0: DMatrix<f64>,
    w: Option<DMatrix<f64>>,
    v: Option<f64>,
    evolution_discount: bool,
    evo_discount_factor: f64,
    obs_discount: bool,
    obs_discount_factor: f64,
    n0: f64,
    s0: f64,
}

impl FfbsBuilder {
    pub fn new(
        design: impl Into<DesignInput>,
        g: DMatrix<f64>,
        y: Vec<f64>,
        m0: DVector<f64>,
        c0: DMatrix<f64>,
    ) -> Self {
        Self {
            design: design.into(),
            g,
            y,
            m0,
            c0,
            w: None,
            v: None,
            evolution_discount: true,
            evo_discount_factor: 0.99,
            obs_discount: true,
            obs_discount_factor: 0.99,
            n0: 1.0,
            s0: 1.0,
        }
    }

    /// Sets a fixed process-noise matrix. Combine with `.evolution_discount(false)`.
    pub fn w(mut self, w: DMatrix<f64>) -> Self {
        self.w = Some(w);
        self
    }

    /// Sets a fixed, known observation variance. Combine with `.obs_discount(false)`.
    pub fn v(mut self, v: f64) -> Self {
        self.v = Some(v);
        self
    }

    pub fn evolution_discount(mut self, flag: bool) -> Self {
        self.evolution_discount = flag;
        self
    }

    pub fn evo_discount_factor(mut self, delta: f64) -> Self {
        self.evo_discount_factor = delta;
        self
    }

    pub fn obs_discount(mut self, flag: bool) -> Self {
        self.obs_discount = flag;
        self
    }

    pub fn obs_discount_factor(mut self, delta: f64) -> Self {
        self.obs_discount_factor = delta;
        self
    }

    pub fn n0(mut self, n0: f64) -> Self {
        self.n0 = n0;
        self
    }

    pub fn s0(mut self, s0: f64) -> Self {
        self.s0 = s0;
        self
    }

    /// Resolves `w`/`evolution_discount` and `v`/`obs_discount` into
    /// [`EvolutionMode`]/[`ObservationMode`] and constructs the filter via
    /// [`Ffbs::new`]. Fails with [`ErrorKind::InvalidMode`] if both or
    /// neither of a pair are set.
    pub fn build(self) -> Result<Ffbs, Error> {
        let evolution = match (self.w, self.evolution_discount) {
            (Some(w), false) => EvolutionMode::Fixed(w),
            (None, true) => EvolutionMode::Discount(self.evo_discount_factor),
            _ => {
                return Err(ErrorKind::InvalidMode {
                    field: "W/evolution_discount",
                }
                .into())
            }
        };

        let observation = match (self.v, self.obs_discount) {
            (Some(v), false) => ObservationMode::Known(v),
            (None, true) => ObservationMode::Discounted {
                delta_obs: self.obs_discount_factor,
                n0: self.n0,
                s0: self.s0,
            },
            _ => {
                return Err(ErrorKind::InvalidMode {
                    field: "V/obs_discount",
                }
                .into())
            }
        };

        Ffbs::new(self.design, self.g, self.y, self.m0, self.c0, evolution, observation)
    }
}
