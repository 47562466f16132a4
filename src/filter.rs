use nalgebra::{DMatrix, DVector};

#[cfg(feature = "std")]
use log::trace;

#[cfg(not(feature = "std"))]
macro_rules! trace {
    ($($arg:tt)*) => {{}};
}

use crate::density::{gaussian_log_density, student_t_log_density};
use crate::design::{self, DesignInput};
use crate::error::{Error, ErrorKind};
use crate::mode::{EvolutionMode, ObservationMode};
use crate::records::{resymmetrize, ForwardRecords, SmoothRecords};

/// Result of a single forward-filter recursion step, before it is appended
/// to the filter's [`ForwardRecords`].
pub(crate) struct StepOutput {
    pub a: DVector<f64>,
    pub r: DMatrix<f64>,
    pub f: f64,
    pub q: f64,
    pub e: f64,
    pub gain: DVector<f64>,
    pub m: DVector<f64>,
    pub c: DMatrix<f64>,
    pub n: f64,
    pub s: f64,
    pub ll: f64,
    pub missing: bool,
}

/// A forward-filter / backward-smoother / backward-sampler for a univariate
/// Bayesian dynamic linear model.
///
/// `F` is a per-step regression vector, `G` a time-invariant evolution
/// matrix, `Y` the scalar observation sequence. Process noise and
/// observation variance are each configured as one of two mutually exclusive
/// modes, see [`EvolutionMode`] and [`ObservationMode`].
#[derive(Debug)]
pub struct Ffbs {
    pub(crate) f: Vec<DVector<f64>>,
    pub(crate) g: DMatrix<f64>,
    pub(crate) y: Vec<f64>,
    pub(crate) m0: DVector<f64>,
    pub(crate) c0: DMatrix<f64>,
    pub(crate) evolution: EvolutionMode,
    pub(crate) observation: ObservationMode,
    pub(crate) n_dim: usize,
    pub(crate) records: ForwardRecords,
    pub(crate) smoothed: Option<SmoothRecords>,
}

impl Ffbs {
    /// Construct a new filter, validating all shape, mode, and range
    /// invariants described in the crate's configuration contract.
    ///
    /// Validation happens once, here; no per-step re-validation occurs.
    pub fn new(
        design: impl Into<DesignInput>,
        g: DMatrix<f64>,
        y: Vec<f64>,
        m0: DVector<f64>,
        c0: DMatrix<f64>,
        evolution: EvolutionMode,
        observation: ObservationMode,
    ) -> Result<Self, Error> {
        let t = y.len();
        if t < 1 {
            return Err(ErrorKind::ShapeMismatch {
                field: "Y",
                expected: (1, 1),
                actual: (0, 1),
            }
            .into());
        }
        let n = m0.len();
        if n < 1 {
            return Err(ErrorKind::ShapeMismatch {
                field: "m0",
                expected: (1, 1),
                actual: (0, 1),
            }
            .into());
        }
        if g.nrows() != n || g.ncols() != n {
            return Err(ErrorKind::ShapeMismatch {
                field: "G",
                expected: (n, n),
                actual: (g.nrows(), g.ncols()),
            }
            .into());
        }
        if c0.nrows() != n || c0.ncols() != n {
            return Err(ErrorKind::ShapeMismatch {
                field: "C0",
                expected: (n, n),
                actual: (c0.nrows(), c0.ncols()),
            }
            .into());
        }
        require_finite(g.iter().copied(), "G")?;
        require_finite(m0.iter().copied(), "m0")?;
        require_finite(c0.iter().copied(), "C0")?;

        let f = design::normalize(design.into(), t, n)?;
        for row in &f {
            require_finite(row.iter().copied(), "F")?;
        }

        match &evolution {
            EvolutionMode::Fixed(w) => {
                if w.nrows() != n || w.ncols() != n {
                    return Err(ErrorKind::ShapeMismatch {
                        field: "W",
                        expected: (n, n),
                        actual: (w.nrows(), w.ncols()),
                    }
                    .into());
                }
                require_finite(w.iter().copied(), "W")?;
            }
            EvolutionMode::Discount(delta) => require_unit_interval(*delta, "evo_discount_factor")?,
        }

        match &observation {
            ObservationMode::Known(v) => {
                if !v.is_finite() || *v <= 0.0 {
                    return Err(ErrorKind::OutOfRange {
                        field: "V",
                        value: *v,
                    }
                    .into());
                }
            }
            ObservationMode::Discounted { delta_obs, n0, s0 } => {
                require_unit_interval(*delta_obs, "obs_discount_factor")?;
                if !n0.is_finite() || *n0 <= 0.0 {
                    return Err(ErrorKind::OutOfRange {
                        field: "n0",
                        value: *n0,
                    }
                    .into());
                }
                if !s0.is_finite() || *s0 <= 0.0 {
                    return Err(ErrorKind::OutOfRange {
                        field: "s0",
                        value: *s0,
                    }
                    .into());
                }
            }
        }

        Ok(Self {
            f,
            g,
            y,
            m0,
            c0,
            evolution,
            observation,
            n_dim: n,
            records: ForwardRecords::default(),
            smoothed: None,
        })
    }

    /// Latent state dimension `n`.
    pub fn state_dim(&self) -> usize {
        self.n_dim
    }

    /// Number of time steps currently filtered.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn initial_ig(&self) -> (f64, f64) {
        match &self.observation {
            ObservationMode::Discounted { n0, s0, .. } => (*n0, *s0),
            ObservationMode::Known(_) => (0.0, 0.0),
        }
    }

    /// Run the forward filter over the full observation record, populating
    /// `a, R, f, Q, e, m, C` (and, in discounted-V mode, `n, s`) for every
    /// `t`, and accumulating `ll_sum`.
    pub fn forward_filter(&mut self) -> Result<(), Error> {
        let t_total = self.y.len();
        let mut records = ForwardRecords::with_capacity(t_total);
        let mut prev_m = self.m0.clone();
        let mut prev_c = self.c0.clone();
        let (mut prev_n, mut prev_s) = self.initial_ig();

        for t in 0..t_total {
            let out = self.compute_step(&prev_m, &prev_c, prev_n, prev_s, &self.f[t], self.y[t], t)?;
            prev_m = out.m.clone();
            prev_c = out.c.clone();
            prev_n = out.n;
            prev_s = out.s;
            push_step(&mut records, out);
        }

        self.records = records;
        self.smoothed = None;
        Ok(())
    }

    /// Extend a filter whose records are complete up to step `T-1` with a
    /// single new observation, at the cost of one filter step (`O(n^3)`)
    /// instead of re-running the whole history.
    pub fn append_observation(&mut self, f_new: DVector<f64>, y_new: f64) -> Result<(), Error> {
        if self.records.is_empty() {
            return Err(ErrorKind::NotFiltered.into());
        }
        if f_new.len() != self.n_dim {
            return Err(ErrorKind::ShapeMismatch {
                field: "F_new",
                expected: (self.n_dim, 1),
                actual: (f_new.len(), 1),
            }
            .into());
        }
        require_finite(f_new.iter().copied(), "F_new")?;

        let step = self.records.len();
        let prev_m = self.records.m[step - 1].clone();
        let prev_c = self.records.c[step - 1].clone();
        let (prev_n, prev_s) = if step == 0 {
            self.initial_ig()
        } else {
            (self.records.n[step - 1], self.records.s[step - 1])
        };

        let out = self.compute_step(&prev_m, &prev_c, prev_n, prev_s, &f_new, y_new, step)?;
        push_step(&mut self.records, out);

        self.f.push(f_new);
        self.y.push(y_new);
        self.smoothed = None;
        Ok(())
    }

    /// Implements the per-step recursion from the forward-filter contract:
    /// evolve, determine this step's observation variance, forecast, update,
    /// and accumulate log-likelihood. Shared by [`Self::forward_filter`] and
    /// [`Self::append_observation`] so both produce bit-identical records.
    fn compute_step(
        &self,
        prev_m: &DVector<f64>,
        prev_c: &DMatrix<f64>,
        prev_n: f64,
        prev_s: f64,
        f_t: &DVector<f64>,
        y_t: f64,
        step: usize,
    ) -> Result<StepOutput, Error> {
        let a = &self.g * prev_m;
        let p = resymmetrize(&(&self.g * prev_c * self.g.transpose()));

        let r = match &self.evolution {
            EvolutionMode::Fixed(w) => resymmetrize(&(&p + w)),
            EvolutionMode::Discount(delta) => resymmetrize(&(&p / *delta)),
        };

        let (v_t, n_star) = match &self.observation {
            ObservationMode::Known(v) => (*v, None),
            ObservationMode::Discounted { delta_obs, .. } => (prev_s, Some(delta_obs * prev_n)),
        };

        let f_val = f_t.dot(&a);
        let q = f_t.dot(&(&r * f_t)) + v_t;
        if q <= 0.0 {
            return Err(ErrorKind::NumericalInstability {
                step,
                reason: "one-step forecast variance Q_t is non-positive",
            }
            .into());
        }

        let missing = y_t.is_nan();
        trace!("step {step}: a={a:?} r={r:?} f={f_val} q={q} missing={missing}");

        if missing {
            let (n_out, s_out) = match n_star {
                Some(n_star) => (n_star, prev_s),
                None => (0.0, 0.0),
            };
            return Ok(StepOutput {
                a: a.clone(),
                r: r.clone(),
                f: f_val,
                q,
                e: 0.0,
                gain: DVector::zeros(self.n_dim),
                m: a,
                c: r,
                n: n_out,
                s: s_out,
                ll: 0.0,
                missing: true,
            });
        }

        let e = y_t - f_val;
        let gain = (&r * f_t) / q;
        let m = &a + &gain * e;

        let (c, n_out, s_out, ll) = match n_star {
            None => {
                let c = resymmetrize(&(&r - &gain * gain.transpose() * q));
                let ll = gaussian_log_density(y_t, f_val, q);
                (c, 0.0, 0.0, ll)
            }
            Some(n_star) => {
                let n_t = n_star + 1.0;
                let s_t = prev_s * ((n_star + e * e / q) / n_t);
                let base = resymmetrize(&(&r - &gain * gain.transpose() * q));
                let c = resymmetrize(&(base * (s_t / prev_s)));
                let ll = student_t_log_density(y_t, f_val, q, n_star);
                (c, n_t, s_t, ll)
            }
        };

        Ok(StepOutput {
            a,
            r,
            f: f_val,
            q,
            e,
            gain,
            m,
            c,
            n: n_out,
            s: s_out,
            ll,
            missing: false,
        })
    }

    pub fn a(&self) -> &[DVector<f64>] {
        &self.records.a
    }
    pub fn r(&self) -> &[DMatrix<f64>] {
        &self.records.r
    }
    pub fn f(&self) -> &[f64] {
        &self.records.f
    }
    pub fn q(&self) -> &[f64] {
        &self.records.q
    }
    pub fn e(&self) -> &[f64] {
        &self.records.e
    }
    pub fn gain(&self) -> &[DVector<f64>] {
        &self.records.gain
    }
    pub fn m(&self) -> &[DVector<f64>] {
        &self.records.m
    }
    pub fn c(&self) -> &[DMatrix<f64>] {
        &self.records.c
    }
    pub fn n(&self) -> &[f64] {
        &self.records.n
    }
    pub fn s(&self) -> &[f64] {
        &self.records.s
    }
    pub fn ll_sum(&self) -> f64 {
        self.records.ll_sum()
    }
    pub fn mae(&self) -> f64 {
        self.records.mae()
    }

    pub(crate) fn g_matrix(&self) -> &DMatrix<f64> {
        &self.g
    }

    pub(crate) fn records_ref(&self) -> &ForwardRecords {
        &self.records
    }

    pub(crate) fn smoothed_ref(&self) -> Option<&SmoothRecords> {
        self.smoothed.as_ref()
    }

    pub(crate) fn set_smoothed(&mut self, smoothed: SmoothRecords) {
        self.smoothed = Some(smoothed);
    }
}

pub(crate) fn push_step(records: &mut ForwardRecords, out: StepOutput) {
    records.a.push(out.a);
    records.r.push(out.r);
    records.f.push(out.f);
    records.q.push(out.q);
    records.e.push(out.e);
    records.gain.push(out.gain);
    records.m.push(out.m);
    records.c.push(out.c);
    records.n.push(out.n);
    records.s.push(out.s);
    records.ll.push(out.ll);
    records.missing.push(out.missing);
}

fn require_finite(values: impl Iterator<Item = f64>, field: &'static str) -> Result<(), Error> {
    for v in values {
        if !v.is_finite() {
            return Err(ErrorKind::NonFinite { field }.into());
        }
    }
    Ok(())
}

fn require_unit_interval(value: f64, field: &'static str) -> Result<(), Error> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ErrorKind::OutOfRange { field, value }.into());
    }
    Ok(())
}
