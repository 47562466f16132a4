use nalgebra::{Cholesky, DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Gamma, StandardNormal};

use crate::error::{Error, ErrorKind};
use crate::filter::Ffbs;
use crate::mode::ObservationMode;
use crate::records::{invert_or_pseudo, resymmetrize};

/// A `(T, n, k)` tensor of joint posterior state-trajectory samples drawn by
/// [`Ffbs::backward_sample`]. `k = 1` is the common case and is exposed
/// directly through [`Trajectories::as_single`].
#[derive(Debug, Clone)]
pub struct Trajectories {
    /// `data[k][t]` is the sampled state at time `t` in trajectory `k`.
    data: Vec<Vec<DVector<f64>>>,
    t: usize,
    n: usize,
    k: usize,
}

impl Trajectories {
    /// `(T, n, k)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.t, self.n, self.k)
    }

    /// The `k`-th sampled trajectory, one state vector per time step.
    pub fn trajectory(&self, k: usize) -> &[DVector<f64>] {
        &self.data[k]
    }

    pub fn state_at(&self, t: usize, k: usize) -> &DVector<f64> {
        &self.data[k][t]
    }

    /// The single trajectory, when `k == 1`.
    pub fn as_single(&self) -> Option<&[DVector<f64>]> {
        if self.k == 1 {
            Some(&self.data[0])
        } else {
            None
        }
    }

    /// Elementwise mean state across all `k` trajectories, at each `t`.
    /// Used to check the sampler-mean convergence property against `m*_t`.
    pub fn mean_trajectory(&self) -> Vec<DVector<f64>> {
        (0..self.t)
            .map(|t| {
                let mut acc = DVector::zeros(self.n);
                for k in 0..self.k {
                    acc += &self.data[k][t];
                }
                acc / self.k as f64
            })
            .collect()
    }
}

impl Ffbs {
    /// Draw `num_samples` joint posterior samples of the full state
    /// trajectory, consuming `rng` for every Gaussian (and, in
    /// discounted-V mode, inverse-gamma) draw so a seeded RNG yields fully
    /// reproducible output.
    pub fn backward_sample(
        &self,
        num_samples: usize,
        rng: &mut impl Rng,
    ) -> Result<Trajectories, Error> {
        let t_total = self.records_ref().len();
        if t_total < 1 {
            return Err(ErrorKind::NotFiltered.into());
        }
        if num_samples < 1 {
            return Err(ErrorKind::OutOfRange {
                field: "num_samples",
                value: num_samples as f64,
            }
            .into());
        }

        let n = self.state_dim();
        let g = self.g_matrix().clone();
        let mut data = Vec::with_capacity(num_samples);

        for _ in 0..num_samples {
            let scale_factor = match &self.observation_mode() {
                ObservationMode::Discounted { .. } => {
                    let records = self.records_ref();
                    let n_last = records.n[t_total - 1];
                    let s_last = records.s[t_total - 1];
                    let v = sample_inverse_gamma(n_last / 2.0, n_last * s_last / 2.0, rng);
                    v / s_last
                }
                ObservationMode::Known(_) => 1.0,
            };

            let records = self.records_ref();
            let mut theta = vec![DVector::zeros(n); t_total];
            let c_last = &records.c[t_total - 1] * scale_factor;
            theta[t_total - 1] = sample_mvn(&records.m[t_total - 1], &c_last, rng);

            for t in (0..t_total - 1).rev() {
                let r_next = &records.r[t + 1] * scale_factor;
                let r_next_inv = invert_or_pseudo(&r_next, None);
                let c_t = &records.c[t] * scale_factor;
                let b_t = &c_t * g.transpose() * &r_next_inv;

                let h_t = &records.m[t] + &b_t * (&theta[t + 1] - &records.a[t + 1]);
                let h_cov = resymmetrize(&(&c_t - &b_t * &r_next * b_t.transpose()));
                theta[t] = sample_mvn(&h_t, &h_cov, rng);
            }
            data.push(theta);
        }

        Ok(Trajectories {
            data,
            t: t_total,
            n,
            k: num_samples,
        })
    }

    fn observation_mode(&self) -> &ObservationMode {
        &self.observation
    }
}

/// Draw `N(mean, cov)` by multiplying a standard-normal vector through the
/// Cholesky root of `cov`, falling back to a jittered Cholesky if `cov` is
/// only numerically, not exactly, positive definite.
fn sample_mvn(mean: &DVector<f64>, cov: &DMatrix<f64>, rng: &mut impl Rng) -> DVector<f64> {
    let l = cholesky_with_jitter(cov);
    let z = DVector::from_fn(mean.len(), |_, _| StandardNormal.sample(rng));
    mean + l * z
}

fn cholesky_with_jitter(cov: &DMatrix<f64>) -> DMatrix<f64> {
    let mut attempt = cov.clone();
    let mut jitter = 0.0_f64;
    for _ in 0..6 {
        if let Some(chol) = Cholesky::new(attempt.clone()) {
            return chol.l();
        }
        jitter = if jitter == 0.0 { 1e-10 } else { jitter * 10.0 };
        for i in 0..attempt.nrows() {
            attempt[(i, i)] += jitter;
        }
    }
    DMatrix::zeros(cov.nrows(), cov.ncols())
}

/// `InverseGamma(shape, rate)` via `1 / Gamma(shape, scale = 1/rate)`.
fn sample_inverse_gamma(shape: f64, rate: f64, rng: &mut impl Rng) -> f64 {
    let gamma = Gamma::new(shape, 1.0 / rate).expect("shape and rate must be positive");
    1.0 / gamma.sample(rng)
}
