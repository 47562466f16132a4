//! Forward-filter / backward-smoother / backward-sampler (FFBS) inference
//! for univariate Bayesian dynamic linear models.
//!
//! Characteristics:
//! - Uses the [nalgebra](https://nalgebra.org) crate for the underlying
//!   dense linear algebra (multiply, transpose, Cholesky, pseudo-inverse).
//! - Supports both a fixed process-noise matrix and a state-evolution
//!   discount factor, and both a known observation variance and a
//!   discounted-inverse-gamma unknown variance, as mutually exclusive,
//!   strongly-typed modes (see [`EvolutionMode`], [`ObservationMode`]).
//! - Per-step moments are stored struct-of-arrays style in [`Ffbs`], which
//!   also exposes incremental extension via [`Ffbs::append_observation`]
//!   without re-running history.
//! - [`GridSearchDiscountFfbs`] scores a Cartesian product of discount pairs
//!   by marginal log-likelihood.
//! - [`FfbsBuilder`] assembles a filter from the same flat named options
//!   (`evolution_discount`, `evo_discount_factor`, `obs_discount`,
//!   `obs_discount_factor`, `n0`, `s0`) as the configuration surface this
//!   crate's recursion follows.

#![allow(non_snake_case)]

mod builder;
mod density;
mod design;
mod error;
mod filter;
mod grid;
mod mode;
mod records;
mod sample;
mod smooth;

pub use builder::FfbsBuilder;
pub use design::DesignInput;
pub use error::{Error, ErrorKind};
pub use filter::Ffbs;
pub use grid::GridSearchDiscountFfbs;
pub use mode::{EvolutionMode, ObservationMode};
pub use records::{ForwardRecords, SmoothRecords};
pub use sample::Trajectories;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn identity_inputs(t: usize) -> (DMatrix<f64>, DMatrix<f64>, DVector<f64>, DMatrix<f64>) {
        let f = DMatrix::<f64>::from_element(t, 1, 1.0);
        let g = DMatrix::<f64>::identity(1, 1);
        let m0 = DVector::<f64>::zeros(1);
        let c0 = DMatrix::<f64>::identity(1, 1);
        (f, g, m0, c0)
    }

    #[test]
    fn trivial_identity_filter_known_v() {
        let t = 4;
        let (f, g, m0, c0) = identity_inputs(t);
        let y = vec![0.3, -0.1, 0.5, -0.4];
        let mut ffbs = Ffbs::new(
            f,
            g,
            y,
            m0,
            c0,
            EvolutionMode::Discount(0.99),
            ObservationMode::Known(1.0),
        )
        .unwrap();
        ffbs.forward_filter().unwrap();
        assert!(ffbs.ll_sum() > -10.0 && ffbs.ll_sum() < -4.0);
    }

    #[test]
    fn trivial_identity_filter_discounted_v() {
        let t = 4;
        let (f, g, m0, c0) = identity_inputs(t);
        let y = vec![0.3, -0.1, 0.5, -0.4];
        let mut ffbs = Ffbs::new(
            f,
            g,
            y,
            m0,
            c0,
            EvolutionMode::Discount(0.99),
            ObservationMode::discounted_default(0.99),
        )
        .unwrap();
        ffbs.forward_filter().unwrap();
        assert!(ffbs.ll_sum() > -10.0 && ffbs.ll_sum() < -4.0);
    }

    #[test]
    fn symmetry_and_psd_invariants_hold() {
        let t = 20;
        let (f, g, m0, c0) = identity_inputs(t);
        let y: Vec<f64> = (0..t).map(|i| (i as f64 * 0.37).sin()).collect();
        let mut ffbs = Ffbs::new(
            f,
            g,
            y,
            m0,
            c0,
            EvolutionMode::Discount(0.95),
            ObservationMode::Known(1.0),
        )
        .unwrap();
        ffbs.forward_filter().unwrap();
        for (c, r) in ffbs.c().iter().zip(ffbs.r().iter()) {
            assert_relative_eq!(c, &c.transpose(), epsilon = 1e-9);
            assert_relative_eq!(r, &r.transpose(), epsilon = 1e-9);
        }
        for q in ffbs.q() {
            assert!(*q > 0.0);
        }
    }

    #[test]
    fn smoother_anchors_at_last_step() {
        let t = 10;
        let (f, g, m0, c0) = identity_inputs(t);
        let y: Vec<f64> = (0..t).map(|i| (i as f64 * 0.2).cos()).collect();
        let mut ffbs = Ffbs::new(
            f,
            g,
            y,
            m0,
            c0,
            EvolutionMode::Discount(0.98),
            ObservationMode::Known(1.0),
        )
        .unwrap();
        ffbs.forward_filter().unwrap();
        ffbs.backward_smooth().unwrap();
        let m_star = ffbs.m_star().unwrap();
        let c_star = ffbs.c_star().unwrap();
        assert_relative_eq!(m_star[t - 1], ffbs.m()[t - 1], epsilon = 1e-12);
        assert_relative_eq!(c_star[t - 1], ffbs.c()[t - 1], epsilon = 1e-12);
    }

    #[test]
    fn append_observation_matches_full_refilter() {
        let t = 4;
        let (f_full, g, m0, c0) = identity_inputs(t);
        let y_full = vec![0.2, -0.3, 0.1, 0.6];

        let mut ffbs_full = Ffbs::new(
            f_full,
            g.clone(),
            y_full.clone(),
            m0.clone(),
            c0.clone(),
            EvolutionMode::Discount(0.99),
            ObservationMode::Known(1.0),
        )
        .unwrap();
        ffbs_full.forward_filter().unwrap();

        let f_partial = DMatrix::<f64>::from_element(t - 1, 1, 1.0);
        let mut ffbs_partial = Ffbs::new(
            f_partial,
            g,
            y_full[..t - 1].to_vec(),
            m0,
            c0,
            EvolutionMode::Discount(0.99),
            ObservationMode::Known(1.0),
        )
        .unwrap();
        ffbs_partial.forward_filter().unwrap();
        ffbs_partial
            .append_observation(DVector::from_element(1, 1.0), y_full[t - 1])
            .unwrap();

        assert_relative_eq!(ffbs_full.mae(), ffbs_partial.mae(), epsilon = 1e-10);
        assert_relative_eq!(ffbs_full.ll_sum(), ffbs_partial.ll_sum(), epsilon = 1e-10);
    }

    #[test]
    fn missing_observation_copies_prior_into_posterior() {
        let t = 3;
        let (f, g, m0, c0) = identity_inputs(t);
        let y = vec![0.5, f64::NAN, -0.2];
        let mut ffbs = Ffbs::new(
            f,
            g,
            y,
            m0,
            c0,
            EvolutionMode::Discount(0.99),
            ObservationMode::Known(1.0),
        )
        .unwrap();
        ffbs.forward_filter().unwrap();
        assert_relative_eq!(ffbs.m()[1], ffbs.a()[1], epsilon = 1e-12);
        assert_relative_eq!(ffbs.c()[1], ffbs.r()[1], epsilon = 1e-12);
        assert!(ffbs.ll_sum().is_finite());
    }

    #[test]
    fn sampler_mean_converges_toward_smoothed_mean() {
        let t = 30;
        let (f, g, m0, c0) = identity_inputs(t);
        let y: Vec<f64> = (0..t).map(|i| (i as f64 * 0.3).sin() * 0.5).collect();
        let mut ffbs = Ffbs::new(
            f,
            g,
            y,
            m0,
            c0,
            EvolutionMode::Discount(0.97),
            ObservationMode::Known(0.25),
        )
        .unwrap();
        ffbs.forward_filter().unwrap();
        ffbs.backward_smooth().unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let trajectories = ffbs.backward_sample(2000, &mut rng).unwrap();
        let sample_mean = trajectories.mean_trajectory();
        let m_star = ffbs.m_star().unwrap();
        for (sample, smoothed) in sample_mean.iter().zip(m_star.iter()) {
            assert_relative_eq!(sample, smoothed, epsilon = 0.15);
        }
    }

    #[test]
    fn grid_search_reports_finite_optimal_pair() {
        let t = 100;
        let (f, g, m0, c0) = identity_inputs(t);
        let y: Vec<f64> = (0..t)
            .map(|i| (i as f64 * 0.11).sin() + (i as f64 * 0.7).cos() * 0.1)
            .collect();
        let evo_grid = vec![0.90, 0.99];
        let obs_grid = vec![0.90, 0.99];
        let search = GridSearchDiscountFfbs::new(evo_grid, obs_grid, f, g, y, m0, c0).unwrap();
        assert_eq!(search.score_matrix().shape(), (2, 2));
        for score in search.score_matrix().iter() {
            assert!(score.is_finite());
        }
        assert!(search.best_evo() > 0.0 && search.best_evo() <= 1.0);
        assert!(search.best_obs() > 0.0 && search.best_obs() <= 1.0);
    }

    #[test]
    fn evolution_mode_rejects_out_of_range_discount() {
        let t = 2;
        let (f, g, m0, c0) = identity_inputs(t);
        let err = Ffbs::new(
            f,
            g,
            vec![0.0, 0.0],
            m0,
            c0,
            EvolutionMode::Discount(0.0),
            ObservationMode::Known(1.0),
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::OutOfRange {
                field: "evo_discount_factor",
                ..
            }
        ));
    }
}
