use std::thread;

use nalgebra::{DMatrix, DVector};

#[cfg(feature = "std")]
use log::debug;

#[cfg(not(feature = "std"))]
macro_rules! debug {
    ($($arg:tt)*) => {{}};
}

use crate::design::{self, DesignInput};
use crate::error::{Error, ErrorKind};
use crate::filter::Ffbs;
use crate::mode::{EvolutionMode, ObservationMode};

/// Scores a Cartesian product of `(evolution discount, observation discount)`
/// candidates by their forward-filter marginal log-likelihood and reports
/// the best pair.
///
/// Each cell owns an independent [`Ffbs`] instance over the same shared,
/// immutable design inputs, so cells may be evaluated concurrently without
/// scheduling affecting the result.
pub struct GridSearchDiscountFfbs {
    evo_grid: Vec<f64>,
    obs_grid: Vec<f64>,
    score_matrix: DMatrix<f64>,
    best_evo: f64,
    best_obs: f64,
}

impl GridSearchDiscountFfbs {
    /// Run the grid search. Fails construction-time validation the same way
    /// [`Ffbs::new`] would for the shared inputs; a candidate pair that
    /// causes [`crate::ErrorKind::NumericalInstability`] scores `-inf`
    /// rather than propagating. Fails with
    /// [`crate::ErrorKind::NoViableDiscountPair`] if every candidate does.
    pub fn new(
        evo_grid: Vec<f64>,
        obs_grid: Vec<f64>,
        design: impl Into<DesignInput>,
        g: DMatrix<f64>,
        y: Vec<f64>,
        m0: DVector<f64>,
        c0: DMatrix<f64>,
    ) -> Result<Self, Error> {
        if evo_grid.is_empty() || obs_grid.is_empty() {
            return Err(ErrorKind::ShapeMismatch {
                field: "evo_grid/obs_grid",
                expected: (1, 1),
                actual: (evo_grid.len(), obs_grid.len()),
            }
            .into());
        }

        let t = y.len();
        let n = m0.len();
        let rows = design::normalize(design.into(), t, n)?;

        let score_rows: Vec<Vec<f64>> = thread::scope(|scope| {
            let handles: Vec<_> = evo_grid
                .iter()
                .map(|&evo| {
                    let rows = rows.clone();
                    let g = g.clone();
                    let y = y.clone();
                    let m0 = m0.clone();
                    let c0 = c0.clone();
                    let obs_grid = &obs_grid;
                    scope.spawn(move || {
                        obs_grid
                            .iter()
                            .map(|&obs| {
                                run_cell(evo, obs, rows.clone(), g.clone(), y.clone(), m0.clone(), c0.clone())
                            })
                            .collect::<Vec<f64>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("grid cell thread panicked")).collect()
        });

        let mut score_matrix = DMatrix::<f64>::zeros(evo_grid.len(), obs_grid.len());
        for (i, row) in score_rows.into_iter().enumerate() {
            for (j, score) in row.into_iter().enumerate() {
                score_matrix[(i, j)] = score;
            }
        }

        let (best_i, best_j) = best_cell(&score_matrix, &evo_grid, &obs_grid)?;
        debug!(
            "grid search best pair: evo={} obs={} ll_sum={}",
            evo_grid[best_i],
            obs_grid[best_j],
            score_matrix[(best_i, best_j)]
        );

        Ok(Self {
            best_evo: evo_grid[best_i],
            best_obs: obs_grid[best_j],
            evo_grid,
            obs_grid,
            score_matrix,
        })
    }

    pub fn evo_grid(&self) -> &[f64] {
        &self.evo_grid
    }

    pub fn obs_grid(&self) -> &[f64] {
        &self.obs_grid
    }

    /// `(len(evo_grid), len(obs_grid))` matrix of `ll_sum` scores, `-inf`
    /// where the candidate pair was numerically unusable.
    pub fn score_matrix(&self) -> &DMatrix<f64> {
        &self.score_matrix
    }

    pub fn best_evo(&self) -> f64 {
        self.best_evo
    }

    pub fn best_obs(&self) -> f64 {
        self.best_obs
    }
}

fn run_cell(
    evo: f64,
    obs: f64,
    rows: Vec<DVector<f64>>,
    g: DMatrix<f64>,
    y: Vec<f64>,
    m0: DVector<f64>,
    c0: DMatrix<f64>,
) -> f64 {
    let evolution = EvolutionMode::Discount(evo);
    let observation = ObservationMode::discounted_default(obs);
    match Ffbs::new(rows, g, y, m0, c0, evolution, observation) {
        Ok(mut ffbs) => match ffbs.forward_filter() {
            Ok(()) => ffbs.ll_sum(),
            Err(_) => f64::NEG_INFINITY,
        },
        Err(_) => f64::NEG_INFINITY,
    }
}

fn best_cell(score_matrix: &DMatrix<f64>, evo_grid: &[f64], obs_grid: &[f64]) -> Result<(usize, usize), Error> {
    let mut best: Option<(usize, usize)> = None;
    for i in 0..evo_grid.len() {
        for j in 0..obs_grid.len() {
            let score = score_matrix[(i, j)];
            if !score.is_finite() {
                continue;
            }
            let better = match best {
                None => true,
                Some((bi, bj)) => {
                    let cur = score_matrix[(bi, bj)];
                    score > cur || (score == cur && (evo_grid[i], obs_grid[j]) < (evo_grid[bi], obs_grid[bj]))
                }
            };
            if better {
                best = Some((i, j));
            }
        }
    }
    best.ok_or_else(|| ErrorKind::NoViableDiscountPair.into())
}
