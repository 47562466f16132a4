use nalgebra::{DMatrix, DVector};

use crate::error::{Error, ErrorKind};
use crate::filter::Ffbs;
use crate::records::{invert_or_pseudo, resymmetrize, SmoothRecords};

impl Ffbs {
    /// Run the backward (Rauch-Tung-Striebel-style) smoother over a
    /// completed forward pass, filling `m*_t, C*_t` for every `t` from
    /// `T-2` down to `0`. Anchored at `m*_{T-1} = m_{T-1}`, `C*_{T-1} = C_{T-1}`.
    ///
    /// Refuses to run if fewer than two time steps have been filtered.
    pub fn backward_smooth(&mut self) -> Result<(), Error> {
        let t_total = self.records_ref().len();
        if t_total < 2 {
            return Err(ErrorKind::NotFiltered.into());
        }

        let n = self.state_dim();
        let mut m_star = vec![DVector::zeros(n); t_total];
        let mut c_star = vec![DMatrix::zeros(n, n); t_total];

        m_star[t_total - 1] = self.records_ref().m[t_total - 1].clone();
        c_star[t_total - 1] = self.records_ref().c[t_total - 1].clone();

        let g = self.g_matrix().clone();
        for t in (0..t_total - 1).rev() {
            let records = self.records_ref();
            let r_next_inv = invert_or_pseudo(&records.r[t + 1], Some(t + 1));
            let b_t = &records.c[t] * g.transpose() * &r_next_inv;

            let residual_m = &m_star[t + 1] - &records.a[t + 1];
            m_star[t] = &records.m[t] + &b_t * residual_m;

            let residual_c = &c_star[t + 1] - &records.r[t + 1];
            c_star[t] = resymmetrize(&(&records.c[t] + &b_t * residual_c * b_t.transpose()));
        }

        self.set_smoothed(SmoothRecords { m_star, c_star });
        Ok(())
    }

    /// Smoothed marginal state mean at every `t`, after [`Self::backward_smooth`].
    pub fn m_star(&self) -> Option<&[DVector<f64>]> {
        self.smoothed_ref().map(|s| s.m_star.as_slice())
    }

    /// Smoothed marginal state covariance at every `t`, after [`Self::backward_smooth`].
    pub fn c_star(&self) -> Option<&[DMatrix<f64>]> {
        self.smoothed_ref().map(|s| s.c_star.as_slice())
    }
}
