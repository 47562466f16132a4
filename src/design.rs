use nalgebra::{DMatrix, DVector};

use crate::error::{Error, ErrorKind};

/// Input form for the per-step design vectors `F[0..T)`.
///
/// Upstream producers sometimes hand over a `(T, n)` matrix and sometimes a
/// `(T, n, 1)` tensor (a trailing singleton dimension left over from a
/// column-vector convention). Both are accepted and normalized to the same
/// internal representation; behavior afterward is identical.
pub enum DesignInput {
    /// One row per time step, one column per state dimension: shape `(T, n)`.
    Matrix(DMatrix<f64>),
    /// One `(n, 1)` column matrix per time step: shape `(T, n, 1)`.
    Tensor(Vec<DMatrix<f64>>),
}

impl From<DMatrix<f64>> for DesignInput {
    fn from(m: DMatrix<f64>) -> Self {
        DesignInput::Matrix(m)
    }
}

impl From<Vec<DMatrix<f64>>> for DesignInput {
    fn from(t: Vec<DMatrix<f64>>) -> Self {
        DesignInput::Tensor(t)
    }
}

impl From<Vec<DVector<f64>>> for DesignInput {
    fn from(rows: Vec<DVector<f64>>) -> Self {
        let t = rows.len();
        let n = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut m = DMatrix::<f64>::zeros(t, n);
        for (i, row) in rows.into_iter().enumerate() {
            m.set_row(i, &row.transpose());
        }
        DesignInput::Matrix(m)
    }
}

/// Normalize a [`DesignInput`] into one design vector per time step, checking
/// it against the declared `t` and `n`.
pub(crate) fn normalize(input: DesignInput, t: usize, n: usize) -> Result<Vec<DVector<f64>>, Error> {
    match input {
        DesignInput::Matrix(m) => {
            if m.nrows() != t || m.ncols() != n {
                return Err(ErrorKind::ShapeMismatch {
                    field: "F",
                    expected: (t, n),
                    actual: (m.nrows(), m.ncols()),
                }
                .into());
            }
            Ok((0..t).map(|i| m.row(i).transpose()).collect())
        }
        DesignInput::Tensor(rows) => {
            if rows.len() != t {
                return Err(ErrorKind::ShapeMismatch {
                    field: "F",
                    expected: (t, n),
                    actual: (rows.len(), n),
                }
                .into());
            }
            rows.into_iter()
                .map(|row| {
                    if row.nrows() != n || row.ncols() != 1 {
                        return Err(ErrorKind::ShapeMismatch {
                            field: "F",
                            expected: (n, 1),
                            actual: (row.nrows(), row.ncols()),
                        }
                        .into());
                    }
                    Ok(DVector::from_column_slice(row.column(0).as_slice()))
                })
                .collect()
        }
    }
}
