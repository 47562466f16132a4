use core::fmt;

/// The kinds of error this crate can produce.
///
/// Construction-time problems (`ShapeMismatch`, `InvalidMode`, `OutOfRange`,
/// `NonFinite`) are detected once, in [`crate::Ffbs::new`], before any
/// per-step record is allocated. The remaining kinds surface from running the
/// recursions themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// An input array's shape disagrees with the declared `T, n`.
    ShapeMismatch {
        field: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Both or neither of a mutually exclusive pair of options were supplied.
    InvalidMode { field: &'static str },
    /// A scalar input fell outside its required range.
    OutOfRange { field: &'static str, value: f64 },
    /// A required-finite input contained `NaN` or `Inf`.
    NonFinite { field: &'static str },
    /// The recursion hit a numerically degenerate state it cannot recover from.
    NumericalInstability { step: usize, reason: &'static str },
    /// The backward smoother or sampler was invoked before a complete forward pass.
    NotFiltered,
    /// Every candidate pair in a discount grid search failed.
    NoViableDiscountPair,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ShapeMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "shape mismatch in `{field}`: expected {expected:?}, got {actual:?}"
            ),
            ErrorKind::InvalidMode { field } => {
                write!(f, "exactly one of the `{field}` mode options must be set")
            }
            ErrorKind::OutOfRange { field, value } => {
                write!(f, "`{field}` is out of range: {value}")
            }
            ErrorKind::NonFinite { field } => write!(f, "`{field}` contains a non-finite value"),
            ErrorKind::NumericalInstability { step, reason } => {
                write!(f, "numerical instability at step {step}: {reason}")
            }
            ErrorKind::NotFiltered => {
                write!(f, "forward_filter() must complete before this operation")
            }
            ErrorKind::NoViableDiscountPair => {
                write!(f, "every candidate discount pair produced an unusable score")
            }
        }
    }
}

/// Error type returned by this crate's fallible operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}
