use thiserror::Error;

/// Errors surfaced by the projection engine.
///
/// Every error is raised where it is detected and returned unchanged to the
/// caller. A failed run never yields a partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// Malformed input: mismatched lengths, weights that do not sum to one,
    /// out-of-range counts or horizons.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    /// Too few aligned observations to estimate statistics.
    #[error(
        "insufficient data: {observations} aligned observations, at least {required} required"
    )]
    InsufficientData {
        observations: usize,
        required: usize,
    },

    /// Cholesky factorization failed at `index` with a negative pivot.
    #[error(
        "correlation matrix is not positive semidefinite (pivot {pivot:.3e} at row {index})"
    )]
    NonPositiveSemidefiniteCorrelation { index: usize, pivot: f64 },

    /// A requested symbol has no column in the returns matrix.
    #[error("symbol `{0}` not present in returns matrix")]
    UnknownSymbol(String),
}

impl ProjectionError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ProjectionError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ProjectionError::invalid("weights", "must sum to 1.0 (got 0.9000)");
        assert_eq!(
            err.to_string(),
            "invalid parameter `weights`: must sum to 1.0 (got 0.9000)"
        );

        let err = ProjectionError::InsufficientData {
            observations: 12,
            required: 20,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: 12 aligned observations, at least 20 required"
        );

        let err = ProjectionError::UnknownSymbol("QQQ".into());
        assert!(err.to_string().contains("QQQ"));
    }
}
