use thiserror::Error;

/// Errors raised by the validation gate, the rank aggregator and the stable matcher
///
/// The set is closed on purpose so callers can branch on the kind instead of
/// parsing message text. None of them are retried inside the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// Input violates a hard domain constraint (counts, fitness, preferences, capacity)
    #[error("Constraint violation on {field}: {message}")]
    ConstraintViolation { field: String, message: String },

    /// Aggregation inputs do not cover the same number of candidates
    #[error("Shape mismatch on {field}: expected {expected}, got {actual}")]
    ShapeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Deferred acceptance exceeded its round bound
    #[error("Matching did not converge: {rounds} rounds exceeds the limit of {limit}")]
    NonConvergence { rounds: usize, limit: usize },
}

impl MatchError {
    pub fn constraint(field: impl Into<String>, message: impl Into<String>) -> Self {
        MatchError::ConstraintViolation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn shape(field: impl Into<String>, expected: usize, actual: usize) -> Self {
        MatchError::ShapeMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }

    /// Stable machine-readable tag for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::ConstraintViolation { .. } => "constraint_violation",
            MatchError::ShapeMismatch { .. } => "shape_mismatch",
            MatchError::NonConvergence { .. } => "non_convergence",
        }
    }

    /// Name of the offending field, when the error is tied to one
    pub fn field(&self) -> Option<&str> {
        match self {
            MatchError::ConstraintViolation { field, .. } => Some(field),
            MatchError::ShapeMismatch { field, .. } => Some(field),
            MatchError::NonConvergence { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(MatchError::constraint("capacity", "zero").kind(), "constraint_violation");
        assert_eq!(MatchError::shape("fitness", 3, 2).kind(), "shape_mismatch");
        assert_eq!(
            MatchError::NonConvergence { rounds: 5, limit: 4 }.kind(),
            "non_convergence"
        );
    }

    #[test]
    fn test_error_message_names_field() {
        let err = MatchError::shape("profile[1]", 3, 2);
        assert_eq!(err.field(), Some("profile[1]"));
        assert_eq!(err.to_string(), "Shape mismatch on profile[1]: expected 3, got 2");
    }
}
