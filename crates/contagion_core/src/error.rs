use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Failures surfaced by model construction, integration, and trajectory reads.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A parameter, initial condition, time grid, or setting was rejected.
    #[error("Invalid input for {what}: {reason}")]
    InvalidInput { what: &'static str, reason: String },

    /// The integrator could not produce a trustworthy solution.
    #[error("Numerical failure at t = {time}: {reason}")]
    NumericalFailure { time: f64, reason: String },

    /// A trajectory accessor was called before any successful simulation.
    #[error("No trajectory available; call simulate() first")]
    NotSimulated,
}

impl ModelError {
    pub(crate) fn invalid(what: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            what,
            reason: reason.into(),
        }
    }

    pub(crate) fn numerical(time: f64, reason: impl Into<String>) -> Self {
        Self::NumericalFailure {
            time,
            reason: reason.into(),
        }
    }
}

/// Rejects values that are NaN, infinite, or below zero.
pub(crate) fn ensure_non_negative(what: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(ModelError::invalid(what, format!("must be finite, got {value}")));
    }
    if value < 0.0 {
        return Err(ModelError::invalid(
            what,
            format!("must be non-negative, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_non_negative_accepts_zero_and_positive() {
        assert!(ensure_non_negative("beta", 0.0).is_ok());
        assert!(ensure_non_negative("beta", 2.5).is_ok());
    }

    #[test]
    fn ensure_non_negative_rejects_negative_and_non_finite() {
        for value in [-1e-9, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = ensure_non_negative("gamma", value).expect_err("expected rejection");
            assert!(matches!(err, ModelError::InvalidInput { what: "gamma", .. }));
        }
    }

    #[test]
    fn messages_name_the_offending_input() {
        let err = ModelError::invalid("initial state", "expected 3 compartments, got 2");
        assert_eq!(
            err.to_string(),
            "Invalid input for initial state: expected 3 compartments, got 2"
        );
        assert_eq!(
            ModelError::NotSimulated.to_string(),
            "No trajectory available; call simulate() first"
        );
    }
}
