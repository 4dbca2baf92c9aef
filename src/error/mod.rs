use std::fmt;

use thiserror::Error;

/// Errors produced while building or simulating a pharmacokinetic model
#[derive(Error, Debug)]
pub enum PkError {
    /// A compartment topology violated one of its invariants
    #[error("Invalid model topology: {0}")]
    InvalidTopology(String),

    /// A dosing protocol violated one of its invariants
    #[error("Invalid dosing protocol: {0}")]
    InvalidProtocol(String),

    /// The solver settings cannot describe a valid run
    #[error("Invalid solver settings: {0}")]
    InvalidSettings(String),

    /// The ODE solver gave up before reaching the end of the simulation
    #[error("Integration failed at t = {time}: {reason}")]
    IntegrationFailure { time: f64, reason: FailureReason },

    /// Failed to parse or serialize a scenario
    #[error("Scenario error: {0}")]
    Scenario(#[from] serde_json::Error),
}

/// Why an integration could not be completed
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The adaptive step size underflowed, usually a sign of a stiff parameter set
    StepSizeTooSmall,
    /// Too many rejected steps in a row
    ErrorTestFailures,
    /// The run used up its step budget
    MaxStepsExceeded(usize),
    /// A state or its derivative became NaN or infinite
    NonFinite,
    /// Any other error reported by the solver
    Solver(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::StepSizeTooSmall => write!(
                f,
                "the step size went to zero, one of the rates is probably too large for the time span"
            ),
            FailureReason::ErrorTestFailures => {
                write!(f, "too many consecutive steps failed the error test")
            }
            FailureReason::MaxStepsExceeded(max) => {
                write!(f, "exceeded the maximum number of steps ({})", max)
            }
            FailureReason::NonFinite => write!(f, "a state or its derivative became NaN or infinite"),
            FailureReason::Solver(message) => write!(f, "{}", message),
        }
    }
}

impl PkError {
    pub(crate) fn topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology(message.into())
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::InvalidProtocol(message.into())
    }

    pub(crate) fn settings(message: impl Into<String>) -> Self {
        Self::InvalidSettings(message.into())
    }

    pub(crate) fn integration(time: f64, reason: FailureReason) -> Self {
        Self::IntegrationFailure { time, reason }
    }

    /// Returns true if this error was raised by the integrator rather than by validation
    pub fn is_integration_failure(&self) -> bool {
        matches!(self, Self::IntegrationFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_failure_reports_time_and_reason() {
        let err = PkError::integration(0.25, FailureReason::MaxStepsExceeded(10));
        assert!(err.is_integration_failure());
        let message = err.to_string();
        assert!(message.contains("0.25"));
        assert!(message.contains("maximum number of steps (10)"));
    }

    #[test]
    fn validation_errors_are_not_integration_failures() {
        assert!(!PkError::topology("bad volume").is_integration_failure());
        assert!(!PkError::protocol("bad window").is_integration_failure());
    }
}
