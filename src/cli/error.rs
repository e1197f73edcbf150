//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),

    /// Batch finished with failures; details were already printed.
    #[error("{0}")]
    PartialFailure(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::PartialFailure(_) => exitcode::TEMPFAIL,
            CliError::Infra(e) => match e {
                InfraError::Http { .. } => exitcode::UNAVAILABLE,
                InfraError::InvalidUrl { .. } => exitcode::CONFIG,
                InfraError::Selector { .. } => exitcode::SOFTWARE,
                InfraError::Application(e) => match e {
                    ApplicationError::Domain(DomainError::NotFound(_)) => exitcode::NOINPUT,
                    ApplicationError::Domain(_) => exitcode::DATAERR,
                    ApplicationError::Transport { .. } => exitcode::UNAVAILABLE,
                    ApplicationError::PartialBatchFailure { .. } => exitcode::TEMPFAIL,
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DomainError::NotFound("x".into()), exitcode::NOINPUT)]
    #[case(DomainError::MissingParent("x".into()), exitcode::DATAERR)]
    #[case(DomainError::CycleDetected("x".into()), exitcode::DATAERR)]
    fn given_domain_error_when_exiting_then_maps_to_sysexit(
        #[case] error: DomainError,
        #[case] expected: i32,
    ) {
        let err: CliError = ApplicationError::from(error).into();
        assert_eq!(err.exit_code(), expected);
    }

    #[test]
    fn given_transport_error_when_exiting_then_unavailable() {
        let err: CliError = ApplicationError::transport(None).into();
        assert_eq!(err.exit_code(), exitcode::UNAVAILABLE);
    }
}
