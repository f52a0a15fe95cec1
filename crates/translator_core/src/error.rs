use std::fmt;

use crate::Phase;

/// A locally refused operation. The state is never changed when one is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    UploadNotAllowed { phase: Phase },
    ParametersLocked { phase: Phase },
    EmptyParameter { field: &'static str },
    NotReady { phase: Phase },
    JobAlreadyActive { phase: Phase },
    StartAlreadyPending,
    ModelNotSelected,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UploadNotAllowed { phase } => {
                write!(f, "cannot upload a file while {phase}")
            }
            ValidationError::ParametersLocked { phase } => {
                write!(f, "job parameters are locked while {phase}")
            }
            ValidationError::EmptyParameter { field } => write!(f, "{field} must not be empty"),
            ValidationError::NotReady { phase } => {
                write!(f, "no file ready to translate (phase {phase})")
            }
            ValidationError::JobAlreadyActive { phase } => {
                write!(f, "a job is already active (phase {phase})")
            }
            ValidationError::StartAlreadyPending => write!(f, "a start request is already in flight"),
            ValidationError::ModelNotSelected => write!(f, "no model selected"),
        }
    }
}

impl std::error::Error for ValidationError {}
