use std::fmt;

use thiserror::Error;

/// Which pass of the two-stage registration produced a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationStage {
    /// Mask-guided coarse alignment.
    Coarse,
    /// Edge-guided refinement.
    Fine,
}

impl RegistrationStage {
    pub fn number(self) -> u8 {
        match self {
            Self::Coarse => 1,
            Self::Fine => 2,
        }
    }
}

impl fmt::Display for RegistrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

fn stage_suffix(stage: &Option<RegistrationStage>) -> String {
    match stage {
        Some(s) => format!(" at stage {s}"),
        None => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum PerfusionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    #[error("Registration failed{}: {reason}", stage_suffix(.stage))]
    Registration {
        stage: Option<RegistrationStage>,
        reason: String,
    },

    #[error("Group {group} produced no registered frames ({failed} failed)")]
    GroupFailure { group: usize, failed: usize },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Empty frame sequence")]
    EmptySequence,
}

impl PerfusionError {
    /// Registration failure not yet attributed to a stage.
    pub fn registration(reason: impl Into<String>) -> Self {
        Self::Registration {
            stage: None,
            reason: reason.into(),
        }
    }

    /// Attach a stage tag to a registration failure. Other variants pass through.
    pub fn at_stage(self, stage: RegistrationStage) -> Self {
        match self {
            Self::Registration { reason, .. } => Self::Registration {
                stage: Some(stage),
                reason,
            },
            other => other,
        }
    }

    /// Stage tag of a registration failure, if any.
    pub fn stage(&self) -> Option<RegistrationStage> {
        match self {
            Self::Registration { stage, .. } => *stage,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PerfusionError>;
