use thiserror::Error;

/// Errors produced by the intake flow
#[derive(Debug, Error)]
pub enum IntakeError {
    /// A completion record was requested before a required slot was filled
    #[error("required slot not filled: {0}")]
    MissingSlot(&'static str),

    /// A conversation was asked for its completion record before finishing
    #[error("conversation is not complete")]
    NotComplete,
}

pub type Result<T> = std::result::Result<T, IntakeError>;
