use thiserror::Error;

/// Transport-agnostic classification of a [`CoreError`], for a transport layer
/// to map onto HTTP status codes / gRPC codes / whatever it speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoreErrorKind {
    InvalidInput,
    InvalidBakeSpec,
    NotFound,
    InvalidState,
    RackConflict,
    NoSlotBeforeClose,
    OvenMismatch,
    CannotFulfil,
    StoreIoError,
}

/// Error taxonomy used across the production core (§7).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid bake spec for item {item_guid}: {reason}")]
    InvalidBakeSpec { item_guid: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("rack conflict: {0}")]
    RackConflict(String),

    #[error("no slot available before close: {0}")]
    NoSlotBeforeClose(String),

    #[error("oven mismatch: {0}")]
    OvenMismatch(String),

    #[error("cannot fulfil order: {0}")]
    CannotFulfil(String),

    #[error("store I/O error: {0}")]
    StoreIoError(String),
}

impl CoreError {
    pub fn kind(&self) -> CoreErrorKind {
        match self {
            CoreError::InvalidInput(_) => CoreErrorKind::InvalidInput,
            CoreError::InvalidBakeSpec { .. } => CoreErrorKind::InvalidBakeSpec,
            CoreError::NotFound(_) => CoreErrorKind::NotFound,
            CoreError::InvalidState(_) => CoreErrorKind::InvalidState,
            CoreError::RackConflict(_) => CoreErrorKind::RackConflict,
            CoreError::NoSlotBeforeClose(_) => CoreErrorKind::NoSlotBeforeClose,
            CoreError::OvenMismatch(_) => CoreErrorKind::OvenMismatch,
            CoreError::CannotFulfil(_) => CoreErrorKind::CannotFulfil,
            CoreError::StoreIoError(_) => CoreErrorKind::StoreIoError,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
