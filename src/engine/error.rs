use ulid::Ulid;

use crate::model::Ms;

/// Coarse classification used by callers to pick a response class. Absence
/// and authorization failures share `NotFound` on purpose: a caller probing
/// someone else's booking learns nothing beyond "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Validation,
    UnsupportedState,
    Internal,
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// Booking window with start strictly after end.
    WindowInverted { start: Ms, end: Ms },
    /// Booking window with start equal to end.
    WindowEmpty(Ms),
    ItemUnavailable(Ulid),
    /// Decide on a booking that is already APPROVED. Fires for rejections too.
    AlreadyBooked(Ulid),
    /// Window overlaps an APPROVED booking on the same item.
    Conflict(Ulid),
    /// Comment attempt without a completed approved rental.
    NotRented { user_id: Ulid, item_id: Ulid },
    /// Unrecognized listing-state token.
    UnknownState(String),
    InvalidPage { from: i64, size: i64 },
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::NotFound(_) => ErrorClass::NotFound,
            EngineError::AlreadyExists(_)
            | EngineError::WindowInverted { .. }
            | EngineError::WindowEmpty(_)
            | EngineError::ItemUnavailable(_)
            | EngineError::AlreadyBooked(_)
            | EngineError::Conflict(_)
            | EngineError::NotRented { .. }
            | EngineError::InvalidPage { .. } => ErrorClass::Validation,
            EngineError::UnknownState(_) => ErrorClass::UnsupportedState,
            EngineError::LimitExceeded(_) | EngineError::WalError(_) => ErrorClass::Internal,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::WindowInverted { start, end } => {
                write!(f, "booking start {start} is after end {end}")
            }
            EngineError::WindowEmpty(t) => write!(f, "booking start equals end: {t}"),
            EngineError::ItemUnavailable(id) => write!(f, "item not available: {id}"),
            EngineError::AlreadyBooked(id) => write!(f, "already booked: {id}"),
            EngineError::Conflict(id) => write!(f, "conflict with booking: {id}"),
            EngineError::NotRented { user_id, item_id } => {
                write!(f, "user {user_id} did not rent item {item_id}")
            }
            EngineError::UnknownState(token) => write!(f, "unknown state: {token}"),
            EngineError::InvalidPage { from, size } => {
                write!(f, "invalid page: from={from} size={size}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
