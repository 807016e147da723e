/// Error types for the membership store and distribution engine
///
/// Every store operation returns `Result<T, StoreError>`. Transports do not
/// need to match individual variants: [`StoreError::kind`] collapses them into
/// the four outcome classes a caller can act on.
///
/// Creating a user or segment that already exists is deliberately absent from
/// this taxonomy; see [`crate::models::Created`].

use thiserror::Error;

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store and distribution operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced user does not exist
    #[error("User {0} not found")]
    UserNotFound(i64),

    /// Referenced segment does not exist
    #[error("Segment '{0}' not found")]
    SegmentNotFound(String),

    /// Distribution percent outside (0, 100]
    #[error("Percent must be greater than 0 and at most 100, got {0}")]
    InvalidPercent(f64),

    /// Rename target already belongs to another segment
    #[error("Segment name '{0}' is already taken")]
    SegmentNameTaken(String),

    /// Underlying transaction failed; nothing was applied
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome class of a [`StoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced user or segment does not exist
    NotFound,

    /// An argument is out of range
    InvalidArgument,

    /// The request collides with existing state
    Conflict,

    /// The storage layer failed
    StorageFailure,
}

impl StoreError {
    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::UserNotFound(_) | StoreError::SegmentNotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidPercent(_) => ErrorKind::InvalidArgument,
            StoreError::SegmentNameTaken(_) => ErrorKind::Conflict,
            StoreError::Database(_) => ErrorKind::StorageFailure,
        }
    }

    /// True for `UserNotFound` and `SegmentNotFound`
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Returns true if the error is a unique constraint violation (SQLSTATE 23505)
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
