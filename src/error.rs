//! Error types crossing the public boundary.
use thiserror::Error as DeriveError;

/// The reason a transaction aborted. Purely diagnostic: every cause leads to
/// the same behavior (discard speculative state, back off, let the
/// application retry from a fresh attempt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeriveError)]
pub enum AbortCause {
    #[error("orec is owned by another transaction")]
    ConflictingOwner,

    #[error("failed to acquire a lock on an orec")]
    LockAcquisitionFailed,

    #[error("read set was invalidated by a concurrent writer")]
    ReadSetInvalidated,

    #[error("transaction exceeded its commit-time budget")]
    SelfTimeout,

    #[error("aborted by application request")]
    ApplicationRequested,
}

/// The single error type a transaction operation can signal. Once any
/// operation returns this, the transaction is dead; construct a fresh one
/// via `begin()` to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeriveError)]
#[error("transaction aborted: {0}")]
pub struct Abort(pub AbortCause);

pub type Result<T> = core::result::Result<T, Abort>;
