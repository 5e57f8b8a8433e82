//! Transaction state machines: encounter-time locking ([`encounter::EncounterTx`])
//! and commit-time locking ([`commit::CommitTx`]).
pub mod commit;
pub mod encounter;

use std::sync::atomic::{AtomicUsize, Ordering};

pub use commit::CommitTx;
pub use encounter::EncounterTx;

static NEXT_TX_ID: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn next_tx_id() -> usize {
    NEXT_TX_ID.fetch_add(1, Ordering::Relaxed)
}

/// Per-width storage dispatch. Each transaction type implements this once
/// for `u64` and once for `i32` so that generic `read`/`write` methods can
/// reach the right backing map without duplicating the method bodies.
pub(crate) trait WordStorage<W> {
    fn storage_mut(&mut self) -> &mut std::collections::HashMap<usize, W>;
}
