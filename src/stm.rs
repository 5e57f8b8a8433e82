//! # Stm driver
//!
//! A thin retry-loop runner: construct a fresh transaction per attempt, run
//! the caller's closure against it, commit, and retry on abort. This is the
//! same shape as the teacher implementation's `Stm::read_write` loop, but
//! driving [`EncounterTx`]/[`CommitTx`] instead of TVar-based transactions.
//! Using it is optional — the raw `begin`/`read`/`write`/`commit`/`abort`
//! API works standalone for callers who want to drive retries themselves.
use log::info;

use crate::tx::{CommitTx, EncounterTx};

/// Retry-loop driver for transactions.
pub struct Stm;

impl Stm {
    /// Runs `f` against a fresh [`EncounterTx`] until it commits. `f`
    /// itself is not given `&mut EncounterTx` ownership of the commit
    /// decision — on `Ok(())` the driver commits; on `Err(_)` or a failed
    /// commit, the driver backs off (already done inside the transaction's
    /// own abort path) and retries with a fresh attempt.
    pub fn run_encounter<F>(f: F)
    where
        F: Fn(&mut EncounterTx) -> crate::error::Result<()>,
    {
        let mut retries = 0usize;
        loop {
            let mut tx = EncounterTx::begin();
            let id = tx.id();
            let outcome = f(&mut tx);
            match outcome.and_then(|_| tx.commit()) {
                Ok(()) => {
                    info!("Stm: ETx({id}) committed after {retries} retries");
                    return;
                }
                Err(_) => {
                    retries += 1;
                    continue;
                }
            }
        }
    }

    /// Runs `f` against a fresh [`CommitTx`] until it commits, mirroring
    /// [`Stm::run_encounter`].
    pub fn run_commit<F>(f: F)
    where
        F: Fn(&mut CommitTx) -> crate::error::Result<()>,
    {
        let mut retries = 0usize;
        loop {
            let mut tx = CommitTx::begin();
            let id = tx.id();
            let outcome = f(&mut tx);
            match outcome.and_then(|_| tx.commit()) {
                Ok(()) => {
                    info!("Stm: CTx({id}) committed after {retries} retries");
                    return;
                }
                Err(_) => {
                    retries += 1;
                    continue;
                }
            }
        }
    }
}
