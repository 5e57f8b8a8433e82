//! # Encounter-mode transaction (ETx)
//!
//! Acquires ownership of a stripe eagerly, at the first write to it, and
//! writes in place immediately. The prior value is recorded so it can be
//! restored if the transaction aborts.
use std::collections::HashMap;

use log::{debug, info};

use crate::{
    backoff,
    error::{Abort, AbortCause, Result},
    orec::Orec,
    readlog::ReadLog,
    table,
    tx::{next_tx_id, WordStorage},
    word::TxWord,
};

/// A single encounter-mode attempt. Construct a fresh instance per attempt
/// via [`EncounterTx::begin`]; `commit()`/`abort()` consume it.
pub struct EncounterTx {
    id: usize,
    retries: usize,
    read_log: ReadLog,
    locked_orecs: Vec<(&'static Orec, u64)>,
    prev_w: HashMap<usize, u64>,
    prev_i: HashMap<usize, i32>,
}

impl WordStorage<u64> for EncounterTx {
    fn storage_mut(&mut self) -> &mut HashMap<usize, u64> {
        &mut self.prev_w
    }
}

impl WordStorage<i32> for EncounterTx {
    fn storage_mut(&mut self) -> &mut HashMap<usize, i32> {
        &mut self.prev_i
    }
}

impl EncounterTx {
    /// Starts a new attempt.
    pub fn begin() -> Self {
        let id = next_tx_id();
        debug!("ETx({id}): begin");
        Self {
            id,
            retries: 0,
            read_log: ReadLog::default(),
            locked_orecs: Vec::new(),
            prev_w: HashMap::new(),
            prev_i: HashMap::new(),
        }
    }

    /// Diagnostic transaction id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of consecutive aborts this attempt has recorded. Reset by a
    /// fresh `begin()`; see the `Stm` driver for cross-attempt retry counts.
    pub fn retries(&self) -> usize {
        self.retries
    }

    fn owns(&self, orec: &'static Orec) -> bool {
        self.locked_orecs.iter().any(|(o, _)| std::ptr::eq(*o, orec))
    }

    /// Writes `val` at `addr`. Acquires `addr`'s orec on first touch,
    /// records the prior value, validates the read log, then stores in
    /// place.
    pub fn write<W>(&mut self, addr: usize, val: W) -> Result<()>
    where
        W: TxWord,
        Self: WordStorage<W>,
    {
        let orec = table::orec_of(addr);

        if !self.owns(orec) {
            let snapshot = orec.snapshot();
            if Orec::is_locked_word(snapshot) {
                return self.abort_now(AbortCause::ConflictingOwner);
            }
            if !orec.try_lock(snapshot, self.id) {
                return self.abort_now(AbortCause::LockAcquisitionFailed);
            }
            self.locked_orecs.push((orec, snapshot >> 1));
            // overwrite, not append: an earlier read of this same stripe may
            // already hold a logged entry with the pre-lock word.
            self.read_log.record(orec, orec.snapshot());
            debug!("ETx({}): locked orec for {addr:#x}", self.id);
        }

        let prior = unsafe { W::atomic_load(addr) };
        self.storage_mut().entry(addr).or_insert(prior);

        if !self.read_log.validate() {
            return self.abort_now(AbortCause::ReadSetInvalidated);
        }

        unsafe { W::atomic_store(addr, val) };
        Ok(())
    }

    /// Reads the value at `addr`. If this transaction already owns the
    /// stripe, returns its own in-place write; otherwise reads through,
    /// aborting if the stripe is locked by someone else.
    pub fn read<W>(&mut self, addr: usize) -> Result<W>
    where
        W: TxWord,
    {
        let orec = table::orec_of(addr);

        if self.owns(orec) {
            // Nothing else can change this orec while we hold it; we still
            // log it once so uniform validation covers it.
        } else if orec.is_locked() {
            return self.abort_now(AbortCause::ConflictingOwner);
        } else if self.read_log.logged_word(orec).is_none() {
            self.read_log.push(orec, orec.snapshot());
        }

        if !self.read_log.validate() {
            return self.abort_now(AbortCause::ReadSetInvalidated);
        }

        Ok(unsafe { W::atomic_load(addr) })
    }

    /// Validates the read log and, if it still holds, releases every
    /// locked orec (publishing a new version for each) and clears the
    /// transaction's state. Returns `Ok(())` on success.
    pub fn commit(mut self) -> Result<()> {
        if !self.read_log.validate() {
            return self.abort_now(AbortCause::ReadSetInvalidated);
        }

        for (orec, prior_version) in self.locked_orecs.drain(..) {
            orec.unlock(prior_version);
        }
        self.read_log.clear();
        self.retries = 0;
        info!("ETx({}): committed", self.id);
        Ok(())
    }

    /// Explicitly aborts: restores every address this transaction
    /// overwrote to its pre-transaction value, releases locked orecs, and
    /// backs off. Returns the cause for diagnostics.
    pub fn abort(mut self) -> AbortCause {
        self.rollback_and_release();
        info!("ETx({}): aborted (application request)", self.id);
        backoff::backoff_encounter();
        AbortCause::ApplicationRequested
    }

    fn abort_now<T>(&mut self, cause: AbortCause) -> Result<T> {
        self.rollback_and_release();
        info!("ETx({}): aborted ({cause})", self.id);
        backoff::backoff_encounter();
        self.retries += 1;
        Err(Abort(cause))
    }

    fn rollback_and_release(&mut self) {
        for (addr, val) in self.prev_w.drain() {
            unsafe { u64::atomic_store(addr, val) };
        }
        for (addr, val) in self.prev_i.drain() {
            unsafe { i32::atomic_store(addr, val) };
        }
        for (orec, prior_version) in self.locked_orecs.drain(..) {
            orec.unlock(prior_version);
        }
        self.read_log.clear();
    }
}
