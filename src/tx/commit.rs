//! # Commit-mode transaction (CTx)
//!
//! Buffers writes in a per-transaction map; reads check the buffer first,
//! then read through. Orecs are acquired only at commit, in a single pass,
//! followed by publication — this bounds the window during which the
//! transaction holds any lock to the commit itself.
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

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

/// Transactions abort if more than this many microseconds have elapsed
/// since `begin()`. Encounter mode has no equivalent: its in-place writes
/// cannot livelock the way two symmetric buffering commits can.
const COMMIT_TIMEOUT_US: u64 = 10_000;

/// A single commit-mode attempt. Construct a fresh instance per attempt via
/// [`CommitTx::begin`]; `commit()`/`abort()` consume it.
pub struct CommitTx {
    id: usize,
    retries: usize,
    begin_ts: Instant,
    read_log: ReadLog,
    write_buf_w: HashMap<usize, u64>,
    write_buf_i: HashMap<usize, i32>,
    locked_orecs: Vec<(&'static Orec, u64)>,
}

impl WordStorage<u64> for CommitTx {
    fn storage_mut(&mut self) -> &mut HashMap<usize, u64> {
        &mut self.write_buf_w
    }
}

impl WordStorage<i32> for CommitTx {
    fn storage_mut(&mut self) -> &mut HashMap<usize, i32> {
        &mut self.write_buf_i
    }
}

impl CommitTx {
    /// Starts a new attempt and records its timeout baseline.
    pub fn begin() -> Self {
        let id = next_tx_id();
        debug!("CTx({id}): begin");
        Self {
            id,
            retries: 0,
            begin_ts: Instant::now(),
            read_log: ReadLog::default(),
            write_buf_w: HashMap::new(),
            write_buf_i: HashMap::new(),
            locked_orecs: Vec::new(),
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

    fn check_timeout(&self) -> bool {
        self.begin_ts.elapsed() > Duration::from_micros(COMMIT_TIMEOUT_US)
    }

    /// Buffers `val` to be written to `addr` at commit time. Last write to
    /// the same address wins.
    pub fn write<W>(&mut self, addr: usize, val: W) -> Result<()>
    where
        W: TxWord,
        Self: WordStorage<W>,
    {
        if self.check_timeout() {
            return self.abort_now(AbortCause::SelfTimeout);
        }
        if !self.read_log.validate() {
            return self.abort_now(AbortCause::ReadSetInvalidated);
        }

        self.storage_mut().insert(addr, val);
        Ok(())
    }

    /// Reads `addr`: returns the buffered value if this transaction has
    /// already written it (read-your-own-write), otherwise reads through
    /// and logs the observed word.
    pub fn read<W>(&mut self, addr: usize) -> Result<W>
    where
        W: TxWord,
        Self: WordStorage<W>,
    {
        if self.check_timeout() {
            return self.abort_now(AbortCause::SelfTimeout);
        }

        if let Some(buffered) = self.storage_mut().get(&addr) {
            return Ok(*buffered);
        }

        let orec = table::orec_of(addr);
        if orec.is_locked() {
            return self.abort_now(AbortCause::ConflictingOwner);
        }
        self.read_log.push(orec, orec.snapshot());

        if !self.read_log.validate() {
            return self.abort_now(AbortCause::ReadSetInvalidated);
        }

        Ok(unsafe { W::atomic_load(addr) })
    }

    /// Locks every orec touched by a buffered write, revalidates the read
    /// log, publishes the writes, then releases the locks. A transaction
    /// with no buffered writes commits as a pure validation of its read
    /// log.
    pub fn commit(mut self) -> Result<()> {
        if self.write_buf_w.is_empty() && self.write_buf_i.is_empty() {
            if !self.read_log.validate() {
                return self.abort_now(AbortCause::ReadSetInvalidated);
            }
            info!("CTx({}): committed (read-only)", self.id);
            return Ok(());
        }

        let addrs = self
            .write_buf_w
            .keys()
            .copied()
            .chain(self.write_buf_i.keys().copied());

        for addr in addrs.collect::<Vec<_>>() {
            let orec = table::orec_of(addr);
            if self.locked_orecs.iter().any(|(o, _)| std::ptr::eq(*o, orec)) {
                continue;
            }

            let expected = if let Some(logged_word) = self.read_log.logged_word(orec) {
                // we read through this orec earlier: lock from exactly the
                // version we observed, so a writer that slipped in between
                // is caught here rather than at validation.
                logged_word
            } else {
                let snapshot = orec.snapshot();
                if Orec::is_locked_word(snapshot) {
                    return self.abort_now(AbortCause::ConflictingOwner);
                }
                snapshot
            };

            if !orec.try_lock(expected, self.id) {
                return self.abort_now(AbortCause::LockAcquisitionFailed);
            }
            self.locked_orecs.push((orec, expected >> 1));
            // overwrite, not append: if this orec was already in the read
            // log its entry still holds the pre-lock word, which would
            // mismatch the post-lock word at the validate() call below.
            self.read_log.record(orec, orec.snapshot());
            debug!("CTx({}): locked orec for {addr:#x} at commit", self.id);
        }

        if !self.read_log.validate() {
            return self.abort_now(AbortCause::ReadSetInvalidated);
        }

        for (addr, val) in self.write_buf_w.drain() {
            unsafe { u64::atomic_store(addr, val) };
        }
        for (addr, val) in self.write_buf_i.drain() {
            unsafe { i32::atomic_store(addr, val) };
        }
        for (orec, prior_version) in self.locked_orecs.drain(..) {
            orec.unlock(prior_version);
        }
        self.read_log.clear();
        self.retries = 0;
        info!("CTx({}): committed", self.id);
        Ok(())
    }

    /// Explicitly aborts: discards buffered writes (nothing was ever
    /// published, so there is nothing to undo), releases any orecs locked
    /// during a partial commit, and backs off.
    pub fn abort(mut self) -> AbortCause {
        self.release_and_discard();
        info!("CTx({}): aborted (application request)", self.id);
        backoff::backoff_commit();
        AbortCause::ApplicationRequested
    }

    fn abort_now<T>(&mut self, cause: AbortCause) -> Result<T> {
        self.release_and_discard();
        info!("CTx({}): aborted ({cause})", self.id);
        backoff::backoff_commit();
        self.retries += 1;
        Err(Abort(cause))
    }

    fn release_and_discard(&mut self) {
        for (orec, prior_version) in self.locked_orecs.drain(..) {
            orec.unlock(prior_version);
        }
        self.write_buf_w.clear();
        self.write_buf_i.clear();
        self.read_log.clear();
    }
}
