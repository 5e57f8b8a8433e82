//! # Orec (ownership record)
//!
//! An [`Orec`] is a single atomic word that is either an unlocked version
//! number or a locked slot owning a transaction id. The low bit of the word
//! distinguishes the two forms: even words are unlocked versions (`version
//! << 1`), odd words are locked and owned by `(word >> 1)`.
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic conflict-detection primitive guarding one stripe of memory.
///
/// All operations are lock-free: a conflicting transaction never blocks
/// inside an orec, it observes the conflict and aborts.
#[derive(Debug)]
pub struct Orec {
    word: AtomicU64,
}

impl Orec {
    /// A freshly created orec is unlocked at version 0.
    pub fn new() -> Self {
        Self {
            word: AtomicU64::new(0),
        }
    }

    /// Returns `true` if `word` encodes a locked orec.
    #[inline(always)]
    pub fn is_locked_word(word: u64) -> bool {
        word & 1 == 1
    }

    /// Returns the current encoded word (acquire ordering). Callers must
    /// re-validate after any dependent read of transacted data.
    #[inline(always)]
    pub fn snapshot(&self) -> u64 {
        self.word.load(Ordering::Acquire)
    }

    /// Returns `true` if the orec is currently held by some transaction.
    #[inline(always)]
    pub fn is_locked(&self) -> bool {
        Self::is_locked_word(self.snapshot())
    }

    /// Returns the owning transaction id, if locked.
    pub fn owner(&self) -> Option<usize> {
        let word = self.snapshot();
        Self::is_locked_word(word).then(|| (word >> 1) as usize)
    }

    /// Returns the current version. Only meaningful when the orec is
    /// unlocked; callers are expected to have already checked `is_locked()`.
    pub fn version(&self) -> u64 {
        self.snapshot() >> 1
    }

    /// Tries to acquire the orec, moving it from the unlocked word
    /// `expected` to locked-by-`owner_id`. Fails if the orec is not
    /// currently unlocked, or if its word no longer equals `expected` —
    /// this binds the right to lock to the exact version the caller
    /// observed.
    pub fn try_lock(&self, expected: u64, owner_id: usize) -> bool {
        if Self::is_locked_word(expected) {
            return false;
        }
        let locked = ((owner_id as u64) << 1) | 1;
        self.word
            .compare_exchange(expected, locked, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the lock, publishing a version strictly greater than
    /// `prior_version` (the version observed right before locking).
    /// Precondition: the caller holds the lock. Release ordering, so every
    /// store made while holding the lock is visible to any reader that
    /// observes the new version.
    pub fn unlock(&self, prior_version: u64) {
        let new_version = prior_version + 1;
        self.word.store(new_version << 1, Ordering::Release);
    }
}

impl Default for Orec {
    fn default() -> Self {
        Self::new()
    }
}
