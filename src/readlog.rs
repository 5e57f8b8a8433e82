//! # Read-set validator
//!
//! The read log is the ordered record of `(orec, observed word)` pairs a
//! transaction has captured. Validating it re-reads every entry's orec and
//! checks the word is unchanged; any mismatch — whether the orec advanced
//! to a new version or was grabbed by another writer — means the
//! transaction's snapshot is no longer consistent and it must abort.
use crate::orec::Orec;

#[derive(Default)]
pub(crate) struct ReadLog {
    entries: Vec<(&'static Orec, u64)>,
}

impl ReadLog {
    pub(crate) fn push(&mut self, orec: &'static Orec, observed_word: u64) {
        self.entries.push((orec, observed_word));
    }

    /// Records `observed_word` for `orec`, overwriting any existing entry
    /// for the same orec rather than appending a second one. Needed when a
    /// stripe's word changes under the transaction's own hand (acquiring
    /// its lock) after an earlier read already logged the pre-lock word —
    /// without this, the stale entry would fail validation the moment the
    /// transaction locks a stripe it already read.
    pub(crate) fn record(&mut self, orec: &'static Orec, observed_word: u64) {
        match self.entries.iter_mut().find(|(o, _)| std::ptr::eq(*o, orec)) {
            Some(entry) => entry.1 = observed_word,
            None => self.entries.push((orec, observed_word)),
        }
    }

    /// Returns the word logged for `orec`, if this transaction has already
    /// read through it.
    pub(crate) fn logged_word(&self, orec: &'static Orec) -> Option<u64> {
        self.entries
            .iter()
            .find(|(o, _)| std::ptr::eq(*o, orec))
            .map(|(_, w)| *w)
    }

    /// Re-reads every logged orec and confirms its word has not changed.
    pub(crate) fn validate(&self) -> bool {
        self.entries.iter().all(|(orec, observed)| orec.snapshot() == *observed)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
