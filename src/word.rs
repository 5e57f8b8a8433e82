//! Transacted word widths.
//!
//! Two widths are supported within the same transaction: a machine
//! pointer-width word ([`u64`]) and a narrower integer word ([`i32`]). Both
//! implement [`TxWord`], which is the unsafe bridge between a raw address
//! and the atomic load/store the STM protocol requires.
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

/// A value transactable by the STM. Implemented for the two supported
/// widths; callers never need to implement it themselves.
pub trait TxWord: Copy + PartialEq + Send + Sync + 'static {
    /// Atomically loads the value at `addr` with acquire ordering.
    ///
    /// # Safety
    /// `addr` must be a live, correctly aligned location of this word's
    /// width that the application has dedicated to transactional access for
    /// as long as any transaction may touch it. Mixing transacted and
    /// non-transacted accesses to the same address is undefined behavior.
    unsafe fn atomic_load(addr: usize) -> Self;

    /// Atomically stores `val` at `addr` with release ordering.
    ///
    /// # Safety
    /// Same contract as [`TxWord::atomic_load`].
    unsafe fn atomic_store(addr: usize, val: Self);
}

impl TxWord for u64 {
    unsafe fn atomic_load(addr: usize) -> Self {
        (*(addr as *const AtomicU64)).load(Ordering::Acquire)
    }

    unsafe fn atomic_store(addr: usize, val: Self) {
        (*(addr as *const AtomicU64)).store(val, Ordering::Release)
    }
}

impl TxWord for i32 {
    unsafe fn atomic_load(addr: usize) -> Self {
        (*(addr as *const AtomicI32)).load(Ordering::Acquire)
    }

    unsafe fn atomic_store(addr: usize, val: Self) {
        (*(addr as *const AtomicI32)).store(val, Ordering::Release)
    }
}
