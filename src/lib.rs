// SPDX-License-Identifier: Apache-2.0

//! # orec-stm
//!
//! Software transactional memory over a fixed-size ownership-record (orec)
//! table. Multiple threads run groups of reads and writes against shared
//! memory as atomic transactions: each transaction observes a consistent
//! snapshot of memory and either commits all its writes together or aborts
//! and leaves memory unchanged.
//!
//! Two transaction flavors share the same orec table and validator:
//!
//! - [`EncounterTx`] acquires orecs eagerly at first write and writes in
//!   place, keeping a rollback map to undo on abort.
//! - [`CommitTx`] buffers writes and only acquires orecs, in one pass, at
//!   commit time.
//!
//! Both support two word widths in the same transaction — `u64` (a
//! pointer-wide word) and `i32` — via the [`TxWord`] trait.
//!
//! ```
//! use orec_stm::{EncounterTx, TxWord};
//!
//! // a transacted u64 cell, leaked so its address is 'static for this example
//! let cell: &'static std::sync::atomic::AtomicU64 =
//!     Box::leak(Box::new(std::sync::atomic::AtomicU64::new(0)));
//! let addr = cell as *const _ as usize;
//!
//! let mut tx = EncounterTx::begin();
//! let v: u64 = tx.read(addr).unwrap();
//! tx.write(addr, v + 1).unwrap();
//! tx.commit().unwrap();
//!
//! assert_eq!(cell.load(std::sync::atomic::Ordering::Acquire), 1);
//! ```
#![allow(clippy::type_complexity)]

mod backoff;
pub mod error;
pub mod orec;
mod readlog;
pub mod stm;
pub mod table;
pub mod tx;
pub mod word;

pub use error::{Abort, AbortCause, Result};
pub use orec::Orec;
pub use stm::Stm;
pub use table::{orec_of, GRAIN, NUM_LOCKS};
pub use tx::{CommitTx, EncounterTx};
pub use word::TxWord;
