//! # Orec table
//!
//! A fixed-size, process-wide array of [`Orec`]s. Memory addresses are
//! mapped onto orecs by `(addr >> GRAIN) % NUM_LOCKS`; collisions are
//! permitted and safe, but cause spurious conflicts between transactions
//! touching unrelated stripes that happen to hash together.
use lazy_static::lazy_static;

use crate::orec::Orec;

/// Number of orecs in the global table.
pub const NUM_LOCKS: usize = 2048;

/// `addr >> GRAIN` gives the stripe index before reducing modulo
/// `NUM_LOCKS`; a grain of 3 covers 8-byte stripes.
pub const GRAIN: u32 = 3;

pub(crate) struct OrecTable {
    orecs: Vec<Orec>,
}

impl OrecTable {
    fn new() -> Self {
        let mut orecs = Vec::with_capacity(NUM_LOCKS);
        orecs.resize_with(NUM_LOCKS, Orec::new);
        Self { orecs }
    }

    fn slot(&self, addr: usize) -> &Orec {
        &self.orecs[(addr >> GRAIN) % NUM_LOCKS]
    }
}

lazy_static! {
    static ref TABLE: OrecTable = OrecTable::new();
}

/// Returns the `'static` orec covering `addr`'s stripe.
pub fn orec_of(addr: usize) -> &'static Orec {
    TABLE.slot(addr)
}
