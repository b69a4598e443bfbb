//! Branch Target Buffer (BTB).
//!
//! A direct-mapped table mapping a branch PC to its predicted target,
//! together with a 2-bit confidence counter. The confidence gates
//! zero-cycle branch folding at fetch: only entries that have proven
//! themselves repeatedly are trusted enough to fold.

/// An entry in the Branch Target Buffer.
#[derive(Clone, Copy, Debug, Default)]
struct BtbEntry {
    /// Full PC used to verify the entry.
    tag: u64,
    /// Predicted target address.
    target: u64,
    /// Saturating 0..=3 confidence counter.
    confidence: u8,
    /// Entry holds valid data.
    valid: bool,
}

/// Branch Target Buffer.
#[derive(Debug)]
pub struct Btb {
    table: Vec<BtbEntry>,
    size: usize,
}

impl Btb {
    /// Creates a BTB with `size` entries (power of two).
    pub fn new(size: usize) -> Self {
        let size = size.max(1).next_power_of_two();
        Self {
            table: vec![BtbEntry::default(); size],
            size,
        }
    }

    fn index(&self, pc: u64) -> usize {
        ((pc >> 2) as usize) & (self.size - 1)
    }

    /// Looks up the predicted target and confidence for `pc`.
    pub fn lookup(&self, pc: u64) -> Option<(u64, u8)> {
        let e = self.table[self.index(pc)];
        if e.valid && e.tag == pc {
            Some((e.target, e.confidence))
        } else {
            None
        }
    }

    /// Installs or trains the entry for `pc`.
    ///
    /// A matching target saturates the confidence upward; a new or
    /// conflicting target (re)installs the entry at confidence 1.
    pub fn update(&mut self, pc: u64, target: u64) {
        let idx = self.index(pc);
        let e = &mut self.table[idx];
        if e.valid && e.tag == pc && e.target == target {
            if e.confidence < 3 {
                e.confidence += 1;
            }
        } else {
            *e = BtbEntry {
                tag: pc,
                target,
                confidence: 1,
                valid: true,
            };
        }
    }

    /// Weakens the entry for `pc` after a misprediction.
    pub fn punish(&mut self, pc: u64) {
        let idx = self.index(pc);
        let e = &mut self.table[idx];
        if e.valid && e.tag == pc && e.confidence > 0 {
            e.confidence -= 1;
        }
    }
}
