//! Fatal simulation errors.
//!
//! Errno-class failures never appear here: they are returned to the guest in
//! X0 as `-errno` and stay inside the guest ABI. This type covers the
//! conditions that abort a run and escape to the harness.

use thiserror::Error;

/// Fatal error raised by the emulator, the pipeline, or the loader.
#[derive(Debug, Error)]
pub enum SimError {
    /// An instruction word did not resolve to any known encoding.
    ///
    /// Raised when `decode` yields `Unknown`; the run terminates with the
    /// offending PC and the raw word.
    #[error("unknown instruction {word:#010x} at pc={pc:#x}")]
    UnknownInstruction {
        /// Program counter of the undecodable word.
        pc: u64,
        /// Raw 32-bit instruction word.
        word: u32,
    },

    /// The guest image could not be loaded.
    #[error("load error: {0}")]
    Load(String),

    /// The sparse memory page budget was exhausted.
    ///
    /// Only raised when a page ceiling is configured; carries the first
    /// faulting address.
    #[error("memory page budget exhausted at address {addr:#x}")]
    MemoryBudget {
        /// Address whose page could not be allocated.
        addr: u64,
    },
}
