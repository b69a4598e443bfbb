//! ARM64 (A64) instruction set support.
//!
//! This module covers the user-space subset of the A64 ISA exercised by the
//! simulator:
//! 1. **Decoding:** `decode` maps 32-bit words to the typed [`Instruction`]
//!    model, dispatching on the top-level encoding classes of the A64
//!    instruction set.
//! 2. **Instruction model:** A sum type per instruction kind; each variant
//!    carries only its own fields.
//! 3. **Conditions and bits:** Condition-code evaluation over PSTATE and the
//!    bit utilities shared by the decoder and the execution units.

/// ABI register identifiers (link register, zero register, stack pointer).
pub mod abi;
/// Bit utilities: sign extension, rotation, logical-immediate expansion.
pub mod bits;
/// Condition codes and their evaluation over PSTATE.
pub mod cond;
/// Instruction decoder.
pub mod decode;
/// Typed instruction model.
pub mod instruction;

pub use self::cond::Cond;
pub use self::decode::decode;
pub use self::instruction::Instruction;
