//! Execution units.
//!
//! Pure architectural operations shared by the functional engine and the
//! pipeline's execute stage, plus the stateful prediction and cache units.

/// Integer ALU (arithmetic, logic, shifts, bitfield).
pub mod alu;
/// Branch prediction unit (predictor, BTB, RSB).
pub mod bru;
/// Set-associative write-back cache model.
pub mod cache;
/// Load/store address generation and extension helpers.
pub mod lsu;
/// Lane-wise vector operations.
pub mod simd;
