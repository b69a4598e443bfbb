//! Integer Arithmetic Logic Unit.
//!
//! Pure helpers implementing the architectural semantics of the A64 integer
//! data-processing operations. Everything operates on 64-bit values with an
//! `is64` width flag; 32-bit forms compute on the low 32 bits and
//! zero-extend the destination, with flags derived at the operating width
//! (N reflects bit 31, not bit 63).
//!
//! Operations are organized into submodules by category:
//! - [`arithmetic`]: add/sub with carry and flags, multiplies, divides
//! - [`logic`]:      bitwise operations and their flag forms
//! - [`shifts`]:     immediate and variable shifts
//! - [`bitfield`]:   SBFM/BFM/UBFM and EXTR via the mask algorithm

pub mod arithmetic;
pub mod bitfield;
pub mod logic;
pub mod shifts;

pub use self::arithmetic::add_with_carry;
