//! Binary loader.
//!
//! Produces a [`LoadedImage`] from an ARM64 ELF (via the `object` crate) or
//! from a flat binary at a fixed load address. The image carries the entry
//! PC, the loadable segments, and the initial stack pointer; the engines
//! copy the segments into guest memory and derive the initial program break
//! from the image end.

use object::{Object, ObjectSegment};

use crate::error::SimError;

/// Default top-of-stack for loaded programs.
pub const STACK_TOP: u64 = 0x7FFF_FFF0_0000;

/// A program image ready to be placed into guest memory.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    /// Entry program counter.
    pub entry: u64,
    /// Loadable segments as (virtual address, bytes).
    pub segments: Vec<(u64, Vec<u8>)>,
    /// Initial stack pointer.
    pub initial_sp: u64,
}

impl LoadedImage {
    /// One-past-the-end address of the highest loaded segment.
    pub fn end(&self) -> u64 {
        self.segments
            .iter()
            .map(|(addr, data)| addr + data.len() as u64)
            .max()
            .unwrap_or(0)
    }
}

/// Loads an ARM64 ELF from a byte buffer.
pub fn load_elf_bytes(data: &[u8]) -> Result<LoadedImage, SimError> {
    let file = object::File::parse(data).map_err(|e| SimError::Load(e.to_string()))?;

    if file.architecture() != object::Architecture::Aarch64 {
        return Err(SimError::Load(format!(
            "unsupported architecture {:?} (expected Aarch64)",
            file.architecture()
        )));
    }

    let mut segments = Vec::new();
    for segment in file.segments() {
        let bytes = segment
            .data()
            .map_err(|e| SimError::Load(e.to_string()))?;
        if !bytes.is_empty() {
            segments.push((segment.address(), bytes.to_vec()));
        }
    }
    if segments.is_empty() {
        return Err(SimError::Load("no loadable segments".into()));
    }

    Ok(LoadedImage {
        entry: file.entry(),
        segments,
        initial_sp: STACK_TOP,
    })
}

/// Loads an ARM64 ELF from disk.
pub fn load_elf(path: &str) -> Result<LoadedImage, SimError> {
    let data = std::fs::read(path).map_err(|e| SimError::Load(format!("{path}: {e}")))?;
    load_elf_bytes(&data)
}

/// Wraps a flat binary as an image loaded at `base` with entry `base`.
pub fn load_flat(base: u64, data: Vec<u8>) -> LoadedImage {
    LoadedImage {
        entry: base,
        segments: vec![(base, data)],
        initial_sp: STACK_TOP,
    }
}
