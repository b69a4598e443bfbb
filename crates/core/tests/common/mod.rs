//! Shared test infrastructure: instruction builder, program images, engine
//! constructors, and the end-to-end scenario programs used across the
//! suite.

/// Test-side instruction builder.
pub mod asm;

use m2sim_core::config::{Config, OutputSink};
use m2sim_core::sim::loader::LoadedImage;
use m2sim_core::{Emulator, Pipeline};

use self::asm::cond;

/// Load address for hand-assembled test programs.
pub const CODE_BASE: u64 = 0x1_0000;

/// Wraps a word sequence as a loadable image at [`CODE_BASE`].
pub fn image(words: &[u32]) -> LoadedImage {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    LoadedImage {
        entry: CODE_BASE,
        segments: vec![(CODE_BASE, bytes)],
        initial_sp: 0x7FFF_FFF0_0000,
    }
}

/// Baseline test configuration: capture guest output, default M2 hardware.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.output = OutputSink::Capture;
    config
}

/// Builds a functional emulator with `words` loaded at [`CODE_BASE`].
pub fn emulator(words: &[u32]) -> Emulator {
    emulator_with(words, &test_config())
}

/// Builds a functional emulator with an explicit configuration.
pub fn emulator_with(words: &[u32], config: &Config) -> Emulator {
    let mut emu = Emulator::new(config);
    emu.load(&image(words)).expect("load image");
    emu
}

/// Builds a pipeline of the given width with `words` loaded.
pub fn pipeline(words: &[u32], width: usize) -> Pipeline {
    let mut config = test_config();
    config.pipeline.width = width;
    pipeline_with(words, &config)
}

/// Builds a pipeline with an explicit configuration.
pub fn pipeline_with(words: &[u32], config: &Config) -> Pipeline {
    let mut pipe = Pipeline::new(config);
    pipe.load(&image(words)).expect("load image");
    pipe
}

// ── End-to-end scenario programs ──────────────────────────
//
// Each returns the instruction words; callers preload any data the
// scenario needs and check the documented exit code.

/// Exit with code 42 after three instructions.
pub fn prog_simple_exit() -> Vec<u32> {
    vec![
        asm::movz(true, 0, 42, 0),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ]
}

/// ADD X0, X0, X1 with X0=10, X1=5 preset; exits with 15.
pub fn prog_arithmetic() -> Vec<u32> {
    vec![
        asm::add_reg(true, 0, 0, 1),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ]
}

/// Accumulate 0+1+2+3+4+5 via a CMP+B.LT loop; exits with 15.
pub fn prog_loop_sum() -> Vec<u32> {
    vec![
        asm::movz(true, 0, 0, 0),
        asm::movz(true, 1, 0, 0),
        // loop:
        asm::add_reg(true, 0, 0, 1),
        asm::add_imm(true, 1, 1, 1),
        asm::cmp_imm(true, 1, 6),
        asm::b_cond(cond::LT, -3),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ]
}

/// Address of the "Hello\n" buffer for [`prog_hello`].
pub const HELLO_ADDR: u64 = 0x2000;

/// write(1, 0x2000, 6) then exit(0). Preload "Hello\n" at [`HELLO_ADDR`].
pub fn prog_hello() -> Vec<u32> {
    vec![
        asm::movz(true, 0, 1, 0),
        asm::movz(true, 1, HELLO_ADDR as u32, 0),
        asm::movz(true, 2, 6, 0),
        asm::movz(true, 8, 64, 0),
        asm::svc(0),
        asm::movz(true, 0, 0, 0),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ]
}

/// Base addresses of the matrix scenario arrays.
pub const MATRIX_A: u64 = 0x8000;
pub const MATRIX_B: u64 = 0x8100;
pub const MATRIX_C: u64 = 0x8200;

/// Element values of array A.
pub const MATRIX_A_VALUES: [u64; 4] = [10, 20, 30, 40];
/// Element values of array B.
pub const MATRIX_B_VALUES: [u64; 4] = [1, 2, 3, 4];

/// C[i] = A[i] + B[i] over four 64-bit elements; exits with sum(C) = 110.
pub fn prog_matrix_ops() -> Vec<u32> {
    let mut words = vec![
        asm::movz(true, 1, MATRIX_A as u32, 0),
        asm::movz(true, 2, MATRIX_B as u32, 0),
        asm::movz(true, 3, MATRIX_C as u32, 0),
        asm::movz(true, 0, 0, 0),
    ];
    for i in 0..4u32 {
        words.push(asm::ldr_imm(4, 1, i * 8));
        words.push(asm::ldr_imm(5, 2, i * 8));
        words.push(asm::add_reg(true, 4, 4, 5));
        words.push(asm::str_imm(4, 3, i * 8));
        words.push(asm::add_reg(true, 0, 0, 4));
    }
    words.push(asm::movz(true, 8, 93, 0));
    words.push(asm::svc(0));
    words
}

/// Count X0 down from 4 through a hot CMP+B.NE loop; exits with 0.
pub fn prog_hot_branch() -> Vec<u32> {
    vec![
        asm::movz(true, 0, 4, 0),
        // loop:
        asm::sub_imm(true, 0, 0, 1),
        asm::cmp_imm(true, 0, 0),
        asm::b_cond(cond::NE, -2),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ]
}

/// Preloads the matrix arrays into a memory-like writer.
pub fn preload_matrix(write_u64: &mut dyn FnMut(u64, u64)) {
    for (i, v) in MATRIX_A_VALUES.iter().enumerate() {
        write_u64(MATRIX_A + (i as u64) * 8, *v);
    }
    for (i, v) in MATRIX_B_VALUES.iter().enumerate() {
        write_u64(MATRIX_B + (i as u64) * 8, *v);
    }
}
