//! Syscall surface tests.
//!
//! Driven through the functional emulator so the full SVC path (PC
//! advance, X8 dispatch, X0 result) is exercised.

use std::io::Write;

use m2sim_core::sim::StopReason;

use crate::common::{self, asm};

// ══════════════════════════════════════════════════════════
// 1. write / exit
// ══════════════════════════════════════════════════════════

#[test]
fn write_to_stdout_reaches_sink() {
    let words = common::prog_hello();
    let mut emu = common::emulator(&words);
    emu.mem.write_bytes(common::HELLO_ADDR, b"Hello\n").unwrap();

    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(0));
    assert_eq!(emu.captured_output(), b"Hello\n");
}

#[test]
fn exit_truncates_to_low_byte() {
    // exit(0x1FF) must report 0xFF.
    let words = vec![
        asm::movz(true, 0, 0x1FF, 0),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(0xFF));
}

// ══════════════════════════════════════════════════════════
// 2. Unknown syscalls and bad descriptors
// ══════════════════════════════════════════════════════════

/// An unsupported syscall number returns -ENOSYS in X0 and execution
/// continues.
#[test]
fn unknown_syscall_returns_enosys() {
    let words = vec![
        asm::movz(true, 8, 999, 0),
        asm::svc(0),
        asm::mov_reg(true, 0, 0), // keep X0
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    // exit code is the low byte of -38.
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited((-38i64 as u64) as u8));
}

/// close on a closed fd returns -EBADF; fds 0/1/2 are closable.
#[test]
fn double_close_returns_ebadf() {
    let words = vec![
        // close(1)
        asm::movz(true, 0, 1, 0),
        asm::movz(true, 8, 57, 0),
        asm::svc(0),
        // close(1) again -> -EBADF
        asm::movz(true, 0, 1, 0),
        asm::movz(true, 8, 57, 0),
        asm::svc(0),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited((-9i64 as u64) as u8));
}

// ══════════════════════════════════════════════════════════
// 3. openat / read / close against a host file
// ══════════════════════════════════════════════════════════

/// openat with AT_FDCWD opens a host file at the lowest free fd (3), read
/// fills guest memory, close releases it.
#[test]
fn openat_read_close_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"abcd").unwrap();
    file.flush().unwrap();
    let path = file.path().to_str().unwrap().to_owned();

    const PATH_ADDR: u32 = 0x3000;
    const BUF_ADDR: u32 = 0x4000;

    let words = vec![
        // openat(AT_FDCWD, path, O_RDONLY, 0)
        asm::movn(true, 0, 99, 0), // -100
        asm::movz(true, 1, PATH_ADDR, 0),
        asm::movz(true, 2, 0, 0),
        asm::movz(true, 3, 0, 0),
        asm::movz(true, 8, 56, 0),
        asm::svc(0),
        // fd now in X0; keep it in X9.
        asm::mov_reg(true, 9, 0),
        // read(fd, BUF, 4)
        asm::movz(true, 1, BUF_ADDR, 0),
        asm::movz(true, 2, 4, 0),
        asm::movz(true, 8, 63, 0),
        asm::svc(0),
        // close(fd)
        asm::mov_reg(true, 0, 9),
        asm::movz(true, 8, 57, 0),
        asm::svc(0),
        // exit(first byte of the buffer)
        asm::movz(true, 1, BUF_ADDR, 0),
        asm::ldrb_imm(0, 1, 0),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];

    let mut emu = common::emulator(&words);
    emu.mem
        .write_bytes(u64::from(PATH_ADDR), path.as_bytes())
        .unwrap();
    emu.mem
        .write_u8(u64::from(PATH_ADDR) + path.len() as u64, 0)
        .unwrap();

    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(b'a'));
    assert_eq!(emu.mem.read_u32(u64::from(BUF_ADDR)), u32::from_le_bytes(*b"abcd"));
}

// ══════════════════════════════════════════════════════════
// 4. brk / mmap
// ══════════════════════════════════════════════════════════

/// brk(0) returns the current break; growing it returns the new break;
/// shrinking requests return the current break unchanged.
#[test]
fn brk_semantics() {
    let words = vec![
        // brk(0) -> current, keep in X9
        asm::movz(true, 0, 0, 0),
        asm::movz(true, 8, 214, 0),
        asm::svc(0),
        asm::mov_reg(true, 9, 0),
        // brk(current + 0x1000) -> new break
        asm::add_imm(true, 0, 9, 0x100),
        asm::movz(true, 8, 214, 0),
        asm::svc(0),
        // X0 - X9 should be 0x100
        asm::sub_reg(true, 0, 0, 9),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited((0x100 & 0xFF) as u8));
}

/// Anonymous mmap returns page-aligned, monotonically increasing regions.
#[test]
fn mmap_anonymous_allocates() {
    let words = vec![
        // mmap(0, 0x2000, 3, MAP_ANONYMOUS|MAP_PRIVATE, -1, 0)
        asm::movz(true, 0, 0, 0),
        asm::movz(true, 1, 0x2000, 0),
        asm::movz(true, 2, 3, 0),
        asm::movz(true, 3, 0x22, 0),
        asm::movn(true, 4, 0, 0), // -1
        asm::movz(true, 5, 0, 0),
        asm::movz(true, 8, 222, 0),
        asm::svc(0),
        // store something there to prove the region is usable
        asm::movz(true, 1, 7, 0),
        asm::str_imm(1, 0, 0),
        asm::ldr_imm(0, 0, 0),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(7));
}
