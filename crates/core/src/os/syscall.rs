//! Syscall dispatch and file-descriptor table.
//!
//! Implements the supported Linux ARM64 syscalls over host resources:
//!
//! | # | name | notes |
//! |---|------|-------|
//! | 56 | openat | dirfd must be AT_FDCWD; Linux→host flag translation |
//! | 57 | close  | EBADF if already closed; fds 0/1/2 are closable |
//! | 63 | read   | host file → guest memory |
//! | 64 | write  | guest memory → sink (fds 1/2) or host file |
//! | 93 | exit   | low 8 bits of X0 become the exit code |
//! | 94 | exit_group | alias of exit |
//! | 214 | brk   | program break; 0 or below current returns current |
//! | 222 | mmap  | anonymous only; monotonic region allocator |
//!
//! Anything else returns `-ENOSYS`. Errors never escape to the host: they
//! are returned to the guest as `-errno` in X0.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};

use crate::config::OutputSink;
use crate::core::arch::regs::RegFile;
use crate::error::SimError;
use crate::isa::abi::REG_SYSNO;
use crate::mem::Memory;
use crate::os::errno::{
    AT_FDCWD, EACCES, EBADF, EINVAL, ENOENT, ENOSYS, MAP_ANONYMOUS, O_APPEND, O_CREAT, O_RDWR,
    O_TRUNC, O_WRONLY,
};

/// Syscall numbers (Linux ARM64).
mod nr {
    pub const OPENAT: u64 = 56;
    pub const CLOSE: u64 = 57;
    pub const READ: u64 = 63;
    pub const WRITE: u64 = 64;
    pub const EXIT: u64 = 93;
    pub const EXIT_GROUP: u64 = 94;
    pub const BRK: u64 = 214;
    pub const MMAP: u64 = 222;
}

/// Base of the monotonic anonymous-mmap region.
const MMAP_BASE: u64 = 0x5500_0000_0000;

/// Guest page size used for brk/mmap rounding.
const PAGE: u64 = 4096;

/// One open file descriptor.
#[derive(Debug)]
enum FdEntry {
    /// Guest stdin; reads return end-of-file.
    Stdin,
    /// Guest stdout, routed to the configured sink.
    Stdout,
    /// Guest stderr, routed to the configured sink.
    Stderr,
    /// Host-backed file.
    Host(File),
}

/// Effect of a completed syscall on the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyscallEffect {
    /// Execution continues at the next instruction.
    Continue,
    /// The guest requested termination with this exit code.
    Exit(u8),
}

/// Syscall handler state: fd table, program break, mmap cursor, output sink.
#[derive(Debug)]
pub struct Linux {
    files: Vec<Option<FdEntry>>,
    brk: u64,
    mmap_next: u64,
    sink: OutputSink,
    captured: Vec<u8>,
}

impl Linux {
    /// Creates a handler with fds 0/1/2 open from birth.
    pub fn new(sink: OutputSink) -> Self {
        Self {
            files: vec![
                Some(FdEntry::Stdin),
                Some(FdEntry::Stdout),
                Some(FdEntry::Stderr),
            ],
            brk: 0,
            mmap_next: MMAP_BASE,
            sink,
            captured: Vec::new(),
        }
    }

    /// Sets the initial program break (end of the loaded image).
    pub fn set_brk(&mut self, brk: u64) {
        self.brk = (brk + PAGE - 1) & !(PAGE - 1);
    }

    /// Output captured so far (only meaningful with `OutputSink::Capture`).
    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    /// Dispatches the syscall selected by X8, mutating X0 with the result.
    ///
    /// The caller has already advanced the PC past the SVC instruction.
    pub fn handle(&mut self, regs: &mut RegFile, mem: &mut Memory) -> Result<SyscallEffect, SimError> {
        let number = regs.read(REG_SYSNO);
        let args = [
            regs.read(0),
            regs.read(1),
            regs.read(2),
            regs.read(3),
            regs.read(4),
            regs.read(5),
        ];

        let result = match number {
            nr::EXIT | nr::EXIT_GROUP => {
                return Ok(SyscallEffect::Exit(args[0] as u8));
            }
            nr::OPENAT => self.sys_openat(mem, args),
            nr::CLOSE => self.sys_close(args),
            nr::READ => self.sys_read(mem, args)?,
            nr::WRITE => self.sys_write(mem, args),
            nr::BRK => self.sys_brk(args),
            nr::MMAP => self.sys_mmap(args),
            _ => -ENOSYS,
        };

        regs.write(0, result as u64);
        Ok(SyscallEffect::Continue)
    }

    /// Lowest free fd at or above 3.
    fn alloc_fd(&mut self) -> usize {
        for (fd, slot) in self.files.iter().enumerate().skip(3) {
            if slot.is_none() {
                return fd;
            }
        }
        self.files.push(None);
        self.files.len() - 1
    }

    fn sys_openat(&mut self, mem: &Memory, args: [u64; 6]) -> i64 {
        if args[0] as i64 != AT_FDCWD {
            return -EINVAL;
        }
        let Some(path) = read_cstring(mem, args[1]) else {
            return -EINVAL;
        };
        let flags = args[2];

        let mut options = OpenOptions::new();
        if flags & O_RDWR != 0 {
            let _ = options.read(true).write(true);
        } else if flags & O_WRONLY != 0 {
            let _ = options.write(true);
        } else {
            let _ = options.read(true);
        }
        if flags & O_CREAT != 0 {
            let _ = options.create(true);
        }
        if flags & O_TRUNC != 0 {
            let _ = options.truncate(true);
        }
        if flags & O_APPEND != 0 {
            let _ = options.append(true);
        }

        match options.open(&path) {
            Ok(file) => {
                let fd = self.alloc_fd();
                self.files[fd] = Some(FdEntry::Host(file));
                fd as i64
            }
            Err(e) => match e.kind() {
                std::io::ErrorKind::NotFound => -ENOENT,
                std::io::ErrorKind::PermissionDenied => -EACCES,
                _ => -crate::os::errno::EIO,
            },
        }
    }

    fn sys_close(&mut self, args: [u64; 6]) -> i64 {
        let fd = args[0] as usize;
        if fd < self.files.len() && self.files[fd].is_some() {
            self.files[fd] = None;
            0
        } else {
            -EBADF
        }
    }

    fn sys_read(&mut self, mem: &mut Memory, args: [u64; 6]) -> Result<i64, SimError> {
        let fd = args[0] as usize;
        let len = args[2] as usize;
        match self.files.get_mut(fd) {
            Some(Some(FdEntry::Host(file))) => {
                let mut buf = vec![0u8; len];
                match file.read(&mut buf) {
                    Ok(n) => {
                        mem.write_bytes(args[1], &buf[..n])?;
                        Ok(n as i64)
                    }
                    Err(_) => Ok(-crate::os::errno::EIO),
                }
            }
            // Stdin reads return end-of-file in this model.
            Some(Some(FdEntry::Stdin)) => Ok(0),
            Some(Some(_)) => Ok(-EBADF),
            _ => Ok(-EBADF),
        }
    }

    fn sys_write(&mut self, mem: &Memory, args: [u64; 6]) -> i64 {
        let fd = args[0] as usize;
        let len = args[2] as usize;
        let mut buf = vec![0u8; len];
        mem.read_bytes(args[1], &mut buf);

        match self.files.get_mut(fd) {
            Some(Some(FdEntry::Stdout | FdEntry::Stderr)) => {
                match self.sink {
                    OutputSink::Stdout => {
                        let _ = std::io::stdout().write_all(&buf);
                        let _ = std::io::stdout().flush();
                    }
                    OutputSink::Stderr => {
                        let _ = std::io::stderr().write_all(&buf);
                    }
                    OutputSink::Capture => self.captured.extend_from_slice(&buf),
                }
                len as i64
            }
            Some(Some(FdEntry::Host(file))) => match file.write_all(&buf) {
                Ok(()) => len as i64,
                Err(_) => -crate::os::errno::EIO,
            },
            Some(Some(FdEntry::Stdin)) => -EBADF,
            _ => -EBADF,
        }
    }

    fn sys_brk(&mut self, args: [u64; 6]) -> i64 {
        let request = args[0];
        if request != 0 && request >= self.brk {
            self.brk = request;
        }
        self.brk as i64
    }

    fn sys_mmap(&mut self, args: [u64; 6]) -> i64 {
        let len = args[1];
        let flags = args[3];
        if len == 0 {
            return -EINVAL;
        }
        if flags & MAP_ANONYMOUS == 0 {
            // File-backed mappings are outside the supported surface.
            return -ENOSYS;
        }
        let len = (len + PAGE - 1) & !(PAGE - 1);
        let addr = self.mmap_next;
        self.mmap_next += len;
        addr as i64
    }
}

/// Reads a NUL-terminated guest string; `None` on unreasonable length.
fn read_cstring(mem: &Memory, addr: u64) -> Option<String> {
    const MAX: u64 = 4096;
    let mut bytes = Vec::new();
    for i in 0..MAX {
        let b = mem.read_u8(addr + i);
        if b == 0 {
            return String::from_utf8(bytes).ok();
        }
        bytes.push(b);
    }
    None
}
