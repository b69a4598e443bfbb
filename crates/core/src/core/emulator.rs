//! Functional execution engine.
//!
//! Runs the architectural semantics with no timing model: fetch four bytes
//! at the PC, decode, apply the effects from [`crate::core::exec::compute`],
//! and advance. SVC advances the PC before the syscall handler runs, so the
//! handler's notion of the return point is the next instruction. A decoded
//! `Unknown` is fatal; the instruction bound stops the run with a
//! distinguished reason and partial statistics.

use crate::config::Config;
use crate::core::arch::regs::RegFile;
use crate::core::exec::{self, MemRequest};
use crate::core::units::lsu;
use crate::error::SimError;
use crate::isa::decode::decode;
use crate::isa::instruction::Instruction;
use crate::mem::Memory;
use crate::os::{Linux, SyscallEffect};
use crate::sim::loader::LoadedImage;
use crate::sim::{RunResult, StopReason};
use crate::stats::SimStats;

/// Outcome of one functional step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Execution continues.
    Continue,
    /// The guest exited with this code.
    Exited(u8),
}

/// Functional emulator: register file, memory, and syscall state.
#[derive(Debug)]
pub struct Emulator {
    /// Architectural registers.
    pub regs: RegFile,
    /// Guest memory (accessed directly; the emulator bypasses the caches).
    pub mem: Memory,
    /// Syscall handler state.
    pub os: Linux,
    /// Instructions executed so far.
    pub retired: u64,
    max_instructions: u64,
    trace: bool,
}

impl Emulator {
    /// Creates an emulator from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            regs: RegFile::new(),
            mem: Memory::new(config.memory.latency, config.memory.max_pages),
            os: Linux::new(config.general.output),
            retired: 0,
            max_instructions: config.general.max_instructions,
            trace: config.general.trace,
        }
    }

    /// Places an image into memory and initializes PC, SP, and the break.
    pub fn load(&mut self, image: &LoadedImage) -> Result<(), SimError> {
        for (addr, data) in &image.segments {
            self.mem.load_segment(*addr, data)?;
        }
        self.regs.pc = image.entry;
        self.regs.sp = image.initial_sp;
        self.os.set_brk(image.end());
        Ok(())
    }

    /// Executes one instruction.
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        let pc = self.regs.pc;
        let word = self.mem.read_u32(pc);
        let inst = decode(word);

        if self.trace {
            eprintln!("EM  pc={pc:#x} inst={word:#010x}");
        }

        match inst {
            Instruction::Unknown { word } => {
                return Err(SimError::UnknownInstruction { pc, word });
            }
            Instruction::Svc { .. } => {
                // The PC advances before the handler runs.
                self.regs.pc = pc.wrapping_add(4);
                self.retired += 1;
                return match self.os.handle(&mut self.regs, &mut self.mem)? {
                    SyscallEffect::Exit(code) => Ok(StepOutcome::Exited(code)),
                    SyscallEffect::Continue => Ok(StepOutcome::Continue),
                };
            }
            _ => {}
        }

        let computed = {
            let regs = &self.regs;
            exec::compute(
                &inst,
                pc,
                regs.pstate,
                &mut |r| regs.read(r),
                &mut |r| regs.read_v(r),
            )
        };

        for (reg, value) in &computed.writes {
            self.regs.write(*reg, *value);
        }
        for (reg, value) in &computed.vwrites {
            self.regs.write_v(*reg, *value);
        }
        if let Some(flags) = computed.nzcv {
            self.regs.pstate = flags;
        }

        if let Some(request) = computed.mem {
            self.apply_mem(request)?;
        }

        self.regs.pc = match computed.branch {
            Some(outcome) if outcome.taken => outcome.target,
            _ => pc.wrapping_add(4),
        };

        self.retired += 1;
        Ok(StepOutcome::Continue)
    }

    /// Performs a memory request directly against guest memory.
    fn apply_mem(&mut self, request: MemRequest) -> Result<(), SimError> {
        match request {
            MemRequest::Load {
                addr,
                size,
                signed,
                dest64,
                rt,
                rt2,
            } => {
                let raw = self.mem.read_int(addr, size as usize);
                self.regs
                    .write(rt, lsu::extend_loaded(raw, size, signed, dest64));
                if let Some(rt2) = rt2 {
                    let raw2 = self.mem.read_int(addr + u64::from(size), size as usize);
                    self.regs.write(rt2, raw2);
                }
            }
            MemRequest::Store {
                addr,
                size,
                data,
                data2,
            } => {
                self.mem.write_int(addr, size as usize, data)?;
                if let Some(data2) = data2 {
                    self.mem.write_int(addr + u64::from(size), size as usize, data2)?;
                }
            }
            MemRequest::VLoad { addr, size, rt } => {
                let value = if size == 16 {
                    self.mem.read_u128(addr)
                } else {
                    u128::from(self.mem.read_int(addr, size as usize))
                };
                self.regs.write_v(rt, value);
            }
            MemRequest::VStore { addr, size, data } => {
                if size == 16 {
                    self.mem.write_u128(addr, data)?;
                } else {
                    self.mem.write_int(addr, size as usize, data as u64)?;
                }
            }
        }
        Ok(())
    }

    /// Runs until exit or the instruction bound.
    pub fn run(&mut self) -> Result<RunResult, SimError> {
        loop {
            if self.retired >= self.max_instructions {
                return Ok(RunResult {
                    reason: StopReason::InstructionLimit,
                    stats: self.stats(),
                });
            }
            match self.step()? {
                StepOutcome::Continue => {}
                StepOutcome::Exited(code) => {
                    return Ok(RunResult {
                        reason: StopReason::Exited(code),
                        stats: self.stats(),
                    });
                }
            }
        }
    }

    /// Statistics block (instruction count only; no timing).
    fn stats(&self) -> SimStats {
        SimStats {
            instructions_retired: self.retired,
            ..SimStats::default()
        }
    }

    /// Output captured by the syscall layer (capture sink only).
    pub fn captured_output(&self) -> &[u8] {
        self.os.captured()
    }
}
