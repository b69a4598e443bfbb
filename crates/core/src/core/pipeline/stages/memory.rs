//! Memory (MEM) stage.
//!
//! Performs at most one memory operation per cycle (decode enforces the
//! budget) against the data cache when enabled, otherwise flat memory.
//! Loads append their destination writes to the slot before it moves to
//! MEM/WB; stores update the cache (write-back, write-allocate). A
//! multi-cycle access freezes the pipeline for the remaining latency.

use crate::core::exec::MemRequest;
use crate::core::pipeline::latches::MemWbSlot;
use crate::core::pipeline::Pipeline;
use crate::core::units::lsu;
use crate::error::SimError;

/// Executes the memory stage.
pub fn memory_stage(p: &mut Pipeline) {
    let slots = std::mem::take(&mut p.ex_mem);
    let mut out: Vec<MemWbSlot> = Vec::with_capacity(slots.len());

    for mut slot in slots {
        let mut writes = std::mem::take(&mut slot.writes);
        let mut vwrites = std::mem::take(&mut slot.vwrites);

        if let Some(request) = slot.mem.take() {
            if p.trace {
                eprintln!(
                    "MEM pc={:#x} {} {}B addr={:#x}",
                    slot.pc,
                    if request.is_load() { "load" } else { "store" },
                    request.bytes(),
                    request.addr()
                );
            }
            match perform(p, request, &mut writes, &mut vwrites) {
                Ok(latency) => {
                    if latency > 1 {
                        p.mem_stall += latency - 1;
                    }
                }
                Err(e) => {
                    p.fatal = Some(e);
                }
            }
        }

        out.push(MemWbSlot {
            seq: slot.seq,
            pc: slot.pc,
            inst: slot.inst,
            writes,
            vwrites,
            exit: slot.exit,
        });
    }

    p.mem_wb = out;
}

/// Performs one memory request; returns the access latency.
fn perform(
    p: &mut Pipeline,
    request: MemRequest,
    writes: &mut Vec<(u8, u64)>,
    vwrites: &mut Vec<(u8, u128)>,
) -> Result<u64, SimError> {
    match request {
        MemRequest::Load {
            addr,
            size,
            signed,
            dest64,
            rt,
            rt2,
        } => {
            let (raw, mut latency) = p.data_read(addr, size as usize)?;
            writes.push((rt, lsu::extend_loaded(raw, size, signed, dest64)));
            if let Some(rt2) = rt2 {
                let (raw2, lat2) = p.data_read(addr + u64::from(size), size as usize)?;
                writes.push((rt2, raw2));
                latency = latency.max(lat2);
            }
            Ok(latency)
        }
        MemRequest::Store {
            addr,
            size,
            data,
            data2,
        } => {
            let mut latency = p.data_write(addr, size as usize, data)?;
            if let Some(data2) = data2 {
                let lat2 = p.data_write(addr + u64::from(size), size as usize, data2)?;
                latency = latency.max(lat2);
            }
            Ok(latency)
        }
        MemRequest::VLoad { addr, size, rt } => {
            if size == 16 {
                let (lo, lat1) = p.data_read(addr, 8)?;
                let (hi, lat2) = p.data_read(addr + 8, 8)?;
                vwrites.push((rt, u128::from(lo) | (u128::from(hi) << 64)));
                Ok(lat1.max(lat2))
            } else {
                let (raw, latency) = p.data_read(addr, size as usize)?;
                vwrites.push((rt, u128::from(raw)));
                Ok(latency)
            }
        }
        MemRequest::VStore { addr, size, data } => {
            if size == 16 {
                let lat1 = p.data_write(addr, 8, data as u64)?;
                let lat2 = p.data_write(addr + 8, 8, (data >> 64) as u64)?;
                Ok(lat1.max(lat2))
            } else {
                p.data_write(addr, size as usize, data as u64)
            }
        }
    }
}
