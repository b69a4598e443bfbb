//! Branch prediction unit.
//!
//! A tournament predictor in the style of the classic local/global hybrid:
//! 1. **Local BHT:** 2-bit saturating counters indexed by PC.
//! 2. **Gshare BHT:** 2-bit counters indexed by PC XOR global history.
//! 3. **Chooser:** per-index 2-bit counters selecting local vs gshare.
//! 4. **BTB:** direct-mapped target table with a confidence counter.
//! 5. **RSB:** bounded return-address stack for BL/RET.
//!
//! Cold branches (no prior encounter) predict not-taken, matching observed
//! M2 behaviour.

/// Branch target buffer.
pub mod btb;
/// Return stack buffer.
pub mod rsb;

use self::btb::Btb;
use self::rsb::Rsb;
use crate::config::PredictorConfig;

/// Result of a direction+target prediction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prediction {
    /// Predicted direction.
    pub taken: bool,
    /// Predicted target, when the BTB knows one.
    pub target: Option<u64>,
    /// BTB confidence (0 when the BTB has no entry).
    pub confidence: u8,
}

/// Tournament branch predictor with BTB and RSB.
#[derive(Debug)]
pub struct BranchPredictor {
    local: Vec<u8>,
    gshare: Vec<u8>,
    chooser: Vec<u8>,
    table_mask: usize,
    history: u64,
    history_mask: u64,
    tournament: bool,
    btb: Btb,
    rsb: Rsb,
}

impl BranchPredictor {
    /// Creates a predictor from configuration.
    pub fn new(config: &PredictorConfig) -> Self {
        let table_size = 1usize << config.bht_bits;
        Self {
            // Counters start at 1 (weakly not-taken): cold predictions are
            // not-taken, and two taken outcomes flip the direction.
            local: vec![1; table_size],
            gshare: vec![1; table_size],
            chooser: vec![1; table_size],
            table_mask: table_size - 1,
            history: 0,
            history_mask: (1u64 << config.history_bits.min(63)) - 1,
            tournament: config.tournament,
            btb: Btb::new(config.btb_size),
            rsb: Rsb::new(config.rsb_size),
        }
    }

    fn local_index(&self, pc: u64) -> usize {
        ((pc >> 2) as usize) & self.table_mask
    }

    fn gshare_index(&self, pc: u64) -> usize {
        (((pc >> 2) ^ self.history) as usize) & self.table_mask
    }

    /// Predicts the direction and target of a conditional branch at `pc`.
    pub fn predict(&self, pc: u64) -> Prediction {
        let local_taken = self.local[self.local_index(pc)] >= 2;
        let taken = if self.tournament {
            let g_idx = self.gshare_index(pc);
            if self.chooser[g_idx] >= 2 {
                self.gshare[g_idx] >= 2
            } else {
                local_taken
            }
        } else {
            local_taken
        };

        if !taken {
            return Prediction::default();
        }
        match self.btb.lookup(pc) {
            Some((target, confidence)) => Prediction {
                taken: true,
                target: Some(target),
                confidence,
            },
            None => Prediction {
                taken: true,
                target: None,
                confidence: 0,
            },
        }
    }

    /// Predicts the target of an unconditional branch or indirect jump.
    pub fn predict_target(&self, pc: u64) -> Option<(u64, u8)> {
        self.btb.lookup(pc)
    }

    /// Trains the predictor with a resolved branch outcome.
    ///
    /// Both direction tables saturate toward the outcome, the chooser moves
    /// toward whichever component was right, the outcome shifts into the
    /// global history, and the BTB entry is installed or reinforced.
    pub fn update(&mut self, pc: u64, taken: bool, target: Option<u64>) {
        let l_idx = self.local_index(pc);
        let g_idx = self.gshare_index(pc);

        if self.tournament {
            let local_correct = (self.local[l_idx] >= 2) == taken;
            let gshare_correct = (self.gshare[g_idx] >= 2) == taken;
            if local_correct != gshare_correct {
                let choice = &mut self.chooser[g_idx];
                if gshare_correct {
                    if *choice < 3 {
                        *choice += 1;
                    }
                } else if *choice > 0 {
                    *choice -= 1;
                }
            }
        }

        bump(&mut self.local[l_idx], taken);
        bump(&mut self.gshare[g_idx], taken);

        self.history = ((self.history << 1) | u64::from(taken)) & self.history_mask;

        if let Some(target) = target {
            if taken {
                self.btb.update(pc, target);
            }
        }
        if !taken {
            self.btb.punish(pc);
        }
    }

    /// Records the target of a resolved unconditional branch.
    pub fn train_target(&mut self, pc: u64, target: u64) {
        self.btb.update(pc, target);
    }

    /// Records a call: pushes the return address onto the RSB.
    pub fn on_call(&mut self, ret_addr: u64) {
        self.rsb.push(ret_addr);
    }

    /// Predicts the target of a return without consuming the RSB entry.
    pub fn predict_return(&self) -> Option<u64> {
        self.rsb.top()
    }

    /// Consumes the RSB entry when a return resolves.
    pub fn on_return(&mut self) {
        let _ = self.rsb.pop();
    }
}

/// Saturating 2-bit counter update.
fn bump(counter: &mut u8, taken: bool) {
    if taken {
        if *counter < 3 {
            *counter += 1;
        }
    } else if *counter > 0 {
        *counter -= 1;
    }
}
