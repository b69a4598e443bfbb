//! ARM64 cycle-accurate simulator CLI.
//!
//! This binary provides a single entry point for both execution modes:
//! 1. **Functional run:** architecturally correct execution, no timing.
//! 2. **Timing run:** the 5-stage superscalar pipeline with caches and
//!    branch prediction, reporting cycles, CPI, and stall breakdowns.
//!
//! Programs are ARM64 ELF binaries by default; `--raw` loads a flat binary
//! at a fixed address. Configuration comes from built-in M2 defaults, an
//! optional JSON file, and command-line overrides (in that order).

use clap::{Parser, Subcommand};
use std::process;

use m2sim_core::config::Config;
use m2sim_core::sim::loader;
use m2sim_core::sim::StopReason;
use m2sim_core::{Emulator, Pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "m2sim",
    author,
    version,
    about = "Apple M2-class ARM64 CPU simulator",
    long_about = "Run a user-space ARM64 ELF binary through the functional emulator or the\ncycle-accurate timing model.\n\nExamples:\n  m2sim run -f benchmarks/qsort\n  m2sim run -f benchmarks/qsort --timing --width 4\n  m2sim run -f image.bin --raw --load-addr 0x100000 --timing --no-dcache"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a binary to completion and report statistics.
    Run {
        /// Program to execute (ELF unless --raw).
        #[arg(short, long)]
        file: String,

        /// Use the cycle-accurate timing model instead of the functional
        /// emulator.
        #[arg(long)]
        timing: bool,

        /// Issue width for the timing model (1, 2, 4, 6, or 8).
        #[arg(long)]
        width: Option<usize>,

        /// Disable the L1 instruction cache.
        #[arg(long)]
        no_icache: bool,

        /// Disable the L1 data cache.
        #[arg(long)]
        no_dcache: bool,

        /// Disable the L2 cache.
        #[arg(long)]
        no_l2: bool,

        /// Cycle bound for the timing model.
        #[arg(long)]
        max_cycles: Option<u64>,

        /// JSON configuration file (overridden by the flags above).
        #[arg(long)]
        config: Option<String>,

        /// Treat the program as a flat binary loaded at --load-addr.
        #[arg(long)]
        raw: bool,

        /// Load address (and entry) for --raw images.
        #[arg(long, default_value_t = 0x10_0000)]
        load_addr: u64,

        /// Per-stage trace output on stderr.
        #[arg(long)]
        trace: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            file,
            timing,
            width,
            no_icache,
            no_dcache,
            no_l2,
            max_cycles,
            config,
            raw,
            load_addr,
            trace,
        } => {
            let mut cfg = match config {
                Some(path) => read_config(&path),
                None => Config::default(),
            };
            if let Some(width) = width {
                cfg.pipeline.width = width;
            }
            if no_icache {
                cfg.cache.l1_i.enabled = false;
            }
            if no_dcache {
                cfg.cache.l1_d.enabled = false;
            }
            if no_l2 {
                cfg.cache.l2.enabled = false;
            }
            if let Some(max_cycles) = max_cycles {
                cfg.general.max_cycles = max_cycles;
            }
            cfg.general.trace = trace;

            let image = if raw {
                let data = std::fs::read(&file).unwrap_or_else(|e| {
                    eprintln!("[!] FATAL: could not read '{file}': {e}");
                    process::exit(1);
                });
                loader::load_flat(load_addr, data)
            } else {
                loader::load_elf(&file).unwrap_or_else(|e| {
                    eprintln!("[!] FATAL: {e}");
                    process::exit(1);
                })
            };

            if timing {
                run_timing(&cfg, &image);
            } else {
                run_functional(&cfg, &image);
            }
        }
    }
}

/// Parses a JSON configuration file; exits on error.
fn read_config(path: &str) -> Config {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("[!] FATAL: could not read config '{path}': {e}");
        process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("[!] FATAL: bad config '{path}': {e}");
        process::exit(1);
    })
}

/// Runs the functional emulator and exits with the guest's exit code.
fn run_functional(cfg: &Config, image: &loader::LoadedImage) {
    let mut emulator = Emulator::new(cfg);
    if let Err(e) = emulator.load(image) {
        eprintln!("[!] FATAL: {e}");
        process::exit(1);
    }
    match emulator.run() {
        Ok(result) => {
            eprintln!(
                "\n[*] {} instructions retired",
                result.stats.instructions_retired
            );
            match result.reason {
                StopReason::Exited(code) => {
                    eprintln!("[*] Exit code {code}");
                    process::exit(i32::from(code));
                }
                reason => {
                    eprintln!("[!] Stopped early: {reason:?}");
                    process::exit(2);
                }
            }
        }
        Err(e) => {
            eprintln!("[!] FATAL: {e}");
            process::exit(1);
        }
    }
}

/// Runs the timing model, prints the stats block, and exits with the
/// guest's exit code.
fn run_timing(cfg: &Config, image: &loader::LoadedImage) {
    let mut pipeline = Pipeline::new(cfg);
    if let Err(e) = pipeline.load(image) {
        eprintln!("[!] FATAL: {e}");
        process::exit(1);
    }
    match pipeline.run_until_exit() {
        Ok(result) => {
            result.stats.print();
            match result.reason {
                StopReason::Exited(code) => {
                    eprintln!("[*] Exit code {code}");
                    process::exit(i32::from(code));
                }
                reason => {
                    eprintln!("[!] Stopped early: {reason:?}");
                    process::exit(2);
                }
            }
        }
        Err(e) => {
            eprintln!("[!] FATAL: {e}");
            process::exit(1);
        }
    }
}
