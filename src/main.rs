use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use ls8::emu::emulator::{EmuConfig, Emulator};

/// An emulator for the LS-8 8-bit computer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Program image to load: one binary byte per line, `#` starts a comment.
    program: PathBuf,
    /// Log a trace line for every machine cycle.
    #[arg(long)]
    trace: bool,
    /// Start in the debugger instead of running the program.
    #[arg(long)]
    debug: bool,
    /// Timer interrupt period, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timer_ms: u64,
    /// Number of executed instructions the debugger remembers.
    #[arg(long, default_value_t = 64)]
    history: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.trace {
        simplelog::LevelFilter::Trace
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let image = ls8::image::load_file(&args.program)
        .with_context(|| format!("loading {}", args.program.display()))?;
    let config = EmuConfig {
        timer_period: Duration::from_millis(args.timer_ms),
        history_len: args.history,
        start_paused: args.debug,
    };
    let mut emu = Emulator::new(&image, config)?;
    emu.run_until_halt()?;
    Ok(())
}
