use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use cancel::{
    clock::SolveClock,
    config::{CancelConfig, OnCancel, ReportMode},
    context::CancellationContext,
    report::TextReporter,
    signals,
};
use clap::Parser;
use dimacs::parser::DimacsParser;
use log::info;
use solver::{config::SolverConfig, dpll::DPLLSolver, stats::SolverCounters, types::SolveStatus};

mod cancel;
mod dimacs;
mod solver;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// File path of instance to parse
    #[arg(short, long)]
    pub file: String,

    /// Wall-clock limit in seconds (0 = none)
    #[arg(short, long, default_value_t = 0)]
    pub timeout: u32,

    /// What to do after a cancellation has been reported
    #[arg(short, long, value_enum, default_value_t = OnCancel::ReportAndContinue)]
    pub on_cancel: OnCancel,

    /// Report from inside the signal handler instead of on the next poll (not reentrancy-safe)
    #[arg(long, default_value_t = false)]
    pub report_in_handler: bool,

    /// Max learnt clauses to keep
    #[arg(short, long, default_value_t = solver::config::MAX_LEMMAS_DEFAULT)]
    pub max_lemmas: usize,

    /// Conflicts before the first restart (0 = never restart)
    #[arg(short, long, default_value_t = solver::config::RESTART_BASE_DEFAULT)]
    pub restart_base: u64,

    /// Log filter (off, error, warn, info, debug, trace)
    #[arg(short, long, default_value_t = log::LevelFilter::Info)]
    pub verbosity: log::LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();

    log::set_max_level(log::LevelFilter::Trace);
    env_logger::builder()
        .filter(None, args.verbosity)
        .parse_default_env()
        .init();

    // Get instance
    let instance = DimacsParser::new(&args.file)?
        .parse()
        .with_context(|| format!("parsing {}", args.file))?;
    info!(
        "{} variables ({} occurring), {} clauses",
        instance.n_vars,
        instance.vars.len(),
        instance.n_clauses
    );
    let workload = Path::new(&args.file)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.clone());

    let cfg = SolverConfig {
        max_lemmas: args.max_lemmas,
        restart_base: args.restart_base,
        ..SolverConfig::default()
    };
    let cancel_cfg = CancelConfig {
        on_cancel: args.on_cancel,
        report_mode: if args.report_in_handler {
            ReportMode::InHandler
        } else {
            ReportMode::Deferred
        },
        ..CancelConfig::default()
    };
    info!("Config: {:#?}", cfg);
    info!("Cancellation: {:#?}", cancel_cfg);

    // Start the clock before either handler can fire
    let stats = Arc::new(SolverCounters::default());
    let clock = SolveClock::start();
    let ctx = Arc::new(
        CancellationContext::new(workload.clone(), clock, stats.clone(), cancel_cfg)
            .with_reporter(TextReporter),
    );
    signals::install_interrupt_handler(&ctx)?;
    signals::install_timeout_handler(&ctx)?;
    if args.timeout > 0 {
        info!("Arming {}s timeout", args.timeout);
        // Safety: alarm(2) has no memory-safety preconditions.
        unsafe { libc::alarm(args.timeout) };
    }

    let mut solver = DPLLSolver::new(cfg, &instance, stats);
    let res = solver.solve(&ctx);
    // Safety: as above; cancels any pending alarm.
    unsafe { libc::alarm(0) };
    let elapsed = ctx
        .captured_elapsed()
        .unwrap_or_else(|| ctx.clock().elapsed());
    info!(
        "Cancellation state: {:?} (cancelled: {}, interrupted: {}, timed out: {})",
        ctx.state(),
        ctx.is_cancelled(),
        ctx.is_interrupted(),
        ctx.is_timed_out()
    );

    match res {
        SolveStatus::SAT => {
            let display_str = solver
                .assignments()
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            println!("v {} 0", display_str);
        }
        SolveStatus::UNSAT => (),
        SolveStatus::Cancelled(cause) => info!("Best-effort exit after being {}", cause),
    }
    println!("s {}", res);
    let reason = match ctx.cause() {
        Some(cause) => format!(" ({})", cause),
        None => String::new(),
    };
    println!(
        "[{}] Status: {}{}\tElapsed: {:#?}",
        workload, res, reason, elapsed
    );

    signals::restore_default_handlers()?;
    Ok(())
}
