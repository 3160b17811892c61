use std::{
    io::{self, Write},
    process,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{info, warn};

use crate::solver::stats::StatisticsSource;

use super::{
    clock::{as_millis_f64, SolveClock},
    config::{CancelCause, CancelConfig, OnCancel, ReportMode},
    report::{summary_line, StatisticsReporter, TextReporter},
};

// Sentinel for "no elapsed time captured yet".
const NOT_CAPTURED: u64 = u64::MAX;
// Sentinel for "no cause recorded yet"; causes are 1 and 2.
const NO_CAUSE: u8 = 0;

/// Result of polling the context from the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Poll {
    Continue,
    Stop(CancelCause),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelState {
    Running,
    Interrupted,
    TimedOut,
    Reported,
}

/// Cancellation state for one solve phase.
///
/// The signal handler is the only writer of the flags, the cause and the captured time; the main
/// loop only reads them. Every field the handler touches is a lock-free atomic, so a handler that
/// preempts the main thread at any point leaves nothing half-written.
pub struct CancellationContext {
    workload: String,
    clock: SolveClock,
    config: CancelConfig,
    stats: Arc<dyn StatisticsSource>,
    reporter: Box<dyn StatisticsReporter>,

    interrupted: AtomicBool,
    timed_out: AtomicBool,
    /// First cause to fire.
    cause: AtomicU8,
    /// Elapsed nanoseconds at the first cancellation event.
    captured_ns: AtomicU64,
    /// Latched once the report has been written (or attempted).
    reported: AtomicBool,
}

impl CancellationContext {
    /// `clock` must already be running; the handlers are installed against the returned context.
    pub fn new(
        workload: impl Into<String>,
        clock: SolveClock,
        stats: Arc<dyn StatisticsSource>,
        config: CancelConfig,
    ) -> Self {
        Self {
            workload: workload.into(),
            clock,
            config,
            stats,
            reporter: Box::new(TextReporter),
            interrupted: AtomicBool::new(false),
            timed_out: AtomicBool::new(false),
            cause: AtomicU8::new(NO_CAUSE),
            captured_ns: AtomicU64::new(NOT_CAPTURED),
            reported: AtomicBool::new(false),
        }
    }

    pub fn with_reporter(mut self, reporter: impl StatisticsReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn workload(&self) -> &str {
        &self.workload
    }

    pub fn clock(&self) -> &SolveClock {
        &self.clock
    }

    /// Handler body for both signals.
    ///
    /// In `ReportMode::Deferred` this only reads the monotonic clock and does atomic stores, all
    /// of which are async-signal-safe. Repeated or racing calls keep the first capture and cause.
    pub fn on_signal(&self, kind: CancelCause) {
        let ns = u64::try_from(self.clock.elapsed().as_nanos()).unwrap_or(NOT_CAPTURED - 1);
        let _ = self.captured_ns.compare_exchange(
            NOT_CAPTURED,
            ns,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
        let _ = self
            .cause
            .compare_exchange(NO_CAUSE, kind as u8, Ordering::AcqRel, Ordering::Relaxed);
        match kind {
            CancelCause::Interrupt => self.interrupted.store(true, Ordering::Release),
            CancelCause::Timeout => self.timed_out.store(true, Ordering::Release),
        }

        if self.config.report_mode == ReportMode::InHandler && self.report_std() {
            self.apply_policy();
        }
    }

    /// Checks for cancellation after a unit of work.
    ///
    /// The first poll that sees a cancellation writes the report and applies the `OnCancel`
    /// policy; later polls just keep returning `Stop`.
    pub fn poll(&self) -> Poll {
        let Some(cause) = self.cause() else {
            return Poll::Continue;
        };
        if self.report_std() {
            self.apply_policy();
        }
        Poll::Stop(cause)
    }

    /// Writes the notice to `err` and the summary plus full report to `out`.
    ///
    /// Returns false without writing when nothing was cancelled or the report already went out.
    /// Write failures are logged and swallowed; the flags and captured time are unaffected.
    pub fn report_to(&self, out: &mut dyn Write, err: &mut dyn Write) -> bool {
        let Some(cause) = self.cause() else {
            return false;
        };
        if self.reported.swap(true, Ordering::AcqRel) {
            return false;
        }

        let action = match self.config.on_cancel {
            OnCancel::ReportAndContinue => "stopping search",
            OnCancel::ReportAndTerminate => "forced exit",
        };
        if let Err(e) = write_notice(err, cause, action) {
            warn!("Failed to write cancellation notice: {}", e);
        }
        if let Err(e) = self.write_report(out) {
            warn!("Statistics report for {} incomplete: {}", self.workload, e);
        }
        true
    }

    fn write_report(&self, out: &mut dyn Write) -> io::Result<()> {
        let stats = self.stats.snapshot();
        writeln!(out, "{}\n", summary_line(&self.workload, &stats))?;
        self.reporter
            .report(out, &self.workload, &stats, self.captured_ms())
    }

    fn report_std(&self) -> bool {
        let stdout = io::stdout();
        let stderr = io::stderr();
        let mut out = stdout.lock();
        let mut err = stderr.lock();
        self.report_to(&mut out, &mut err)
    }

    fn apply_policy(&self) {
        if self.config.on_cancel == OnCancel::ReportAndTerminate {
            info!(
                "Terminating after cancellation with status {}",
                self.config.exit_code
            );
            let _ = io::stdout().flush();
            process::exit(self.config.exit_code);
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    pub fn is_timed_out(&self) -> bool {
        self.timed_out.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }

    /// The first cancellation cause, if any.
    pub fn cause(&self) -> Option<CancelCause> {
        CancelCause::from_u8(self.cause.load(Ordering::Acquire))
    }

    pub fn state(&self) -> CancelState {
        if self.reported.load(Ordering::Acquire) {
            return CancelState::Reported;
        }
        match self.cause() {
            None => CancelState::Running,
            Some(CancelCause::Interrupt) => CancelState::Interrupted,
            Some(CancelCause::Timeout) => CancelState::TimedOut,
        }
    }

    /// Solve time at the first cancellation event.
    pub fn captured_elapsed(&self) -> Option<Duration> {
        match self.captured_ns.load(Ordering::Acquire) {
            NOT_CAPTURED => None,
            ns => Some(Duration::from_nanos(ns)),
        }
    }

    pub fn captured_ms(&self) -> Option<f64> {
        self.captured_elapsed().map(as_millis_f64)
    }
}

fn write_notice(err: &mut dyn Write, cause: CancelCause, action: &str) -> io::Result<()> {
    writeln!(err, "\n{}: {}.", cause.notice(), action)?;
    err.flush()
}
