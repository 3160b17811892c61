use std::fmt::Display;

// Exit status used when a cancellation terminates the process.
pub const CANCEL_EXIT_CODE_DEFAULT: i32 = 2;

#[derive(Clone, Debug)]
pub struct CancelConfig {
    /// What to do once the cancellation report has been written.
    pub on_cancel: OnCancel,
    /// Where the report is produced: on the next poll, or inside the handler itself.
    pub report_mode: ReportMode,
    /// Process exit status for `OnCancel::ReportAndTerminate`.
    pub exit_code: i32,
}

impl Default for CancelConfig {
    fn default() -> Self {
        Self {
            on_cancel: OnCancel::ReportAndContinue,
            report_mode: ReportMode::Deferred,
            exit_code: CANCEL_EXIT_CODE_DEFAULT,
        }
    }
}

// Policy applied after a cancellation has been reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OnCancel {
    /// Hand control back to the caller, e.g. so a best-effort answer can still be printed.
    #[value(name = "continue")]
    ReportAndContinue,
    /// Flush and exit the process.
    #[value(name = "terminate")]
    ReportAndTerminate,
}

// Where reporting happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportMode {
    /// The handler only flips atomics; the main loop reports on its next poll.
    Deferred,
    /// The handler formats and writes the report itself.
    ///
    /// NOTE: buffered I/O is not async-signal-safe. If the signal lands while the main thread
    /// holds the stdout lock or is inside the allocator, the handler can deadlock or corrupt
    /// output. Only use this when the main loop may never poll again.
    InHandler,
}

/// Which signal caused the cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CancelCause {
    Interrupt = 1,
    Timeout = 2,
}

impl CancelCause {
    pub(crate) fn from_u8(v: u8) -> Option<CancelCause> {
        match v {
            1 => Some(Self::Interrupt),
            2 => Some(Self::Timeout),
            _ => None,
        }
    }

    /// Event name used in the notice written to the error stream.
    pub fn notice(&self) -> &'static str {
        match self {
            Self::Interrupt => "CATCHING SIG_INT",
            Self::Timeout => "TIMEOUT EXPIRED",
        }
    }
}

impl Display for CancelCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupted"),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}
