use std::{
    io, mem, ptr,
    sync::{
        atomic::{AtomicPtr, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use log::debug;

use super::{config::CancelCause, context::CancellationContext};

/// Binds one signal to the context its handler reports into.
///
/// Each handler runs with every other signal blocked (`sigfillset` on `sa_mask`), so an interrupt
/// never preempts a timeout handler mid-way or the other way round.
struct Slot {
    signal: libc::c_int,
    name: &'static str,
    cause: CancelCause,
    /// Null, or a pointer obtained from `Arc::into_raw`.
    ctx: AtomicPtr<CancellationContext>,
}

static INTERRUPT: Slot = Slot {
    signal: libc::SIGINT,
    name: "SIGINT",
    cause: CancelCause::Interrupt,
    ctx: AtomicPtr::new(ptr::null_mut()),
};

static TIMEOUT: Slot = Slot {
    signal: libc::SIGALRM,
    name: "SIGALRM",
    cause: CancelCause::Timeout,
    ctx: AtomicPtr::new(ptr::null_mut()),
};

extern "C" fn interrupt_handler(_sig: libc::c_int) {
    INTERRUPT.fire();
}

extern "C" fn timeout_handler(_sig: libc::c_int) {
    TIMEOUT.fire();
}

/// Installs the SIGINT handler for `ctx`, replacing any earlier registration.
pub fn install_interrupt_handler(ctx: &Arc<CancellationContext>) -> Result<()> {
    INTERRUPT.install(ctx, interrupt_handler)
}

/// Installs the SIGALRM handler for `ctx`, replacing any earlier registration.
///
/// Arming the timer is up to the caller (e.g. `alarm(2)` or `setitimer(2)`).
pub fn install_timeout_handler(ctx: &Arc<CancellationContext>) -> Result<()> {
    TIMEOUT.install(ctx, timeout_handler)
}

/// Puts both signals back to their default disposition and releases the bound contexts.
pub fn restore_default_handlers() -> Result<()> {
    INTERRUPT.clear()?;
    TIMEOUT.clear()
}

impl Slot {
    fn fire(&self) {
        let ctx = self.ctx.load(Ordering::Acquire);
        // Safety: a non-null pointer came from `Arc::into_raw` and is only released by
        // `install`/`clear` while this signal is blocked, so the context outlives this call.
        if let Some(ctx) = unsafe { ctx.as_ref() } {
            ctx.on_signal(self.cause);
        }
    }

    fn install(
        &self,
        ctx: &Arc<CancellationContext>,
        handler: extern "C" fn(libc::c_int),
    ) -> Result<()> {
        let _blocked = BlockedSignal::new(self.signal)
            .with_context(|| format!("blocking {} while installing its handler", self.name))?;

        let new = Arc::into_raw(Arc::clone(ctx)) as *mut CancellationContext;
        let old = self.ctx.swap(new, Ordering::AcqRel);
        if let Err(e) = set_action(self.signal, handler as libc::sighandler_t) {
            let ours = self.ctx.swap(old, Ordering::AcqRel);
            release(ours);
            return Err(e).with_context(|| format!("installing {} handler", self.name));
        }
        release(old);

        debug!("Installed {} handler for {}", self.name, ctx.workload());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _blocked = BlockedSignal::new(self.signal)
            .with_context(|| format!("blocking {} while restoring it", self.name))?;
        set_action(self.signal, libc::SIG_DFL)
            .with_context(|| format!("restoring default {} disposition", self.name))?;
        release(self.ctx.swap(ptr::null_mut(), Ordering::AcqRel));
        Ok(())
    }
}

fn release(ctx: *mut CancellationContext) {
    if !ctx.is_null() {
        // Safety: every non-null slot pointer is an `Arc::into_raw` result, taken out of the slot
        // exactly once by the swap that returned it.
        drop(unsafe { Arc::from_raw(ctx as *const CancellationContext) });
    }
}

fn set_action(signal: libc::c_int, handler: libc::sighandler_t) -> io::Result<()> {
    // Safety: registering a signal handler is libc unsafe code; `sa` is fully initialised.
    unsafe {
        let mut sa: libc::sigaction = mem::zeroed();
        sa.sa_sigaction = handler;
        sa.sa_flags = 0;
        if libc::sigfillset(&mut sa.sa_mask) != 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::sigaction(signal, &sa, ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Blocks one signal on the current thread until dropped.
struct BlockedSignal {
    previous: libc::sigset_t,
}

impl BlockedSignal {
    fn new(signal: libc::c_int) -> io::Result<Self> {
        // Safety: both sets are initialised by sigemptyset before use.
        unsafe {
            let mut set: libc::sigset_t = mem::zeroed();
            let mut previous: libc::sigset_t = mem::zeroed();
            libc::sigemptyset(&mut set);
            libc::sigemptyset(&mut previous);
            libc::sigaddset(&mut set, signal);
            match libc::pthread_sigmask(libc::SIG_BLOCK, &set, &mut previous) {
                0 => Ok(Self { previous }),
                errno => Err(io::Error::from_raw_os_error(errno)),
            }
        }
    }
}

impl Drop for BlockedSignal {
    fn drop(&mut self) {
        // Safety: restores the mask saved in `new`.
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &self.previous, ptr::null_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use crate::{
        cancel::{
            clock::SolveClock,
            config::CancelConfig,
            context::{CancelState, Poll},
            test_util::signal_lock,
        },
        solver::stats::SolverCounters,
    };

    use super::*;

    fn context() -> Arc<CancellationContext> {
        Arc::new(CancellationContext::new(
            "signals-test",
            SolveClock::start(),
            Arc::new(SolverCounters::default()),
            CancelConfig::default(),
        ))
    }

    #[test]
    fn raised_interrupt_sets_flag() {
        let _lock = signal_lock();
        let ctx = context();
        install_interrupt_handler(&ctx).unwrap();
        install_timeout_handler(&ctx).unwrap();

        // raise(3) delivers to the calling thread before returning.
        unsafe { libc::raise(libc::SIGINT) };

        assert!(ctx.is_interrupted());
        assert!(!ctx.is_timed_out());
        assert_eq!(ctx.state(), CancelState::Interrupted);
        assert!(ctx.captured_elapsed().is_some());
        assert_eq!(ctx.poll(), Poll::Stop(CancelCause::Interrupt));

        restore_default_handlers().unwrap();
    }

    #[test]
    fn raised_timeout_sets_flag() {
        let _lock = signal_lock();
        let ctx = context();
        install_interrupt_handler(&ctx).unwrap();
        install_timeout_handler(&ctx).unwrap();

        unsafe { libc::raise(libc::SIGALRM) };

        assert!(ctx.is_timed_out());
        assert!(!ctx.is_interrupted());
        assert_eq!(ctx.cause(), Some(CancelCause::Timeout));

        restore_default_handlers().unwrap();
    }

    #[test]
    fn alarm_fires_once() {
        let _lock = signal_lock();
        let ctx = context();
        install_timeout_handler(&ctx).unwrap();

        unsafe { libc::alarm(1) };
        let deadline = Instant::now() + Duration::from_secs(5);
        while !ctx.is_timed_out() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        unsafe { libc::alarm(0) };

        assert!(ctx.is_timed_out());
        assert!(!ctx.is_interrupted());
        let ms = ctx.captured_ms().unwrap();
        assert!((900. ..=2000.).contains(&ms), "captured {ms}ms");

        restore_default_handlers().unwrap();
    }

    #[test]
    fn reinstall_releases_previous_context() {
        let _lock = signal_lock();
        let first = context();
        let second = context();

        install_interrupt_handler(&first).unwrap();
        assert_eq!(Arc::strong_count(&first), 2);
        install_interrupt_handler(&first).unwrap();
        assert_eq!(Arc::strong_count(&first), 2);

        install_interrupt_handler(&second).unwrap();
        assert_eq!(Arc::strong_count(&first), 1);
        assert_eq!(Arc::strong_count(&second), 2);

        unsafe { libc::raise(libc::SIGINT) };
        assert!(second.is_interrupted());
        assert!(!first.is_interrupted());

        restore_default_handlers().unwrap();
        assert_eq!(Arc::strong_count(&second), 1);
    }
}
