//! Catch-and-log panic boundaries.
//!
//! # Responsibilities
//! - Run a closure or future and intercept a panic unwinding out of it
//! - Emit one ERROR record with the panic reason and the stack trace
//! - Resume normal control flow at the guard
//!
//! # Design Decisions
//! - The backtrace is captured by a panic hook at the panic point, not at
//!   the guard, so it shows where the panic happened
//! - The hook stays silent for panics raised under a guard and forwards
//!   every other panic to the previously installed hook
//! - Guard depth is tracked per thread; futures are guarded per poll

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context as TaskContext, Poll};

use crate::context::Context;
use crate::facade::CallSite;
use crate::level::Severity;
use crate::logger::Logger;
use crate::observability::metrics;

/// Message of the record emitted for a recovered panic.
pub const RECOVERED_MESSAGE: &str = "panic happened!";

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) > 0 {
                let trace = Backtrace::force_capture().to_string();
                LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

struct Caught {
    reason: String,
    stack: String,
}

fn payload_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

fn catch<R>(f: impl FnOnce() -> R) -> Result<R, Caught> {
    install_hook();
    let _depth = DepthGuard::enter();
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| Caught {
        reason: payload_reason(&*payload),
        stack: LAST_TRACE
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| Backtrace::force_capture().to_string()),
    })
}

fn report(logger: &Logger, ctx: &Context, site: CallSite, caught: &Caught) {
    metrics::record_recovered_panic();
    crate::__emit!(
        logger,
        ctx,
        site,
        Severity::Error,
        "ctxlog",
        tracing::Level::ERROR,
        RECOVERED_MESSAGE,
        reason = %caught.reason,
        stack = %caught.stack
    );
}

/// Run `f`, converting a panic into an ERROR record.
///
/// Returns `None` when `f` panicked. The record's `file` is the location of
/// this call.
#[track_caller]
pub fn recover<R>(logger: &Logger, ctx: &Context, f: impl FnOnce() -> R) -> Option<R> {
    let site = CallSite::caller();
    match catch(f) {
        Ok(value) => Some(value),
        Err(caught) => {
            report(logger, ctx, site, &caught);
            None
        }
    }
}

/// Guard a future the way [`recover`] guards a closure.
#[track_caller]
pub fn recover_future<F: Future>(logger: &Logger, ctx: &Context, future: F) -> Recover<F> {
    Recover {
        inner: Box::pin(future),
        logger: logger.clone(),
        ctx: ctx.clone(),
        site: CallSite::caller(),
    }
}

/// Future returned by [`recover_future`].
pub struct Recover<F> {
    inner: Pin<Box<F>>,
    logger: Logger,
    ctx: Context,
    site: CallSite,
}

impl<F: Future> Future for Recover<F> {
    type Output = Option<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let inner = &mut this.inner;
        match catch(|| inner.as_mut().poll(cx)) {
            Ok(Poll::Ready(value)) => Poll::Ready(Some(value)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(caught) => {
                report(&this.logger, &this.ctx, this.site, &caught);
                Poll::Ready(None)
            }
        }
    }
}
