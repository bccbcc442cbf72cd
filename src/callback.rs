use enum_dispatch::enum_dispatch;

use crate::DescentTrace;

/// Hook invoked once per solver iteration for logging or monitoring.
#[enum_dispatch]
pub trait Callback {
    /// Called at the end of each outer iteration with the current trace.
    fn call(&mut self, trace: &DescentTrace<'_>);
}

/// A callback that does nothing. Use when no per-iteration output is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl Callback for NoOpCallback {
    fn call(&mut self, _trace: &DescentTrace<'_>) {
        // Do nothing
    }
}

/// Emits one structured log event per iteration with the step length and
/// the goal-function value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergenceOutput;

impl Callback for ConvergenceOutput {
    fn call(&mut self, trace: &DescentTrace<'_>) {
        tracing::info!(
            nit = trace.nit,
            alpha = trace.alpha,
            objective = trace.objective,
            "descent iteration"
        );
    }
}

/// Registry of the available callbacks, dispatched without boxing.
#[enum_dispatch(Callback)]
#[derive(Debug, Clone, Copy)]
pub enum Callbacks {
    NoOp(NoOpCallback),
    Convergence(ConvergenceOutput),
}

impl Default for Callbacks {
    fn default() -> Self {
        Callbacks::NoOp(NoOpCallback)
    }
}
