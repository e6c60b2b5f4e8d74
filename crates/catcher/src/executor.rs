//! Guarded execution.
//!
//! Runs an operation under panic interception, dispatches the outcome to the
//! failure or success handler, and always finishes with the finally handler.
//!
//! Stages: `Pending -> Running -> {Faulted -> Failed | Failed | Succeeded}
//! -> Finalizing -> Done`.
//!
//! The returned error is, in priority order: the finally step's error, the
//! failure/success step's error, the fault-or-operation error, none.

use std::any::Any;
use std::sync::Arc;

use catcher_core::{Error, ErrorSlotExt, Result, ResultExt};
use tracing::{Level, debug, warn};

use crate::binder::LastResult;
use crate::diagnostics::{DiagnosticSink, Diagnostics, TracingSink};
use crate::fault::{guarded, intercept};
use crate::handler::{
    ErrorObserver, FinallyHandler, HandlerKind, HandlerRegistry, Registration,
};

/// Execution stage of a guarded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Pending,
    Running,
    Faulted,
    Failed,
    Succeeded,
    Finalizing,
    Done,
}

/// Outcome branch a run took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// The operation panicked; the failure handler ran with the converted fault.
    Faulted,
    /// The operation returned an error.
    Failed,
    /// The operation returned `Ok(())`.
    Succeeded,
}

/// Configuration for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Prefix for operation failures, displayed as `"{context}: {error}"`.
    pub context: Option<String>,
    /// Diagnostic level for intercepted faults.
    pub fault_level: Level,
    /// Diagnostic level for binding errors.
    pub binding_level: Level,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            context: None,
            fault_level: Level::ERROR,
            binding_level: Level::WARN,
        }
    }
}

/// Runs one operation against one set of handlers.
#[derive(Debug)]
pub struct Executor<'a> {
    handlers: HandlerRegistry<'a>,
    diagnostics: Diagnostics,
    config: ExecutorConfig,
}

impl<'a> Executor<'a> {
    /// Create an executor that reports diagnostics through `tracing`.
    #[must_use]
    pub fn new(handlers: HandlerRegistry<'a>) -> Self {
        Self {
            handlers,
            diagnostics: Diagnostics::new(Some(Arc::new(TracingSink))),
            config: ExecutorConfig::default(),
        }
    }

    /// Report diagnostics to `sink` instead.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Diagnostics::new(Some(sink));
        self
    }

    /// Drop diagnostics silently.
    #[must_use]
    pub fn without_diagnostics(mut self) -> Self {
        self.diagnostics = Diagnostics::default();
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Prefix operation failures with `context`.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.config.context = Some(context.into());
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `operation` once and dispatch its outcome.
    ///
    /// Panics raised by the operation or by the failure, success and finally
    /// callbacks are intercepted. A panic from the error observer or the
    /// diagnostic sink unwinds to the caller, after the finally handler has run.
    pub fn run<F, E>(self, operation: F) -> Report
    where
        F: FnOnce() -> std::result::Result<(), E>,
        E: Into<anyhow::Error>,
    {
        let Self {
            handlers,
            diagnostics,
            config,
        } = self;
        let HandlerRegistry {
            mut observer,
            mut failure,
            mut success,
            finally,
        } = handlers;
        let mut stages = StageLog::new();
        let mut guard = FinallyGuard::new(finally, &diagnostics, config.fault_level);

        stages.advance(Stage::Running);
        let (branch, error) = match intercept(operation) {
            Ok(Ok(())) => (Branch::Succeeded, None),
            Ok(Err(source)) => (
                Branch::Failed,
                Some(operation_failure(config.context.as_deref(), source)),
            ),
            Err(fault) => {
                stages.advance(Stage::Faulted);
                let error = fault.into_error();
                diagnostics.emit(config.fault_level, "Intercepted runtime fault", &error);
                observer.notify(&error);
                (Branch::Faulted, Some(error))
            }
        };

        let (kind, outcome) = match &error {
            Some(error) => {
                stages.advance(Stage::Failed);
                (HandlerKind::Failure, guarded(|| failure.invoke(error)))
            }
            None => {
                stages.advance(Stage::Succeeded);
                (HandlerKind::Success, guarded(|| success.invoke()))
            }
        };
        let branch_error = outcome
            .inspect_error(|e| report_step_error(&mut observer, &diagnostics, &config, kind, e))
            .err_or_none();

        stages.advance(Stage::Finalizing);
        let finally_error = guard
            .finish()
            .inspect_error(|e| {
                report_step_error(&mut observer, &diagnostics, &config, HandlerKind::Finally, e);
            })
            .err_or_none();
        let finally_result = guard.take_last_result();
        drop(guard);
        stages.advance(Stage::Done);

        let error = finally_error.or_earlier(branch_error.or_earlier(error));
        debug!(?branch, failed = error.is_some(), "Guarded run finished");

        Report {
            error,
            branch,
            stages: stages.into_inner(),
            failure: failure.take_last_result(),
            success: success.take_last_result(),
            finally: finally_result,
        }
    }
}

fn operation_failure(context: Option<&str>, source: impl Into<anyhow::Error>) -> Error {
    match context {
        Some(context) => Error::operation_failure_with_context(context, source),
        None => Error::operation_failure(source),
    }
}

fn report_step_error(
    observer: &mut ErrorObserver<'_>,
    diagnostics: &Diagnostics,
    config: &ExecutorConfig,
    kind: HandlerKind,
    error: &Error,
) {
    let (level, message) = if error.is_fault() {
        (config.fault_level, format!("{kind} handler faulted"))
    } else {
        (config.binding_level, format!("{kind} handler result could not be bound"))
    };
    diagnostics.emit(level, &message, error);
    observer.notify(error);
}

/// Ordered record of stage transitions.
#[derive(Debug)]
struct StageLog {
    stages: Vec<Stage>,
}

impl StageLog {
    fn new() -> Self {
        Self {
            stages: vec![Stage::Pending],
        }
    }

    fn current(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Pending)
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = ?self.current(), to = ?next, "Stage transition");
        self.stages.push(next);
    }

    fn into_inner(self) -> Vec<Stage> {
        self.stages
    }
}

/// Owns the finally handler and runs it on drop if [`finish`](Self::finish)
/// was never reached.
struct FinallyGuard<'g, 'a> {
    handler: FinallyHandler<'a>,
    diagnostics: &'g Diagnostics,
    level: Level,
    finished: bool,
}

impl<'g, 'a> FinallyGuard<'g, 'a> {
    const fn new(handler: FinallyHandler<'a>, diagnostics: &'g Diagnostics, level: Level) -> Self {
        Self {
            handler,
            diagnostics,
            level,
            finished: false,
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        guarded(|| self.handler.invoke())
    }

    const fn take_last_result(&mut self) -> Option<LastResult> {
        self.handler.take_last_result()
    }
}

impl Drop for FinallyGuard<'_, '_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        warn!("Guarded run unwinding, running finally handler from guard");
        if let Err(error) = guarded(|| self.handler.invoke()) {
            self.diagnostics
                .emit(self.level, "finally handler failed during unwind", &error);
        }
    }
}

/// What happened during a guarded run.
#[derive(Debug)]
pub struct Report {
    error: Option<Error>,
    branch: Branch,
    stages: Vec<Stage>,
    failure: Option<LastResult>,
    success: Option<LastResult>,
    finally: Option<LastResult>,
}

impl Report {
    /// The final error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// The branch the run took.
    #[must_use]
    pub const fn branch(&self) -> Branch {
        self.branch
    }

    /// Stages visited, in order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The value the `kind` handler produced, when it had no destination.
    #[must_use]
    pub fn last_result<T: Any>(&self, kind: HandlerKind) -> Option<&T> {
        match kind {
            HandlerKind::Failure => self.failure.as_ref(),
            HandlerKind::Success => self.success.as_ref(),
            HandlerKind::Finally => self.finally.as_ref(),
        }
        .and_then(LastResult::downcast_ref)
    }

    /// Convert into the final `Result`.
    ///
    /// # Errors
    ///
    /// Returns the final error of the run.
    pub fn into_result(self) -> Result<()> {
        self.error.into_result()
    }
}

/// Run `operation` with handlers assembled from `registrations`.
///
/// Later registrations of a kind replace earlier ones.
///
/// # Errors
///
/// Returns the final error of the run; see the module docs for precedence.
pub fn catch<'a, F, E, I>(operation: F, registrations: I) -> Result<()>
where
    F: FnOnce() -> std::result::Result<(), E>,
    E: Into<anyhow::Error>,
    I: IntoIterator<Item = Registration<'a>>,
{
    Executor::new(registrations.into_iter().collect())
        .run(operation)
        .into_result()
}

/// Dispatch an already computed `result`, prefixing a failure with `context`.
///
/// # Errors
///
/// Returns the final error of the run.
pub fn catch_result<'a, E, I>(
    result: std::result::Result<(), E>,
    context: impl Into<String>,
    registrations: I,
) -> Result<()>
where
    E: Into<anyhow::Error>,
    I: IntoIterator<Item = Registration<'a>>,
{
    Executor::new(registrations.into_iter().collect())
        .with_context(context)
        .run(move || result)
        .into_result()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::binder::Discard;
    use crate::diagnostics::MemorySink;

    #[test]
    fn test_stage_log_starts_pending() {
        let mut log = StageLog::new();
        assert_eq!(log.current(), Stage::Pending);
        log.advance(Stage::Running);
        assert_eq!(log.current(), Stage::Running);
        assert_eq!(log.into_inner(), vec![Stage::Pending, Stage::Running]);
    }

    #[test]
    fn test_success_stages() {
        let report = Executor::new(HandlerRegistry::new())
            .without_diagnostics()
            .run(|| Ok::<(), anyhow::Error>(()));
        assert_eq!(report.branch(), Branch::Succeeded);
        assert_eq!(
            report.stages(),
            &[
                Stage::Pending,
                Stage::Running,
                Stage::Succeeded,
                Stage::Finalizing,
                Stage::Done
            ]
        );
        assert!(report.error().is_none());
    }

    #[test]
    fn test_fault_stages() {
        let report = Executor::new(HandlerRegistry::new())
            .without_diagnostics()
            .run(|| -> anyhow::Result<()> { std::panic::panic_any("boom") });
        assert_eq!(report.branch(), Branch::Faulted);
        assert_eq!(
            report.stages(),
            &[
                Stage::Pending,
                Stage::Running,
                Stage::Faulted,
                Stage::Failed,
                Stage::Finalizing,
                Stage::Done
            ]
        );
        assert!(report.error().is_some_and(Error::is_fault));
    }

    #[test]
    fn test_context_prefixes_failure() {
        let report = Executor::new(HandlerRegistry::new())
            .without_diagnostics()
            .with_context("loading")
            .run(|| Err(anyhow::anyhow!("boom")));
        assert_eq!(
            report.error().map(ToString::to_string).as_deref(),
            Some("loading: boom")
        );
    }

    #[test]
    fn test_last_results_are_reported() {
        let registry = HandlerRegistry::new()
            .on_success(Discard, || 5_u32)
            .finally(Discard, || "done");
        let report = Executor::new(registry)
            .without_diagnostics()
            .run(|| Ok::<(), anyhow::Error>(()));
        assert_eq!(report.last_result::<u32>(HandlerKind::Success), Some(&5));
        assert_eq!(report.last_result::<&str>(HandlerKind::Finally), Some(&"done"));
        assert_eq!(report.last_result::<u32>(HandlerKind::Failure), None);
    }

    #[test]
    fn test_guard_runs_finally_when_observer_unwinds() {
        let calls = RefCell::new(Vec::new());
        let sink = MemorySink::new();
        let registry = HandlerRegistry::new()
            .on_error(|_| std::panic::panic_any("observer broke"))
            .finally(Discard, || calls.borrow_mut().push("finally"));
        let executor = Executor::new(registry).with_sink(Arc::new(sink.clone()));

        let unwound = intercept(|| {
            executor.run(|| -> anyhow::Result<()> { std::panic::panic_any("boom") })
        });

        assert!(unwound.is_err());
        assert_eq!(*calls.borrow(), vec!["finally"]);
        assert!(sink.entries().iter().any(|d| d.level == Level::ERROR));
    }

    #[test]
    fn test_config_defaults() {
        let config = ExecutorConfig::default();
        assert!(config.context.is_none());
        assert_eq!(config.fault_level, Level::ERROR);
        assert_eq!(config.binding_level, Level::WARN);

        let executor = Executor::new(HandlerRegistry::new()).with_config(ExecutorConfig {
            context: Some("ctx".to_owned()),
            ..ExecutorConfig::default()
        });
        assert_eq!(executor.config().context.as_deref(), Some("ctx"));
    }
}
