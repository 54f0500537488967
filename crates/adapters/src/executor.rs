// SPDX-License-Identifier: MIT

//! Executor contract: the narrow interface the core talks to the
//! out-of-process agent runner through. `spawn`/`forceComplete` are the only
//! two operations; everything about how an agent actually runs lives on the
//! other side of this trait.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use aof_core::{AgentId, Gate, Priority, ProjectId, Routing, TaskId};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

/// Everything the executor needs to run a task, handed to `spawn`.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: TaskId,
    pub task_path: String,
    pub agent: Option<AgentId>,
    pub priority: Priority,
    pub routing: Routing,
    pub project_id: ProjectId,
    pub project_root: String,
    pub task_relpath: String,
    pub gate_context: Option<Gate>,
}

/// Per-dispatch options passed alongside the context.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    pub timeout: Duration,
    pub correlation_id: String,
}

/// Result of a spawn attempt. `platform_limit`, when set, means the
/// platform has advertised a lower concurrency ceiling than we assumed —
/// distinct from an ordinary failure and handled separately by the
/// scheduler.
#[derive(Debug, Clone, Default)]
pub struct SpawnResult {
    pub success: bool,
    pub session_id: Option<String>,
    pub error: Option<String>,
    pub platform_limit: Option<u32>,
}

impl SpawnResult {
    pub fn ok(session_id: impl Into<String>) -> Self {
        Self { success: true, session_id: Some(session_id.into()), ..Default::default() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Default::default() }
    }

    pub fn platform_limited(limit: u32, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            platform_limit: Some(limit),
            ..Default::default()
        }
    }
}

/// Classification of a dispatch failure, and the status a task moves to
/// as a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    RateLimited,
    Timeout,
    TransientNetwork,
    Permanent,
    Unknown,
}

impl FailureClass {
    /// Whether a task in this class should go straight to `deadletter`
    /// rather than `blocked`, given the current retry count.
    pub fn is_terminal(self, retry_count: u32, max_retries: u32) -> bool {
        match self {
            Self::Permanent => true,
            Self::Unknown => retry_count >= max_retries,
            Self::RateLimited | Self::Timeout | Self::TransientNetwork => false,
        }
    }
}

/// Classify a dispatch error message against the failure taxonomy table.
/// `timed_out` is set when the spawn call itself exceeded `spawnTimeoutMs`.
pub fn classify_error(message: &str, timed_out: bool) -> FailureClass {
    if timed_out {
        return FailureClass::Timeout;
    }
    let lower = message.to_ascii_lowercase();
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("quota") {
        return FailureClass::RateLimited;
    }
    if lower.contains("connection reset") || has_5xx(&lower) {
        return FailureClass::TransientNetwork;
    }
    if lower.contains("no such agent") || lower.contains("invalid config") || has_4xx_other_than_429(&lower)
    {
        return FailureClass::Permanent;
    }
    FailureClass::Unknown
}

fn has_5xx(lower: &str) -> bool {
    ["500", "502", "503", "504"].iter().any(|code| lower.contains(code))
}

fn has_4xx_other_than_429(lower: &str) -> bool {
    ["400", "401", "403", "404"].iter().any(|code| lower.contains(code))
}

/// Adapter for the out-of-process agent executor.
#[async_trait]
pub trait ExecutorAdapter: Send + Sync + 'static {
    async fn spawn(&self, ctx: TaskContext, opts: SpawnOptions) -> Result<SpawnResult, ExecutorError>;
    async fn force_complete(&self, session_id: &str, reason: &str) -> Result<(), ExecutorError>;
}

/// Executor that refuses to run anything. Safe default for contexts that
/// never dispatch (e.g. a read-only CLI invocation).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutorAdapter;

#[async_trait]
impl ExecutorAdapter for NoopExecutorAdapter {
    async fn spawn(&self, _ctx: TaskContext, _opts: SpawnOptions) -> Result<SpawnResult, ExecutorError> {
        Ok(SpawnResult::failed("no such agent: noop executor accepts no dispatches"))
    }

    async fn force_complete(&self, _session_id: &str, _reason: &str) -> Result<(), ExecutorError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub struct SpawnCall {
        pub task_id: TaskId,
        pub correlation_id: String,
    }

    #[derive(Debug, Clone)]
    pub struct ForceCompleteCall {
        pub session_id: String,
        pub reason: String,
    }

    /// Scripted failure a [`MockAdapter`] should return for a given task.
    #[derive(Debug, Clone)]
    pub struct ScriptedFailure {
        pub error: String,
        pub platform_limit: Option<u32>,
    }

    #[derive(Default)]
    struct MockState {
        spawns: Vec<SpawnCall>,
        force_completes: Vec<ForceCompleteCall>,
        failures: HashMap<TaskId, ScriptedFailure>,
        next_session: u64,
    }

    /// Executor double for tests: can auto-complete a spawn
    /// (the default), fail with a classifiable error for a scripted task,
    /// or simulate a platform concurrency limit.
    #[derive(Clone, Default)]
    pub struct MockAdapter {
        state: Arc<Mutex<MockState>>,
    }

    impl MockAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the next spawn for `task_id` to fail with `error` instead
        /// of auto-completing.
        pub fn fail_next(&self, task_id: TaskId, error: impl Into<String>) {
            self.state
                .lock()
                .failures
                .insert(task_id, ScriptedFailure { error: error.into(), platform_limit: None });
        }

        /// Script the next spawn for `task_id` to report a platform
        /// concurrency limit instead of succeeding.
        pub fn platform_limit_next(&self, task_id: TaskId, limit: u32, error: impl Into<String>) {
            self.state.lock().failures.insert(
                task_id,
                ScriptedFailure { error: error.into(), platform_limit: Some(limit) },
            );
        }

        pub fn spawns(&self) -> Vec<SpawnCall> {
            self.state.lock().spawns.clone()
        }

        pub fn force_completes(&self) -> Vec<ForceCompleteCall> {
            self.state.lock().force_completes.clone()
        }
    }

    #[async_trait]
    impl ExecutorAdapter for MockAdapter {
        async fn spawn(
            &self,
            ctx: TaskContext,
            opts: SpawnOptions,
        ) -> Result<SpawnResult, ExecutorError> {
            let mut state = self.state.lock();
            state.spawns.push(SpawnCall {
                task_id: ctx.task_id.clone(),
                correlation_id: opts.correlation_id.clone(),
            });

            if let Some(scripted) = state.failures.remove(&ctx.task_id) {
                return Ok(match scripted.platform_limit {
                    Some(limit) => SpawnResult::platform_limited(limit, scripted.error),
                    None => SpawnResult::failed(scripted.error),
                });
            }

            state.next_session += 1;
            Ok(SpawnResult::ok(format!("mock-session-{}", state.next_session)))
        }

        async fn force_complete(&self, session_id: &str, reason: &str) -> Result<(), ExecutorError> {
            self.state
                .lock()
                .force_completes
                .push(ForceCompleteCall { session_id: session_id.to_string(), reason: reason.to_string() });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use mock::{ForceCompleteCall, MockAdapter, ScriptedFailure, SpawnCall};

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
