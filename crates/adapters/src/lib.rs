// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aof-adapters: the executor and notification contracts —
//! the narrow interfaces through which the orchestrator core talks to the
//! out-of-process agent runner and to whatever sends notifications to a
//! human. Each trait ships a real adapter, a noop adapter, and (behind
//! `test-support`) a mock adapter for other crates' tests.

pub mod executor;
pub mod notify;

pub use executor::{
    classify_error, ExecutorAdapter, ExecutorError, FailureClass, NoopExecutorAdapter, SpawnOptions,
    SpawnResult, TaskContext,
};
pub use notify::{DesktopNotificationAdapter, NoopNotificationAdapter, NotificationAdapter, NotifyError};

#[cfg(any(test, feature = "test-support"))]
pub use executor::{ForceCompleteCall, MockAdapter, ScriptedFailure, SpawnCall};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{MockNotificationAdapter, NotifyCall};
