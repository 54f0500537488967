// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aof-storage: the filesystem-native persistence layer — task store,
//! event log, delegation synchronizer, and project registry.

pub mod delegation;
pub mod event_log;
pub mod registry;
pub mod task_file;
pub mod task_store;

pub use delegation::{sync_delegation, write_handoff_artifacts, DelegationError, HandoffRequest};
pub use event_log::{EventLog, EventLogError, EventQuery};
pub use registry::{ProjectRecord, Registry, RegistryError};
pub use task_store::{
    CreateTaskInput, FilesystemTaskStore, ListFilter, StoreError, TaskLocks, TaskStore,
    TransitionHook, UpdateTaskPatch,
};
