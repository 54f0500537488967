// SPDX-License-Identifier: MIT

//! Lease lifecycle: acquire/renew/release on top of the task
//! store, plus a background renewal loop that keeps an in-progress task's
//! lease alive for as long as its dispatch is actually running.

use std::sync::Arc;
use std::time::Duration;

use aof_core::{AgentId, Clock, TaskId, TaskStatus};
use aof_storage::{StoreError, TaskStore};
use tokio::task::JoinHandle;

/// Acquire/renew/release leases against a task store, and spawn the
/// background renewal loop a successful dispatch needs to keep its lease
/// alive for the life of the run.
pub struct LeaseManager<C: Clock> {
    store: Arc<dyn TaskStore>,
    clock: C,
    ttl: Duration,
}

impl<C: Clock> LeaseManager<C> {
    pub fn new(store: Arc<dyn TaskStore>, clock: C, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn acquire(&self, id: &TaskId, agent: &AgentId) -> Result<(), StoreError> {
        self.store.acquire_lease(id, agent, self.ttl)?;
        Ok(())
    }

    pub fn renew(&self, id: &TaskId) -> Result<(), StoreError> {
        self.store.renew_lease(id, self.ttl)?;
        Ok(())
    }

    pub fn release(&self, id: &TaskId) -> Result<(), StoreError> {
        self.store.release_lease(id)?;
        Ok(())
    }

    /// Every in-progress task whose lease has passed `expiresAt` as of now.
    pub fn expired(&self) -> Result<Vec<TaskId>, StoreError> {
        Ok(self.store.expired_leases(self.clock.now())?.into_iter().map(|t| t.id).collect())
    }

    /// Spawn a `tokio` task that renews `id`'s lease at roughly a third of
    /// the TTL, stopping as soon as the task leaves `in-progress` (or is
    /// gone) so a finished dispatch never renews a stale lease forever.
    pub fn spawn_renewal_loop(self: &Arc<Self>, id: TaskId) -> JoinHandle<()>
    where
        C: 'static,
    {
        let manager = Arc::clone(self);
        let interval = self.ttl / 3;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match manager.store.get(&id) {
                    Ok(Some(task)) if task.status == TaskStatus::InProgress && task.lease.is_some() => {
                        if let Err(err) = manager.renew(&id) {
                            tracing::warn!(task = %id, %err, "lease renewal failed");
                            break;
                        }
                    }
                    _ => break,
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
