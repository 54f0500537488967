// SPDX-License-Identifier: MIT

//! `aof task` — task CRUD against the store directly. The CLI is an
//! external collaborator of the core, not a client of the daemon, for
//! this surface.

use anyhow::{anyhow, Context, Result};
use aof_core::{AgentId, Priority, Routing, TaskId, TaskStatus};
use aof_storage::{CreateTaskInput, ListFilter, TaskStore};
use clap::{Args, Subcommand};

use crate::output::{format_or_json, handle_list, OutputFormat};

#[derive(Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create a task in `backlog`
    Create {
        title: String,
        #[arg(long, default_value = "_inbox")]
        project: String,
        #[arg(long)]
        body: Option<String>,
        /// low | normal | high | critical
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
        #[arg(long, default_value = "cli")]
        created_by: String,
    },
    /// List tasks, optionally filtered by status or assigned agent
    List {
        #[arg(long, default_value = "_inbox")]
        project: String,
        /// backlog | ready | in-progress | blocked | review | done | cancelled | deadletter
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        agent: Option<String>,
    },
    /// Show one task by id (or unique id prefix)
    Show {
        id: String,
        #[arg(long, default_value = "_inbox")]
        project: String,
    },
    /// Move a task to a new status
    Transition {
        id: String,
        to: String,
        #[arg(long, default_value = "_inbox")]
        project: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        agent: Option<String>,
    },
    /// Cancel a task from any non-terminal state
    Cancel {
        id: String,
        #[arg(long, default_value = "_inbox")]
        project: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Block a task from any non-terminal state
    Block {
        id: String,
        reason: String,
        #[arg(long, default_value = "_inbox")]
        project: String,
    },
    /// Return a blocked task to `ready`
    Unblock {
        id: String,
        #[arg(long, default_value = "_inbox")]
        project: String,
    },
}

pub fn run(args: TaskArgs, data_dir: &std::path::Path, format: OutputFormat) -> Result<()> {
    match args.command {
        TaskCommand::Create {
            title,
            project,
            body,
            priority,
            agent,
            parent,
            depends_on,
            created_by,
        } => {
            let store = crate::store::open_store(data_dir, &project)?;
            let priority = priority.map(|p| parse_priority(&p)).transpose()?;
            let routing = agent.map(|a| Routing { agent: Some(AgentId::from(a)), ..Default::default() });
            let task = store.create(CreateTaskInput {
                title,
                body,
                priority,
                routing,
                parent_id: parent.map(TaskId::from_string),
                depends_on: depends_on.into_iter().map(TaskId::from_string).collect(),
                metadata: Default::default(),
                created_by,
            })?;
            format_or_json(format, &task, || println!("created {} ({})", task.id, task.status))
        }
        TaskCommand::List { project, status, agent } => {
            let store = crate::store::open_store(data_dir, &project)?;
            let status = status.map(|s| parse_status(&s)).transpose()?;
            let agent = agent.map(AgentId::from);
            let tasks = store.list(&ListFilter { status, agent })?;
            handle_list(format, &tasks, "No tasks found", |tasks| {
                for task in tasks {
                    println!(
                        "{}  {:<11}  {:<8}  {}",
                        task.id, task.status, task.priority, task.title
                    );
                }
            })
        }
        TaskCommand::Show { id, project } => {
            let store = crate::store::open_store(data_dir, &project)?;
            let task = find(&store, &id)?;
            format_or_json(format, &task, || {
                println!("{}", task.id);
                println!("  title:    {}", task.title);
                println!("  status:   {}", task.status);
                println!("  priority: {}", task.priority);
                if let Some(lease) = &task.lease {
                    println!("  lease:    {} (expires {})", lease.agent, lease.expires_at);
                }
                if !task.depends_on.is_empty() {
                    let deps: Vec<String> = task.depends_on.iter().map(|d| d.to_string()).collect();
                    println!("  depends:  {}", deps.join(", "));
                }
            })
        }
        TaskCommand::Transition { id, to, project, reason, agent } => {
            let store = crate::store::open_store(data_dir, &project)?;
            let task_id = resolve_id(&store, &id)?;
            let to = parse_status(&to)?;
            let agent = agent.map(AgentId::from);
            let task = store.transition(&task_id, to, reason.as_deref(), agent.as_ref())?;
            format_or_json(format, &task, || println!("{} -> {}", task.id, task.status))
        }
        TaskCommand::Cancel { id, project, reason } => {
            let store = crate::store::open_store(data_dir, &project)?;
            let task_id = resolve_id(&store, &id)?;
            let task = store.cancel(&task_id, reason.as_deref())?;
            format_or_json(format, &task, || println!("{} cancelled", task.id))
        }
        TaskCommand::Block { id, reason, project } => {
            let store = crate::store::open_store(data_dir, &project)?;
            let task_id = resolve_id(&store, &id)?;
            let task = store.block(&task_id, &reason)?;
            format_or_json(format, &task, || println!("{} blocked: {}", task.id, reason))
        }
        TaskCommand::Unblock { id, project } => {
            let store = crate::store::open_store(data_dir, &project)?;
            let task_id = resolve_id(&store, &id)?;
            let task = store.unblock(&task_id)?;
            format_or_json(format, &task, || println!("{} unblocked", task.id))
        }
    }
}

fn find(store: &impl TaskStore, id: &str) -> Result<aof_core::Task> {
    store
        .get_by_prefix(id)
        .with_context(|| format!("looking up task {id}"))?
        .ok_or_else(|| anyhow!("no task matches id or prefix {id:?}"))
}

fn resolve_id(store: &impl TaskStore, id: &str) -> Result<TaskId> {
    Ok(find(store, id)?.id)
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    TaskStatus::from_dir_name(raw).ok_or_else(|| anyhow!("unknown status {raw:?}"))
}

fn parse_priority(raw: &str) -> Result<Priority> {
    Ok(match raw {
        "low" => Priority::Low,
        "normal" => Priority::Normal,
        "high" => Priority::High,
        "critical" => Priority::Critical,
        other => return Err(anyhow!("unknown priority {other:?}")),
    })
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
