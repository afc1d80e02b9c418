use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::blocked_scan::{BlockedScan, MissingDependency};
use crate::dag::critical_path::critical_path;
use crate::dag::graph::{DependencyGraph, find_cycle};
use crate::dag::state_machine::StateMachine;
use crate::dag::task::{Task, TaskId};
use crate::errors::{AgentDevError, Result};
use crate::types::TaskStatus;

/// Dependency satisfaction of a single task.
enum DepState {
    /// Every dependency is `Completed`.
    Satisfied,
    /// At least one known dependency is not `Completed` yet.
    Waiting,
    /// Some dependency ids name no task at all.
    Missing(Vec<TaskId>),
}

/// Scheduler owns the task table and the dependency graph.
///
/// It is responsible for:
/// - registering tasks and their edges (rejecting duplicates, unknown
///   dependencies and cycles)
/// - answering which tasks are ready to run
/// - validating every status change through the [`StateMachine`]
/// - moving tasks in and out of `Blocked`
///
/// All methods are synchronous and take `&mut self` for mutation, so a single
/// owner (or a single mutex around the scheduler) gives every cross-task read
/// a consistent snapshot.
#[derive(Debug, Default)]
pub struct Scheduler {
    graph: DependencyGraph,
    tasks: BTreeMap<TaskId, Task>,
    machine: StateMachine,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a scheduler from the `[task.<id>]` sections of a validated
    /// [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let tasks = cfg
            .task
            .iter()
            .map(|(id, tc)| Task::from_config(id.clone(), tc))
            .collect();
        let mut scheduler = Self::new();
        scheduler.add_tasks(tasks)?;
        Ok(scheduler)
    }

    /// Register a single task.
    ///
    /// Every dependency must already be known: callers add tasks in
    /// dependency order, or use [`Scheduler::add_tasks`] for a whole batch.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        task.validate()?;

        if self.tasks.contains_key(task.id()) {
            return Err(AgentDevError::DuplicateTask(task.id().to_string()));
        }
        if let Some(dep) = task.dependencies().iter().find(|d| !self.tasks.contains_key(*d)) {
            return Err(AgentDevError::UnknownDependency {
                task: task.id().to_string(),
                dependency: dep.clone(),
            });
        }

        self.graph.add_node(task.id())?;
        for dep in task.dependencies() {
            self.graph.add_edge(dep, task.id())?;
        }

        debug!(
            task = %task.id(),
            deps = ?task.dependencies(),
            priority = task.priority(),
            "task registered"
        );
        self.tasks.insert(task.id().to_string(), task);
        Ok(())
    }

    /// Register a batch of tasks given in any order.
    ///
    /// The whole batch is validated first (duplicates, unknown ids, cycles);
    /// on error nothing is inserted.
    pub fn add_tasks(&mut self, tasks: Vec<Task>) -> Result<()> {
        let mut batch: BTreeMap<TaskId, Task> = BTreeMap::new();
        for task in tasks {
            task.validate()?;
            let id = task.id().to_string();
            if self.tasks.contains_key(&id) || batch.contains_key(&id) {
                return Err(AgentDevError::DuplicateTask(id));
            }
            batch.insert(id, task);
        }

        for task in batch.values() {
            for dep in task.dependencies() {
                if !batch.contains_key(dep) && !self.tasks.contains_key(dep) {
                    return Err(AgentDevError::UnknownDependency {
                        task: task.id().to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let edges = batch
            .values()
            .flat_map(|t| t.dependencies().iter().map(move |d| (d.as_str(), t.id())));
        if let Some(cycle) = find_cycle(batch.keys().map(|s| s.as_str()), edges) {
            return Err(AgentDevError::DagCycle(cycle));
        }

        // Insert dependencies-first so each `add_task` sees known deps.
        let count = batch.len();
        while !batch.is_empty() {
            let next: Vec<TaskId> = batch
                .values()
                .filter(|t| t.dependencies().iter().all(|d| self.tasks.contains_key(d)))
                .map(|t| t.id().to_string())
                .collect();
            if next.is_empty() {
                // Unreachable after the cycle check above.
                return Err(AgentDevError::DagCycle(batch.keys().cloned().collect()));
            }
            for id in next {
                if let Some(task) = batch.remove(&id) {
                    self.add_task(task)?;
                }
            }
        }

        info!(added = count, total = self.tasks.len(), "task batch registered");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// All tasks, ordered by id.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Tasks in `Pending` whose dependencies are all `Completed`.
    ///
    /// Ordered by priority (lowest value first), then id.
    pub fn get_ready_tasks(&self) -> Vec<Task> {
        let mut ready: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.status() == TaskStatus::Pending)
            .filter(|t| matches!(self.dep_state(t), DepState::Satisfied))
            .cloned()
            .collect();

        ready.sort_by(|a, b| a.priority().cmp(&b.priority()).then_with(|| a.id().cmp(b.id())));
        ready
    }

    /// Move task `id` to `status` if the state machine allows it.
    ///
    /// Returns `false` (leaving every field untouched) for unknown tasks and
    /// illegal transitions. Completing a task also releases any `Blocked`
    /// dependents whose dependencies are now all complete.
    pub fn update_status(&mut self, id: &str, status: TaskStatus) -> bool {
        let Some(task) = self.tasks.get_mut(id) else {
            warn!(task = %id, to = %status, "status update for unknown task; ignoring");
            return false;
        };

        let from = task.status();
        if !self.machine.can_transition(from, status) {
            debug!(task = %id, %from, to = %status, "illegal status transition rejected");
            return false;
        }

        task.enter_status(status, Utc::now());
        info!(task = %id, %from, to = %status, "task status updated");

        if status == TaskStatus::Completed {
            self.release_dependents(id);
        }
        true
    }

    /// Re-evaluate every `Pending` and `Blocked` task.
    ///
    /// - Some dependency not `Completed` -> `Blocked`.
    /// - All dependencies `Completed` -> `Pending`.
    /// - Dependency ids naming no task keep the task `Blocked` for good and
    ///   are reported in [`BlockedScan::missing`]. `add_task` and `add_tasks`
    ///   reject unknown ids and tasks are never removed, so a table built
    ///   through them never produces such entries.
    pub fn recompute_blocked(&mut self) -> BlockedScan {
        let mut scan = BlockedScan::default();
        let now = Utc::now();

        let candidates: Vec<(TaskId, TaskStatus, DepState)> = self
            .tasks
            .values()
            .filter(|t| matches!(t.status(), TaskStatus::Pending | TaskStatus::Blocked))
            .map(|t| (t.id().to_string(), t.status(), self.dep_state(t)))
            .collect();

        for (id, status, deps) in candidates {
            let target = match deps {
                DepState::Satisfied => TaskStatus::Pending,
                DepState::Waiting => TaskStatus::Blocked,
                DepState::Missing(missing) => {
                    for dependency in missing {
                        warn!(
                            task = %id,
                            dep = %dependency,
                            "dependency missing from task table; task stays blocked"
                        );
                        scan.missing.push(MissingDependency {
                            task: id.clone(),
                            dependency,
                        });
                    }
                    TaskStatus::Blocked
                }
            };

            if target == status {
                continue;
            }
            if let Some(task) = self.tasks.get_mut(&id) {
                task.enter_status(target, now);
            }
            match target {
                TaskStatus::Blocked => {
                    debug!(task = %id, "waiting on dependencies; marked Blocked");
                    scan.newly_blocked.push(id);
                }
                _ => {
                    debug!(task = %id, "dependencies complete; marked Pending");
                    scan.newly_unblocked.push(id);
                }
            }
        }

        if scan.changed() {
            info!(
                blocked = scan.newly_blocked.len(),
                unblocked = scan.newly_unblocked.len(),
                missing = scan.missing.len(),
                "blocked scan changed task statuses"
            );
        }
        scan
    }

    /// The dependency chain with the maximum summed effort, root first.
    pub fn critical_path(&self) -> Vec<Task> {
        critical_path(&self.graph, &self.tasks)
            .iter()
            .filter_map(|id| self.tasks.get(id).cloned())
            .collect()
    }

    /// Direct dependencies of `id` as tasks.
    pub fn dependencies_of(&self, id: &str) -> Vec<&Task> {
        self.graph
            .dependencies_of(id)
            .iter()
            .filter_map(|dep| self.tasks.get(dep))
            .collect()
    }

    /// Direct dependents of `id` as tasks.
    pub fn dependents_of(&self, id: &str) -> Vec<&Task> {
        self.graph
            .dependents_of(id)
            .iter()
            .filter_map(|dep| self.tasks.get(dep))
            .collect()
    }

    /// Not-yet-completed tasks that transitively wait on `id`.
    pub fn blocked_downstream_of(&self, id: &str) -> BTreeSet<TaskId> {
        self.graph
            .descendants(id)
            .into_iter()
            .filter(|d| {
                self.tasks
                    .get(d)
                    .is_some_and(|t| t.status() != TaskStatus::Completed)
            })
            .collect()
    }

    /// Number of tasks per status; every status is present.
    pub fn status_counts(&self) -> BTreeMap<TaskStatus, usize> {
        let mut counts: BTreeMap<TaskStatus, usize> =
            TaskStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for task in self.tasks.values() {
            *counts.entry(task.status()).or_default() += 1;
        }
        counts
    }

    /// Whether all dependencies of `id` are `Completed`. `None` for unknown
    /// tasks.
    pub fn deps_satisfied(&self, id: &str) -> Option<bool> {
        let task = self.tasks.get(id)?;
        Some(matches!(self.dep_state(task), DepState::Satisfied))
    }

    fn dep_state(&self, task: &Task) -> DepState {
        let mut missing = Vec::new();
        let mut waiting = false;

        for dep_id in task.dependencies() {
            match self.tasks.get(dep_id) {
                Some(dep) if dep.status() == TaskStatus::Completed => {}
                Some(_) => waiting = true,
                None => missing.push(dep_id.clone()),
            }
        }

        if !missing.is_empty() {
            DepState::Missing(missing)
        } else if waiting {
            DepState::Waiting
        } else {
            DepState::Satisfied
        }
    }

    /// Move `Blocked` direct dependents of a completed task back to `Pending`
    /// once nothing else holds them.
    fn release_dependents(&mut self, completed: &str) {
        let now = Utc::now();
        let released: Vec<TaskId> = self
            .graph
            .dependents_of(completed)
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| t.status() == TaskStatus::Blocked)
            .filter(|t| matches!(self.dep_state(t), DepState::Satisfied))
            .map(|t| t.id().to_string())
            .collect();

        for id in released {
            if let Some(task) = self.tasks.get_mut(&id) {
                task.enter_status(TaskStatus::Pending, now);
                debug!(task = %id, upstream = %completed, "dependencies complete; unblocked");
            }
        }
    }
}
