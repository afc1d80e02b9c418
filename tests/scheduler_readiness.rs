mod common;

use std::collections::BTreeSet;

use agentdev::dag::{Scheduler, Task};
use agentdev::errors::AgentDevError;
use agentdev::types::TaskStatus;

fn ready_ids(scheduler: &Scheduler) -> BTreeSet<String> {
    scheduler
        .get_ready_tasks()
        .iter()
        .map(|t| t.id().to_string())
        .collect()
}

fn ids(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn complete(scheduler: &mut Scheduler, id: &str) {
    assert!(scheduler.update_status(id, TaskStatus::InProgress));
    assert!(scheduler.update_status(id, TaskStatus::Completed));
}

fn fan_out() -> Scheduler {
    let mut scheduler = Scheduler::new();
    scheduler.add_task(Task::new("A", "root", Vec::<String>::new())).unwrap();
    scheduler.add_task(Task::new("B", "left", ["A"])).unwrap();
    scheduler.add_task(Task::new("C", "right", ["A"])).unwrap();
    scheduler
}

#[test]
fn completing_root_releases_both_children() {
    common::init_tracing();
    let mut scheduler = fan_out();

    assert_eq!(ready_ids(&scheduler), ids(&["A"]));

    complete(&mut scheduler, "A");

    assert_eq!(ready_ids(&scheduler), ids(&["B", "C"]));
}

#[test]
fn ready_tasks_sorted_by_priority_then_id() {
    let mut scheduler = Scheduler::new();
    scheduler
        .add_task(Task::new("b", "", Vec::<String>::new()).with_priority(2))
        .unwrap();
    scheduler
        .add_task(Task::new("c", "", Vec::<String>::new()).with_priority(1))
        .unwrap();
    scheduler
        .add_task(Task::new("a", "", Vec::<String>::new()).with_priority(2))
        .unwrap();

    let order: Vec<String> = scheduler
        .get_ready_tasks()
        .iter()
        .map(|t| t.id().to_string())
        .collect();
    assert_eq!(order, vec!["c", "a", "b"]);
}

#[test]
fn in_progress_and_failed_tasks_are_not_ready() {
    let mut scheduler = fan_out();
    assert!(scheduler.update_status("A", TaskStatus::InProgress));
    assert!(ready_ids(&scheduler).is_empty());

    assert!(scheduler.update_status("A", TaskStatus::Failed));
    assert!(ready_ids(&scheduler).is_empty());

    // Failed -> Pending makes it eligible again.
    assert!(scheduler.update_status("A", TaskStatus::Pending));
    assert_eq!(ready_ids(&scheduler), ids(&["A"]));
}

#[test]
fn add_task_rejects_duplicates_and_unknown_dependencies() {
    let mut scheduler = fan_out();

    let err = scheduler
        .add_task(Task::new("A", "again", Vec::<String>::new()))
        .unwrap_err();
    assert!(matches!(err, AgentDevError::DuplicateTask(id) if id == "A"));

    let err = scheduler.add_task(Task::new("D", "", ["Z"])).unwrap_err();
    match err {
        AgentDevError::UnknownDependency { task, dependency } => {
            assert_eq!(task, "D");
            assert_eq!(dependency, "Z");
        }
        other => panic!("expected UnknownDependency, got {other:?}"),
    }
    assert!(scheduler.task("D").is_none());
    assert_eq!(scheduler.len(), 3);
}

#[test]
fn add_task_rejects_self_dependency() {
    let mut scheduler = Scheduler::new();
    let err = scheduler.add_task(Task::new("A", "", ["A"])).unwrap_err();
    assert!(matches!(err, AgentDevError::SelfDependency(id) if id == "A"));
}

#[test]
fn add_tasks_accepts_any_order() {
    let mut scheduler = Scheduler::new();
    scheduler
        .add_tasks(vec![
            Task::new("C", "", ["B"]),
            Task::new("B", "", ["A"]),
            Task::new("A", "", Vec::<String>::new()),
        ])
        .unwrap();

    assert_eq!(scheduler.len(), 3);
    assert_eq!(ready_ids(&scheduler), ids(&["A"]));
    let deps: Vec<&str> = scheduler.dependencies_of("C").iter().map(|t| t.id()).collect();
    assert_eq!(deps, vec!["B"]);
}

#[test]
fn add_tasks_reports_cycle_members_and_inserts_nothing() {
    let mut scheduler = Scheduler::new();
    let err = scheduler
        .add_tasks(vec![
            Task::new("root", "", Vec::<String>::new()),
            Task::new("x", "", ["root", "z"]),
            Task::new("y", "", ["x"]),
            Task::new("z", "", ["y"]),
        ])
        .unwrap_err();

    match err {
        AgentDevError::DagCycle(members) => assert_eq!(members, vec!["x", "y", "z"]),
        other => panic!("expected DagCycle, got {other:?}"),
    }
    assert!(scheduler.is_empty());
}

#[test]
fn failed_dependency_blocks_dependents_until_completed() {
    let mut scheduler = fan_out();
    assert!(scheduler.update_status("A", TaskStatus::InProgress));
    assert!(scheduler.update_status("A", TaskStatus::Failed));

    let scan = scheduler.recompute_blocked();
    assert_eq!(scan.newly_blocked, vec!["B", "C"]);
    assert!(scan.missing.is_empty());
    assert_eq!(scheduler.task("B").unwrap().status(), TaskStatus::Blocked);

    // Blocked is outside the transition table.
    assert!(!scheduler.update_status("B", TaskStatus::InProgress));

    // Retry A; completion releases the blocked dependents.
    assert!(scheduler.update_status("A", TaskStatus::InProgress));
    assert!(scheduler.update_status("A", TaskStatus::Completed));
    assert_eq!(scheduler.task("B").unwrap().status(), TaskStatus::Pending);
    assert_eq!(ready_ids(&scheduler), ids(&["B", "C"]));

    // Nothing left to change.
    assert!(!scheduler.recompute_blocked().changed());
}

#[test]
fn recompute_blocked_unblocks_when_dependencies_complete() {
    let mut scheduler = fan_out();
    scheduler.recompute_blocked();
    assert_eq!(scheduler.task("B").unwrap().status(), TaskStatus::Blocked);

    complete(&mut scheduler, "A");
    // Released by completion already; a scan finds nothing new.
    let scan = scheduler.recompute_blocked();
    assert!(scan.newly_unblocked.is_empty());
    assert_eq!(ready_ids(&scheduler), ids(&["B", "C"]));
}

#[test]
fn critical_path_follows_maximum_effort() {
    let mut scheduler = Scheduler::new();
    scheduler
        .add_tasks(vec![
            Task::new("A", "", Vec::<String>::new()).with_estimated_effort(1.0),
            Task::new("B", "", ["A"]).with_estimated_effort(5.0),
            Task::new("C", "", ["A"]).with_estimated_effort(2.0),
            Task::new("D", "", ["B", "C"]).with_estimated_effort(1.0),
            Task::new("E", "", ["C"]).with_estimated_effort(3.0),
        ])
        .unwrap();

    let path: Vec<String> = scheduler
        .critical_path()
        .iter()
        .map(|t| t.id().to_string())
        .collect();
    assert_eq!(path, vec!["A", "B", "D"]);
}

#[test]
fn critical_path_ties_prefer_earliest_id() {
    let mut scheduler = Scheduler::new();
    scheduler
        .add_tasks(vec![
            Task::new("a", "", Vec::<String>::new()).with_estimated_effort(2.0),
            Task::new("b", "", Vec::<String>::new()).with_estimated_effort(2.0),
        ])
        .unwrap();

    let path: Vec<String> = scheduler
        .critical_path()
        .iter()
        .map(|t| t.id().to_string())
        .collect();
    assert_eq!(path, vec!["a"]);
}

#[test]
fn critical_path_of_empty_scheduler_is_empty() {
    assert!(Scheduler::new().critical_path().is_empty());
}

#[test]
fn downstream_and_status_counts() {
    let mut scheduler = fan_out();
    scheduler.add_task(Task::new("D", "", ["B"])).unwrap();

    assert_eq!(scheduler.blocked_downstream_of("A"), ids(&["B", "C", "D"]));
    assert_eq!(scheduler.blocked_downstream_of("C"), BTreeSet::new());

    complete(&mut scheduler, "A");
    let counts = scheduler.status_counts();
    assert_eq!(counts[&TaskStatus::Completed], 1);
    assert_eq!(counts[&TaskStatus::Pending], 3);
    assert_eq!(counts[&TaskStatus::Failed], 0);

    assert_eq!(scheduler.deps_satisfied("B"), Some(true));
    assert_eq!(scheduler.deps_satisfied("D"), Some(false));
    assert_eq!(scheduler.deps_satisfied("nope"), None);
}

#[test]
fn graph_queries() {
    let mut scheduler = fan_out();
    scheduler.add_task(Task::new("D", "", ["B", "C"])).unwrap();
    let graph = scheduler.graph();

    assert_eq!(graph.roots(), vec!["A"]);
    assert_eq!(graph.ancestors("D"), ids(&["A", "B", "C"]));
    assert_eq!(graph.descendants("B"), ids(&["D"]));
    assert_eq!(graph.dependents_of("A"), &ids(&["B", "C"]));

    let order = graph.topological_order().unwrap();
    let pos = |id: &str| order.iter().position(|t| t == id).unwrap();
    assert_eq!(order.len(), 4);
    assert!(pos("A") < pos("B") && pos("A") < pos("C"));
    assert!(pos("B") < pos("D") && pos("C") < pos("D"));
}

#[test]
fn missing_dependencies_surface_as_configuration_errors() {
    use agentdev::dag::{BlockedScan, MissingDependency};

    let clean = BlockedScan::default();
    assert!(clean.into_result().is_ok());

    let scan = BlockedScan {
        missing: vec![MissingDependency {
            task: "deploy".to_string(),
            dependency: "build".to_string(),
        }],
        ..BlockedScan::default()
    };
    let err = scan.into_result().unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(
        err,
        AgentDevError::UnknownDependency { ref task, ref dependency }
            if task == "deploy" && dependency == "build"
    ));
}
