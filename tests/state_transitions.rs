use agentdev::dag::{Scheduler, StateMachine, Task};
use agentdev::types::TaskStatus;
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

#[test]
fn transition_table() {
    use TaskStatus::*;
    let sm = StateMachine::new();

    let legal = [
        (Pending, InProgress),
        (InProgress, Completed),
        (InProgress, Failed),
        (Failed, Pending),
        (Failed, InProgress),
    ];
    for from in TaskStatus::ALL {
        for to in TaskStatus::ALL {
            assert_eq!(
                sm.can_transition(from, to),
                legal.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
    assert!(sm.is_terminal(Completed));
    assert!(!sm.is_terminal(Failed));
}

#[test]
fn timestamps_are_set_once_by_entering_transition() {
    let mut scheduler = Scheduler::new();
    scheduler
        .add_task(Task::new("T", "", Vec::<String>::new()))
        .unwrap();

    let created = scheduler.task("T").unwrap().timestamps().clone();
    assert!(created.started_at.is_none());
    assert!(created.completed_at.is_none());

    assert!(scheduler.update_status("T", TaskStatus::InProgress));
    let first_start = scheduler.task("T").unwrap().timestamps().started_at;
    assert!(first_start.is_some());

    assert!(scheduler.update_status("T", TaskStatus::Failed));
    assert!(scheduler.update_status("T", TaskStatus::InProgress));
    assert_eq!(scheduler.task("T").unwrap().timestamps().started_at, first_start);

    assert!(scheduler.update_status("T", TaskStatus::Completed));
    let ts = scheduler.task("T").unwrap().timestamps().clone();
    assert!(ts.completed_at.is_some());
    assert!(ts.updated_at >= created.updated_at);
    assert_eq!(ts.created_at, created.created_at);
}

#[test]
fn unknown_task_update_returns_false() {
    let mut scheduler = Scheduler::new();
    assert!(!scheduler.update_status("ghost", TaskStatus::InProgress));
}

/// Drive a fresh task into `status` through legal moves.
fn drive_to(scheduler: &mut Scheduler, status: TaskStatus) {
    use TaskStatus::*;
    let path: &[TaskStatus] = match status {
        Pending => &[],
        InProgress => &[InProgress],
        Completed => &[InProgress, Completed],
        Failed => &[InProgress, Failed],
        Blocked => &[],
    };
    for step in path {
        assert!(scheduler.update_status("T", *step));
    }
}

proptest! {
    #[test]
    fn rejected_updates_change_nothing(from in status_strategy(), to in status_strategy()) {
        prop_assume!(from != TaskStatus::Blocked);
        prop_assume!(!StateMachine::new().can_transition(from, to));

        let mut scheduler = Scheduler::new();
        scheduler.add_task(Task::new("T", "", Vec::<String>::new())).unwrap();
        drive_to(&mut scheduler, from);

        let before = scheduler.task("T").unwrap().clone();
        prop_assert!(!scheduler.update_status("T", to));
        let after = scheduler.task("T").unwrap();

        prop_assert_eq!(after.status(), before.status());
        prop_assert_eq!(after.timestamps(), before.timestamps());
    }
}
