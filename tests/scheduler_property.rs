use std::collections::{BTreeSet, HashSet};

use agentdev::config::ConfigFile;
use agentdev::dag::Scheduler;
use agentdev::types::TaskStatus;
use agentdev_test_utils::{ConfigFileBuilder, TaskConfigBuilder};
use proptest::prelude::*;

// Strategy to generate a valid DAG configuration.
// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_config_strategy(max_tasks: usize) -> impl Strategy<Value = ConfigFile> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );
        let effort_strat = proptest::collection::vec(0u8..10, num_tasks);

        (deps_strat, effort_strat).prop_map(move |(raw_deps, efforts)| {
            let mut builder = ConfigFileBuilder::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let name = format!("task_{i:02}");
                let mut task_builder =
                    TaskConfigBuilder::new(&format!("work for {name}")).effort(efforts[i] as f64);

                let valid_deps: HashSet<usize> = potential_deps
                    .into_iter()
                    .filter(|_| i > 0)
                    .map(|d| d % i)
                    .collect();
                for dep_idx in valid_deps {
                    task_builder = task_builder.after(&format!("task_{dep_idx:02}"));
                }
                builder = builder.with_task(&name, task_builder.build());
            }
            builder.build()
        })
    })
}

proptest! {
    #[test]
    fn ready_tasks_never_have_incomplete_dependencies(
        cfg in dag_config_strategy(12),
        picks in proptest::collection::vec(any::<usize>(), 1..40),
    ) {
        let mut scheduler = Scheduler::from_config(&cfg).unwrap();
        let total = scheduler.len();
        let mut completed: BTreeSet<String> = BTreeSet::new();
        let mut pick = picks.into_iter().cycle();

        // Bounded: every step completes one task.
        for _ in 0..total {
            let ready = scheduler.get_ready_tasks();
            for task in &ready {
                prop_assert_eq!(task.status(), TaskStatus::Pending);
                for dep in task.dependencies() {
                    prop_assert!(completed.contains(dep), "{} ready before {}", task.id(), dep);
                }
            }

            // Every pending task whose deps are all complete is offered.
            let expected: BTreeSet<&str> = scheduler
                .tasks()
                .filter(|t| t.status() == TaskStatus::Pending)
                .filter(|t| t.dependencies().iter().all(|d| completed.contains(d)))
                .map(|t| t.id())
                .collect();
            let offered: BTreeSet<&str> = ready.iter().map(|t| t.id()).collect();
            prop_assert_eq!(&offered, &expected);

            prop_assert!(!ready.is_empty(), "a DAG always has a ready task until done");
            let chosen = ready[pick.next().unwrap_or(0) % ready.len()].id().to_string();
            prop_assert!(scheduler.update_status(&chosen, TaskStatus::InProgress));
            prop_assert!(scheduler.update_status(&chosen, TaskStatus::Completed));
            completed.insert(chosen);
        }

        prop_assert_eq!(completed.len(), total);
        prop_assert!(scheduler.get_ready_tasks().is_empty());
    }

    #[test]
    fn critical_path_is_a_dependency_chain(cfg in dag_config_strategy(12)) {
        let scheduler = Scheduler::from_config(&cfg).unwrap();
        let path = scheduler.critical_path();
        prop_assert!(!path.is_empty());

        prop_assert!(path[0].dependencies().is_empty());
        for pair in path.windows(2) {
            prop_assert!(pair[1].dependencies().contains(pair[0].id()));
        }

        let effort: f64 = path.iter().map(|t| t.estimated_effort()).sum();
        let max_single = scheduler
            .tasks()
            .map(|t| t.estimated_effort())
            .fold(0.0, f64::max);
        prop_assert!(effort >= max_single);
    }
}
