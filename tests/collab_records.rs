use std::sync::Arc;

use agentdev::collab::{
    CommandGenerator, FileRecord, Generator, StagedGenerator, TaskRecord, parse_file_records,
    parse_task_records,
};
use agentdev::dag::{Scheduler, Task};
use agentdev::fs::mock::MockFileSystem;
use agentdev::types::TaskKind;
use agentdev_test_utils::TaskRecordBuilder;

#[test]
fn parses_bare_task_array_with_defaults() {
    let raw = r#"[
        {"id": "TASK-1", "description": "setup", "type": "setup"},
        {"id": "TASK-2", "description": "core", "dependencies": ["TASK-1"],
         "priority": 2, "estimated_effort": 3.5, "metadata": {"hint": 1}}
    ]"#;

    let records = parse_task_records(raw).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, TaskKind::Setup);
    assert_eq!(records[0].priority, 1);
    assert_eq!(records[1].dependencies, vec!["TASK-1"]);
    assert_eq!(records[1].metadata["hint"], 1);
}

#[test]
fn parses_fenced_file_records() {
    let raw = "Here are the files:\n```json\n[{\"path\": \"src/main.rs\", \"content\": \"fn main() {}\\n\"}]\n```\nDone.";
    let files = parse_file_records(raw).unwrap();
    assert_eq!(files, vec![FileRecord::new("src/main.rs", "fn main() {}\n")]);
}

#[test]
fn parse_failure_keeps_raw_payload() {
    let raw = "I could not produce tasks, sorry.";
    let failure = parse_task_records(raw).unwrap_err();
    assert_eq!(failure.raw, raw);
    assert!(!failure.error.is_empty());

    // A record missing its id is a failure, not a default.
    let failure = parse_task_records(r#"[{"description": "no id"}]"#).unwrap_err();
    assert!(failure.error.contains("id"));
}

#[test]
fn records_become_schedulable_tasks() {
    let records = vec![
        TaskRecordBuilder::new("b").after("a").effort(2.0).build(),
        TaskRecordBuilder::new("a")
            .metadata("model_hint", serde_json::json!("fast"))
            .build(),
    ];

    let mut scheduler = Scheduler::new();
    scheduler
        .add_tasks(records.into_iter().map(Task::from).collect())
        .unwrap();

    let a = scheduler.task("a").unwrap();
    assert_eq!(a.metadata()["model_hint"], "fast");
    assert_eq!(scheduler.task("b").unwrap().estimated_effort(), 2.0);

    let back = TaskRecord::from(scheduler.task("b").unwrap());
    assert_eq!(back.dependencies, vec!["a"]);
}

#[tokio::test]
async fn staged_generator_reads_task_directory() {
    let fs = MockFileSystem::new();
    fs.add_file("/stage/T1/README.md", "# hi\n");
    fs.add_file("/stage/T1/src/lib.rs", "pub fn f() {}\n");
    fs.add_file("/stage/T2/other.txt", "no");

    let mut generator = StagedGenerator::new(Arc::new(fs), "/stage");
    let task = Task::new("T1", "", Vec::<String>::new());
    let files = generator.generate(&task).await.unwrap();

    assert_eq!(
        files,
        vec![
            FileRecord::new("README.md", "# hi\n"),
            FileRecord::new("src/lib.rs", "pub fn f() {}\n"),
        ]
    );

    let missing = Task::new("T9", "", Vec::<String>::new());
    assert!(generator.generate(&missing).await.unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn command_generator_exchanges_json() {
    // Echo the task id back as a file.
    let mut generator = CommandGenerator::new(
        r#"cat > /dev/null; printf '[{"path": "%s.txt", "content": "ok"}]' "$AGENTDEV_TASK_ID""#,
    );
    let task = Task::new("T7", "", Vec::<String>::new());

    let files = generator.generate(&task).await.unwrap();
    assert_eq!(files, vec![FileRecord::new("T7.txt", "ok")]);
}

#[cfg(unix)]
#[tokio::test]
async fn command_generator_reports_exit_status_and_bad_output() {
    let task = Task::new("T1", "", Vec::<String>::new());

    let mut failing = CommandGenerator::new("exit 3");
    let err = failing.generate(&task).await.unwrap_err();
    assert!(err.to_string().contains("exited with code 3"));

    let mut garbage = CommandGenerator::new("echo not json");
    let err = garbage.generate(&task).await.unwrap_err();
    assert!(err.to_string().contains("could not parse"));
}
