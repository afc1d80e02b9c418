mod common;

use agentdev::dag::{Scheduler, Task};
use agentdev::engine::{Pipeline, PipelineOptions};
use agentdev::files::FileManagerOptions;
use agentdev::types::TaskStatus;
use agentdev_test_utils::{ConfigFileBuilder, FakeGenerator, TaskConfigBuilder, with_timeout};
use common::{file, mock_manager, read};

fn chain() -> Scheduler {
    let cfg = ConfigFileBuilder::new()
        .with_task("setup", TaskConfigBuilder::new("project skeleton").effort(1.0).build())
        .with_task(
            "core",
            TaskConfigBuilder::new("core module").after("setup").effort(3.0).build(),
        )
        .with_task(
            "docs",
            TaskConfigBuilder::new("readme").after("setup").effort(1.0).build(),
        )
        .build();
    Scheduler::from_config(&cfg).unwrap()
}

#[tokio::test]
async fn runs_tasks_in_dependency_order_and_writes_files() {
    common::init_tracing();
    let (fs, files) = mock_manager(FileManagerOptions::default());
    let generator = FakeGenerator::new()
        .files("setup", vec![file("Cargo.toml", "[package]\n")])
        .files("core", vec![file("src/lib.rs", "pub fn core() {}\n")])
        .files("docs", vec![file("README.md", "# demo\n")]);
    let calls = generator.calls();

    let mut pipeline = Pipeline::new(chain(), files, generator, PipelineOptions::default());
    let report = with_timeout(pipeline.run()).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.success_rate, 1.0);
    assert_eq!(report.critical_path, vec!["setup", "core"]);
    assert_eq!(report.critical_path_effort, 4.0);
    assert_eq!(report.iterations, 2);

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls, vec!["setup", "core", "docs"]);

    assert_eq!(read(&fs, "src/lib.rs").as_deref(), Some("pub fn core() {}\n"));
    assert!(read(&fs, ".agentdev/run_report.json").is_some());
    assert_eq!(
        pipeline.files().history().records_for("README.md")[0].work_unit_id,
        "docs"
    );
}

#[tokio::test]
async fn failed_task_is_rolled_back_and_blocks_dependents() {
    let (fs, files) = mock_manager(FileManagerOptions::default());
    let generator = FakeGenerator::new()
        .files("setup", vec![file("Cargo.toml", "[package]\n")])
        .files(
            "core",
            vec![file("src/lib.rs", "pub fn core() {}\n"), file("../escape", "x")],
        );

    let mut scheduler = chain();
    scheduler
        .add_task(Task::new("ship", "release", ["core"]))
        .unwrap();

    let mut pipeline = Pipeline::new(scheduler, files, generator, PipelineOptions::default());
    let report = with_timeout(pipeline.run()).await.unwrap();

    let sched = pipeline.scheduler();
    assert_eq!(sched.task("core").unwrap().status(), TaskStatus::Failed);
    assert_eq!(sched.task("docs").unwrap().status(), TaskStatus::Completed);
    assert_eq!(sched.task("ship").unwrap().status(), TaskStatus::Blocked);

    // The partial batch was undone.
    assert_eq!(read(&fs, "src/lib.rs"), None);
    let core_run = &report.tasks["core"];
    assert!(core_run.rolled_back);
    assert_eq!(core_run.files_written, 1);
    assert_eq!(core_run.files_failed, 1);
    assert!(core_run.last_error.as_deref().unwrap_or("").contains("../escape"));

    assert_eq!(report.blocked, vec!["ship"]);
    assert_eq!(report.count(TaskStatus::Failed), 1);
    assert!(!report.is_complete());
}

#[tokio::test]
async fn generation_failures_are_retried() {
    let (_fs, files) = mock_manager(FileManagerOptions::default());
    let generator = FakeGenerator::new()
        .files("setup", vec![file("a.txt", "a")])
        .fail("core", "service unavailable")
        .files("core", vec![file("b.txt", "b")])
        .files("docs", vec![]);
    let calls = generator.calls();

    let options = PipelineOptions {
        max_retries: 1,
        ..PipelineOptions::default()
    };
    let mut pipeline = Pipeline::new(chain(), files, generator, options);
    let report = with_timeout(pipeline.run()).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.tasks["core"].attempts, 2);
    assert_eq!(
        calls.lock().unwrap().iter().filter(|c| *c == "core").count(),
        2
    );
}

#[tokio::test]
async fn without_retries_a_failure_is_final() {
    let (_fs, files) = mock_manager(FileManagerOptions::default());
    let generator = FakeGenerator::new().fail("setup", "boom");

    let mut pipeline = Pipeline::new(chain(), files, generator, PipelineOptions::default());
    let report = with_timeout(pipeline.run()).await.unwrap();

    assert_eq!(report.tasks["setup"].attempts, 1);
    assert_eq!(report.count(TaskStatus::Failed), 1);
    assert_eq!(report.count(TaskStatus::Blocked), 2);
    assert_eq!(report.success_rate, 0.0);
}

#[tokio::test]
async fn tasks_per_iteration_bounds_each_round() {
    let (_fs, files) = mock_manager(FileManagerOptions::default());
    let options = PipelineOptions {
        tasks_per_iteration: 1,
        ..PipelineOptions::default()
    };

    let mut pipeline = Pipeline::new(chain(), files, FakeGenerator::new(), options);
    let report = with_timeout(pipeline.run()).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.iterations, 3);
}

#[tokio::test]
async fn max_iterations_stops_the_loop() {
    let (_fs, files) = mock_manager(FileManagerOptions::default());
    let options = PipelineOptions {
        max_iterations: 1,
        ..PipelineOptions::default()
    };

    let mut pipeline = Pipeline::new(chain(), files, FakeGenerator::new(), options);
    let report = with_timeout(pipeline.run()).await.unwrap();

    assert_eq!(report.iterations, 1);
    assert_eq!(report.count(TaskStatus::Completed), 1);
    assert_eq!(report.count(TaskStatus::Pending), 2);
}

#[tokio::test]
async fn dry_run_leaves_disk_alone() {
    let (fs, files) = mock_manager(FileManagerOptions {
        dry_run: true,
        ..FileManagerOptions::default()
    });
    let before = fs.file_paths();
    let generator = FakeGenerator::new().files("setup", vec![file("a.txt", "a")]);

    let mut pipeline = Pipeline::new(chain(), files, generator, PipelineOptions::default());
    let report = with_timeout(pipeline.run()).await.unwrap();

    assert!(report.dry_run);
    assert!(report.is_complete());
    assert_eq!(fs.file_paths(), before);
}
