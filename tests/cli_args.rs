use agentdev::cli::{CliArgs, LogLevel};
use agentdev::logging::resolve_level;
use clap::Parser;

#[test]
fn defaults_point_at_agentdev_toml() {
    let args = CliArgs::try_parse_from(["agentdev"]).unwrap();
    assert_eq!(args.config, "agentdev.toml");
    assert!(!args.dry_run);
    assert!(!args.plan);
    assert!(args.rollback.is_none());
    assert!(args.log_level.is_none());
}

#[test]
fn flags_are_parsed() {
    let args = CliArgs::try_parse_from([
        "agentdev",
        "--config",
        "proj/agentdev.toml",
        "--tasks-json",
        "tasks.json",
        "--staging",
        "staged",
        "--dry-run",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(args.config, "proj/agentdev.toml");
    assert_eq!(args.tasks_json.as_deref(), Some("tasks.json"));
    assert_eq!(args.staging.as_deref(), Some("staged"));
    assert!(args.dry_run);
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
}

#[test]
fn plan_and_rollback_conflict() {
    let err = CliArgs::try_parse_from(["agentdev", "--plan", "--rollback", "T1"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
}

#[test]
fn cli_level_wins_over_env() {
    assert_eq!(
        resolve_level(Some(LogLevel::Warn), Some("trace")),
        tracing::Level::WARN
    );
}

#[test]
fn env_level_is_used_when_flag_absent() {
    assert_eq!(resolve_level(None, Some(" Debug ")), tracing::Level::DEBUG);
    assert_eq!(resolve_level(None, Some("warning")), tracing::Level::WARN);
}

#[test]
fn unknown_or_missing_env_falls_back_to_info() {
    assert_eq!(resolve_level(None, Some("loud")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}
