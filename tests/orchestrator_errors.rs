// tests/orchestrator_errors.rs

use std::error::Error;

use buildpipe::errors::EngineError;
use buildpipe::pipeline::{series, task};
use buildpipe_test_utils::actions::RunLog;
use buildpipe_test_utils::builders::{failing_task, mock_orchestrator, recording_task};
use buildpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn running_an_unknown_name_fails_before_anything_executes() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(recording_task("styles", &log))?;

    let err = with_timeout(orchestrator.run("stlyes"))
        .await
        .expect_err("misspelled target must fail");

    assert_eq!(err.task, "stlyes");
    assert!(matches!(*err.source, EngineError::UnknownTask(_)));
    assert!(log.is_empty());
    Ok(())
}

#[tokio::test]
async fn pipeline_referencing_an_unregistered_task_fails_at_link_time() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(recording_task("styles", &log))?;
    orchestrator.define_pipeline("site", series([task("styles"), task("missing")]))?;

    let err = with_timeout(orchestrator.run("site"))
        .await
        .expect_err("unknown leaf must fail the run");

    assert_eq!(err.task, "missing");
    assert!(matches!(*err.source, EngineError::UnknownTask(_)));
    // Link-phase failures report before any action runs, even ones that
    // would have been reachable.
    assert!(log.is_empty());
    Ok(())
}

#[tokio::test]
async fn dependency_cycle_is_reported_before_any_action_runs() -> TestResult {
    init_tracing();

    // The registry accepts forward references, so a cycle only surfaces
    // when a run is linked.
    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(recording_task("a", &log).with_depends_on(["b"]))?;
    orchestrator.register_task(recording_task("b", &log).with_depends_on(["a"]))?;

    let err = with_timeout(orchestrator.run("a"))
        .await
        .expect_err("cyclic dependencies must fail");

    assert!(matches!(*err.source, EngineError::Cycle(_)));
    assert!(log.is_empty());
    Ok(())
}

#[tokio::test]
async fn self_dependency_is_a_cycle() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(recording_task("selfie", &log).with_depends_on(["selfie"]))?;

    let err = with_timeout(orchestrator.run("selfie"))
        .await
        .expect_err("self-dependency must fail");

    assert!(matches!(*err.source, EngineError::Cycle(ref name) if name == "selfie"));
    assert!(log.is_empty());
    Ok(())
}

#[tokio::test]
async fn transform_failure_names_the_task_and_keeps_the_cause() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(failing_task("minify", &log))?;

    let err = with_timeout(orchestrator.run("minify"))
        .await
        .expect_err("the failing action must fail the run");

    assert_eq!(err.task, "minify");
    match &*err.source {
        EngineError::Transform { task, source } => {
            assert_eq!(task, "minify");
            assert!(source.to_string().contains("simulated failure"));
        }
        other => panic!("expected Transform error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn failures_are_not_retried() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(failing_task("flaky", &log))?;

    let _ = with_timeout(orchestrator.run("flaky")).await;

    // One invocation, one failure, nothing masked behind retries.
    assert_eq!(log.count_of("flaky"), 1);
    Ok(())
}

#[tokio::test]
async fn duplicate_names_are_rejected_across_tasks_and_pipelines() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(recording_task("build", &log))?;

    match orchestrator.define_pipeline("build", series([task("build")])) {
        Err(EngineError::DuplicateTask(name)) => assert_eq!(name, "build"),
        other => panic!("expected DuplicateTask, got {other:?}"),
    }

    orchestrator.define_pipeline("site", series([task("build")]))?;
    match orchestrator.register_task(recording_task("site", &log)) {
        Err(EngineError::DuplicateTask(name)) => assert_eq!(name, "site"),
        other => panic!("expected DuplicateTask, got {other:?}"),
    }

    assert_eq!(orchestrator.targets(), vec!["build", "site"]);
    Ok(())
}
