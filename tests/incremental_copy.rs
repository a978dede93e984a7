// tests/incremental_copy.rs

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildpipe::pattern::Pattern;
use buildpipe::registry::{ActionContext, ActionOutput, BoxFuture, Task, TaskAction};
use buildpipe::transforms::CopyAction;
use buildpipe_test_utils::builders::mock_orchestrator;
use buildpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn incremental_copy_only_sees_files_changed_since_last_success() -> TestResult {
    init_tracing();

    let (mut orchestrator, fs) = mock_orchestrator();
    fs.add_file("/proj/src/img/logo.png", "logo");
    fs.add_file("/proj/src/img/icons/save.png", "save");

    orchestrator.register_task(
        Task::new("img", Arc::new(CopyAction))
            .with_input(Pattern::new("/proj/src", ["img/**/*.png"]))
            .with_dest("/proj/build")
            .incremental(true),
    )?;

    // First run has no marker yet: the full set is copied.
    let summary = with_timeout(orchestrator.run("img")).await?;
    assert_eq!(summary.tasks[0].inputs, 2);
    assert_eq!(summary.tasks[0].written, 2);
    assert_eq!(fs.contents("/proj/build/img/logo.png"), Some(b"logo".to_vec()));
    assert_eq!(
        fs.contents("/proj/build/img/icons/save.png"),
        Some(b"save".to_vec())
    );

    // Nothing changed since: the incremental resolution is empty.
    let summary = with_timeout(orchestrator.run("img")).await?;
    assert_eq!(summary.tasks[0].inputs, 0);
    assert_eq!(summary.tasks[0].written, 0);

    // One file re-saved: exactly that file is re-copied.
    fs.touch("/proj/src/img/logo.png", Duration::from_secs(3600));
    let summary = with_timeout(orchestrator.run("img")).await?;
    assert_eq!(summary.tasks[0].inputs, 1);
    assert_eq!(summary.tasks[0].written, 1);
    Ok(())
}

#[tokio::test]
async fn non_incremental_copy_sees_the_full_set_every_run() -> TestResult {
    init_tracing();

    let (mut orchestrator, fs) = mock_orchestrator();
    fs.add_file("/proj/src/fonts/sans.woff2", "sans");
    fs.add_file("/proj/src/fonts/serif.woff2", "serif");

    orchestrator.register_task(
        Task::new("fonts", Arc::new(CopyAction))
            .with_input(Pattern::new("/proj/src", ["fonts/**/*.woff2"]))
            .with_dest("/proj/build"),
    )?;

    for _ in 0..2 {
        let summary = with_timeout(orchestrator.run("fonts")).await?;
        assert_eq!(summary.tasks[0].inputs, 2);
        assert_eq!(summary.tasks[0].written, 2);
    }
    Ok(())
}

/// Fails its first invocation, succeeds afterwards; records how many input
/// files each invocation received.
struct FlakyAction {
    failed_once: AtomicBool,
    seen: Arc<Mutex<Vec<usize>>>,
}

impl FlakyAction {
    fn new(seen: Arc<Mutex<Vec<usize>>>) -> Self {
        Self {
            failed_once: AtomicBool::new(false),
            seen,
        }
    }
}

impl TaskAction for FlakyAction {
    fn run(&self, ctx: ActionContext) -> BoxFuture<anyhow::Result<ActionOutput>> {
        let first = !self.failed_once.swap(true, Ordering::SeqCst);
        let seen = self.seen.clone();
        Box::pin(async move {
            seen.lock().unwrap().push(ctx.files.len());
            if first {
                anyhow::bail!("transient failure");
            }
            Ok(ActionOutput::default())
        })
    }
}

#[tokio::test]
async fn failed_run_does_not_advance_the_incremental_marker() -> TestResult {
    init_tracing();

    let (mut orchestrator, fs) = mock_orchestrator();
    fs.add_file("/proj/src/img/a.png", "a");
    fs.add_file("/proj/src/img/b.png", "b");
    fs.add_file("/proj/src/img/c.png", "c");

    let seen = Arc::new(Mutex::new(Vec::new()));
    orchestrator.register_task(
        Task::new("img", Arc::new(FlakyAction::new(seen.clone())))
            .with_input(Pattern::new("/proj/src", ["img/**/*.png"]))
            .with_dest("/proj/build")
            .incremental(true),
    )?;

    // First run fails; the marker must not be recorded.
    let err = with_timeout(orchestrator.run("img"))
        .await
        .expect_err("first run fails");
    assert_eq!(err.task, "img");

    // Second run succeeds and still sees the full set: nothing was dropped
    // by the failed attempt.
    with_timeout(orchestrator.run("img")).await?;

    // Third run is the first one after a success: now the set is empty.
    with_timeout(orchestrator.run("img")).await?;

    assert_eq!(*seen.lock().unwrap(), vec![3, 3, 0]);
    Ok(())
}
