// tests/watcher_triggering.rs
//
// These tests drive the real `notify` watcher over a temp directory, so
// they tolerate event bursts (one save can surface as several filesystem
// events) by running with a settle window, and they poll with generous
// timeouts instead of assuming instant delivery.

use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::time::timeout;

use buildpipe::pattern::Pattern;
use buildpipe::pipeline::task;
use buildpipe::reload::{ChannelReloadSink, LogReloadSink, ReloadSink};
use buildpipe::watch::{spawn_watcher, WatchBinding, WatchOptions};
use buildpipe_test_utils::actions::RunLog;
use buildpipe_test_utils::builders::{failing_task, mock_orchestrator, recording_task};
use buildpipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

const SETTLE: Duration = Duration::from_millis(200);
/// Long enough for any straggling events of a prior save to have fired.
const QUIET: Duration = Duration::from_millis(400);

async fn wait_for(log: &RunLog, entry: &str, count: usize) {
    timeout(Duration::from_secs(5), async {
        while log.count_of(entry) < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "timed out waiting for {count} runs of '{entry}' (saw {})",
            log.count_of(entry)
        )
    });
}

#[tokio::test]
async fn changing_a_matched_file_reruns_only_the_bound_task() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("styles"))?;
    fs::create_dir_all(src.join("scripts"))?;
    fs::write(src.join("styles/main.style"), "a {}")?;
    fs::write(src.join("scripts/app.script"), "fn()")?;

    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(recording_task("styles", &log))?;
    orchestrator.register_task(recording_task("scripts", &log))?;

    let bindings = vec![
        WatchBinding::node(
            "styles",
            Pattern::new(&src, ["**/*.style"]),
            task("styles"),
        ),
        WatchBinding::node(
            "scripts",
            Pattern::new(&src, ["**/*.script"]),
            task("scripts"),
        ),
    ];

    let handle = spawn_watcher(
        bindings,
        Arc::new(orchestrator),
        Arc::new(LogReloadSink),
        WatchOptions { settle: SETTLE },
    )?;

    fs::write(src.join("styles/main.style"), "a { color: red; }")?;

    wait_for(&log, "styles", 1).await;
    tokio::time::sleep(QUIET).await;

    assert_eq!(log.count_of("styles"), 1, "one save, one re-run");
    assert_eq!(log.count_of("scripts"), 0, "unrelated binding must not fire");

    drop(handle);
    Ok(())
}

#[tokio::test]
async fn reload_binding_pokes_the_sink_instead_of_running_tasks() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let build = dir.path().join("build");
    fs::create_dir_all(build.join("css"))?;
    fs::write(build.join("css/site.css"), "body {}")?;

    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(recording_task("styles", &log))?;

    let (sink, mut reload_rx) = ChannelReloadSink::new();
    let handle = spawn_watcher(
        vec![WatchBinding::reload(
            "reload",
            Pattern::new(&build, ["**/*.css"]),
        )],
        Arc::new(orchestrator),
        Arc::new(sink),
        WatchOptions { settle: SETTLE },
    )?;

    fs::write(build.join("css/site.css"), "body { margin: 0; }")?;

    let label = timeout(Duration::from_secs(5), reload_rx.recv())
        .await
        .expect("reload notification within 5s")
        .expect("sink channel open");
    assert_eq!(label, "reload");

    // Trigger only, and only for the one save.
    let extra = timeout(QUIET, reload_rx.recv()).await;
    assert!(extra.is_err(), "a single save must notify once");
    // No task ran on behalf of the reload binding.
    assert!(log.is_empty());

    drop(handle);
    Ok(())
}

#[tokio::test]
async fn failed_bound_run_leaves_the_binding_active() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let src = dir.path().join("src");
    fs::create_dir_all(&src)?;
    fs::write(src.join("broken.style"), "v1")?;

    let log = RunLog::new();
    let (mut orchestrator, _fs) = mock_orchestrator();
    orchestrator.register_task(failing_task("styles", &log))?;

    let handle = spawn_watcher(
        vec![WatchBinding::node(
            "styles",
            Pattern::new(&src, ["**/*.style"]),
            task("styles"),
        )],
        Arc::new(orchestrator),
        Arc::new(LogReloadSink),
        WatchOptions { settle: SETTLE },
    )?;

    fs::write(src.join("broken.style"), "v2")?;
    wait_for(&log, "styles", 1).await;
    tokio::time::sleep(QUIET).await;

    // The run failed; the next change still triggers a new attempt.
    fs::write(src.join("broken.style"), "v3")?;
    wait_for(&log, "styles", 2).await;

    tokio::time::sleep(QUIET).await;
    assert_eq!(log.count_of("styles"), 2);

    drop(handle);
    Ok(())
}

#[test]
fn reload_sink_trait_objects_are_interchangeable() {
    // The watcher only sees `Arc<dyn ReloadSink>`; both shipped impls
    // satisfy it.
    let (channel_sink, mut rx) = ChannelReloadSink::new();
    let sinks: Vec<Arc<dyn ReloadSink>> = vec![Arc::new(LogReloadSink), Arc::new(channel_sink)];

    for sink in &sinks {
        sink.notify("smoke");
    }
    assert_eq!(rx.try_recv().ok().as_deref(), Some("smoke"));
}
