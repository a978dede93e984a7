// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use buildpipe::config::{build_engine, load_and_validate, ActionKind};
use buildpipe::fs::RealFileSystem;
use buildpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn demo_config_loads_and_matches_the_expected_shape() -> TestResult {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest_dir.join("demos/Buildpipe.toml"))?;

    assert_eq!(cfg.task.len(), 6);
    assert_eq!(cfg.task.get("clean").unwrap().action, ActionKind::Clean);
    assert_eq!(cfg.task.get("styles").unwrap().action, ActionKind::Concat);
    assert_eq!(
        cfg.task.get("styles").unwrap().bundle.as_deref(),
        Some("styles.css")
    );
    assert!(cfg.task.get("img").unwrap().incremental);

    assert!(cfg.pipeline.contains_key("build"));
    assert!(cfg.pipeline.contains_key("default"));
    assert!(!cfg.reload.patterns.is_empty());
    assert_eq!(cfg.settings.debounce_ms, 50);
    Ok(())
}

#[test]
fn demo_config_assembles_into_an_engine() -> TestResult {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest_dir.join("demos/Buildpipe.toml"))?
        .anchored_at(&manifest_dir.join("demos"));

    let engine = build_engine(&cfg, Arc::new(RealFileSystem))?;

    let targets = engine.orchestrator.targets();
    assert!(targets.contains(&"build"));
    assert!(targets.contains(&"default"));
    assert!(targets.contains(&"styles"));

    // Watch sugar on copy/styles/scripts/img, plus the [reload] binding.
    assert_eq!(engine.bindings.len(), 5);
    assert!(engine.bindings.iter().any(|b| b.label() == "reload"));
    assert_eq!(engine.debounce, Duration::from_millis(50));
    Ok(())
}

#[tokio::test]
async fn configured_site_builds_end_to_end_on_the_real_filesystem() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path();

    fs::create_dir_all(root.join("src/less"))?;
    fs::create_dir_all(root.join("public/docs"))?;
    fs::write(root.join("src/less/base.less"), "body { margin: 0; }")?;
    fs::write(root.join("src/less/nav.less"), ".nav { color: blue; }")?;
    fs::write(root.join("public/index.html"), "<html></html>")?;
    fs::write(root.join("public/docs/about.html"), "<about></about>")?;

    let config_path = root.join("Buildpipe.toml");
    fs::write(
        &config_path,
        r#"
[task.clean]
action = "clean"

[task.pages]
action = "copy"
base = "public"
input = ["**/*.html"]

[task.styles]
action = "concat"
input = ["less/**/*.less"]
output = "css"
bundle = "site.css"

[pipeline.build]
steps = ["clean", { parallel = ["pages", "styles"] }]
"#,
    )?;

    let cfg = load_and_validate(&config_path)?.anchored_at(root);
    let engine = build_engine(&cfg, Arc::new(RealFileSystem))?;

    let summary = with_timeout(engine.orchestrator.run("build")).await?;
    assert_eq!(summary.tasks.len(), 3);

    let bundle = fs::read_to_string(root.join("build/css/site.css"))?;
    assert_eq!(bundle, "body { margin: 0; }\n.nav { color: blue; }");
    assert_eq!(
        fs::read_to_string(root.join("build/index.html"))?,
        "<html></html>"
    );
    assert_eq!(
        fs::read_to_string(root.join("build/docs/about.html"))?,
        "<about></about>"
    );

    // The pipeline is idempotent: a second run rebuilds the same outputs.
    with_timeout(engine.orchestrator.run("build")).await?;
    assert!(root.join("build/css/site.css").exists());
    Ok(())
}

#[tokio::test]
async fn pipelines_can_reference_other_pipelines() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path();
    fs::create_dir_all(root.join("src"))?;
    fs::write(root.join("src/a.txt"), "a")?;

    let config_path = root.join("Buildpipe.toml");
    fs::write(
        &config_path,
        r#"
[task.stage]
action = "copy"
input = ["*.txt"]
output = "stage"

[pipeline.inner]
steps = ["stage"]

[pipeline.default]
steps = ["inner"]
"#,
    )?;

    let cfg = load_and_validate(&config_path)?.anchored_at(root);
    let engine = build_engine(&cfg, Arc::new(RealFileSystem))?;

    let summary = with_timeout(engine.orchestrator.run("default")).await?;
    assert_eq!(summary.tasks.len(), 1);
    assert!(root.join("build/stage/a.txt").exists());
    Ok(())
}
