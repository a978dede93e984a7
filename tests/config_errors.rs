// tests/config_errors.rs

use std::io::Write;

use tempfile::NamedTempFile;

use buildpipe::config::load_and_validate;
use buildpipe::errors::EngineError;

fn load_str(toml: &str) -> Result<(), EngineError> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{toml}").unwrap();
    load_and_validate(file.path()).map(|_| ())
}

#[test]
fn dependency_cycle_returns_a_structured_error() {
    let result = load_str(
        r#"
[task.a]
action = "copy"
depends_on = ["b"]

[task.b]
action = "copy"
depends_on = ["a"]
"#,
    );

    match result {
        Err(EngineError::Cycle(name)) => {
            assert!(name == "a" || name == "b");
        }
        other => panic!("expected Cycle error, got {other:?}"),
    }
}

#[test]
fn unknown_dependency_is_a_config_error() {
    let result = load_str(
        r#"
[task.a]
action = "copy"
depends_on = ["nonexistent"]
"#,
    );

    match result {
        Err(EngineError::Config(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("nonexistent"));
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn pipeline_step_naming_nothing_is_a_config_error() {
    let result = load_str(
        r#"
[task.a]
action = "copy"

[pipeline.build]
steps = ["a", "ghost"]
"#,
    );

    match result {
        Err(EngineError::Config(msg)) => {
            assert!(msg.contains("pipeline 'build'"));
            assert!(msg.contains("ghost"));
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn pipelines_referencing_each_other_is_a_cycle() {
    let result = load_str(
        r#"
[task.a]
action = "copy"

[pipeline.x]
steps = ["a", "y"]

[pipeline.y]
steps = ["x"]
"#,
    );

    match result {
        Err(EngineError::Cycle(name)) => {
            assert!(name == "x" || name == "y");
        }
        other => panic!("expected Cycle error, got {other:?}"),
    }
}

#[test]
fn task_and_pipeline_sharing_a_name_is_a_duplicate() {
    let result = load_str(
        r#"
[task.build]
action = "copy"

[pipeline.build]
steps = ["build"]
"#,
    );

    match result {
        Err(EngineError::DuplicateTask(name)) => assert_eq!(name, "build"),
        other => panic!("expected DuplicateTask error, got {other:?}"),
    }
}

#[test]
fn concat_without_a_bundle_name_is_rejected() {
    let result = load_str(
        r#"
[task.styles]
action = "concat"
input = ["less/**/*.less"]
output = "css"
"#,
    );

    match result {
        Err(EngineError::Config(msg)) => {
            assert!(msg.contains("task 'styles'"));
            assert!(msg.contains("bundle"));
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn bundle_on_a_copy_task_is_rejected() {
    let result = load_str(
        r#"
[task.img]
action = "copy"
input = ["img/**/*"]
bundle = "oops.bin"
"#,
    );

    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn unknown_base_selector_is_rejected() {
    let result = load_str(
        r#"
[task.pages]
action = "copy"
base = "htdocs"
input = ["**/*.html"]
"#,
    );

    match result {
        Err(EngineError::Config(msg)) => {
            assert!(msg.contains("htdocs"));
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn empty_glob_strings_are_rejected() {
    let result = load_str(
        r#"
[task.pages]
action = "copy"
input = ["**/*.html", ""]
"#,
    );

    match result {
        Err(EngineError::Config(msg)) => {
            assert!(msg.contains("empty glob"));
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn config_without_tasks_is_rejected() {
    let result = load_str(
        r#"
[settings]
debounce_ms = 10
"#,
    );

    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn watch_label_colliding_with_task_watch_sugar_is_rejected() {
    let result = load_str(
        r#"
[task.styles]
action = "concat"
input = ["less/**/*.less"]
bundle = "site.css"
watch = ["less/**/*.less"]

[watch.styles]
patterns = ["extra/**/*.less"]
run = "styles"
"#,
    );

    match result {
        Err(EngineError::Config(msg)) => {
            assert!(msg.contains("styles"));
            assert!(msg.contains("collides"));
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn unparseable_toml_is_a_toml_error() {
    let result = load_str("this is not [valid toml");
    assert!(matches!(result, Err(EngineError::Toml(_))));
}

#[test]
fn unknown_keys_are_rejected_by_the_model() {
    let result = load_str(
        r#"
[task.a]
action = "copy"
colour = "red"
"#,
    );

    assert!(matches!(result, Err(EngineError::Toml(_))));
}

#[test]
fn missing_config_file_is_a_filesystem_error() {
    let result = load_and_validate("/definitely/not/a/real/Buildpipe.toml");
    assert!(matches!(result, Err(EngineError::Filesystem { .. })));
}
