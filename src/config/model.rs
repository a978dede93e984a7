// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration as read from a `Buildpipe.toml`:
///
/// ```toml
/// [paths]
/// src = "src"
/// build = "build"
/// public = "public"
///
/// [task.styles]
/// action = "concat"
/// input = ["css/**/*.css"]
/// output = "css"
/// bundle = "site.css"
/// watch = ["css/**/*.css"]
///
/// [pipeline.build]
/// steps = ["clean", "copy", { parallel = ["styles", "img"] }]
/// ```
///
/// All sections are optional and have reasonable defaults; a useful config
/// needs at least one `[task.<name>]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Project roots from `[paths]`.
    #[serde(default)]
    pub paths: PathsSection,

    /// All tasks from `[task.<name>]`. Keys are the task names.
    #[serde(default)]
    pub task: BTreeMap<String, TaskSection>,

    /// Named pipelines from `[pipeline.<name>]`.
    #[serde(default)]
    pub pipeline: BTreeMap<String, PipelineSection>,

    /// Explicit watch bindings from `[watch.<label>]`.
    #[serde(default)]
    pub watch: BTreeMap<String, WatchSection>,

    /// Dev-server reload patterns from `[reload]`.
    #[serde(default)]
    pub reload: ReloadSection,

    /// Engine tuning from `[settings]`.
    #[serde(default)]
    pub settings: SettingsSection,
}

impl ConfigFile {
    /// Re-anchor the `[paths]` roots onto `root`.
    ///
    /// The roots in a config file are relative to the directory the file
    /// lives in, not to the process working directory. The loader leaves
    /// them untouched, so the caller anchors them before assembling an
    /// engine. Roots that are already absolute stay as they are.
    pub fn anchored_at(mut self, root: &Path) -> Self {
        self.paths.src = root.join(&self.paths.src);
        self.paths.build = root.join(&self.paths.build);
        self.paths.public = root.join(&self.paths.public);
        self
    }
}

/// `[paths]` section: the three project roots everything else is anchored
/// to. `src` holds sources, `build` receives outputs, `public` holds static
/// assets that are copied through unchanged.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: PathBuf,
    #[serde(default = "default_build")]
    pub build: PathBuf,
    #[serde(default = "default_public")]
    pub public: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_build() -> PathBuf {
    PathBuf::from("build")
}

fn default_public() -> PathBuf {
    PathBuf::from("public")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            build: default_build(),
            public: default_public(),
        }
    }
}

/// Which built-in action a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Remove the task's output directory tree.
    Clean,
    /// Copy each input to the output, preserving relative paths.
    Copy,
    /// Join the inputs into one `bundle` file under the output.
    Concat,
}

/// `[task.<name>]` section.
///
/// ```toml
/// [task.img]
/// action = "copy"
/// input = ["img/**/*"]
/// output = "img"
/// incremental = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSection {
    /// Built-in action to run.
    pub action: ActionKind,

    /// Input glob patterns, relative to the `base` root.
    #[serde(default)]
    pub input: Vec<String>,

    /// Which `[paths]` root the input patterns (and any `watch` sugar) are
    /// anchored to: `"src"`, `"build"` or `"public"`. Defaults to `"src"`.
    #[serde(default)]
    pub base: Option<String>,

    /// Output directory, relative to the build root. Empty means the build
    /// root itself. For `clean` this is the directory that gets removed.
    #[serde(default)]
    pub output: String,

    /// Output file name for `concat`, relative to `output`. Required for
    /// `concat`, rejected for other actions.
    #[serde(default)]
    pub bundle: Option<String>,

    /// Resolve inputs with "modified since the last successful run" instead
    /// of the full set.
    #[serde(default)]
    pub incremental: bool,

    /// Tasks that must complete successfully before this one runs.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Sugar for a watch binding: these patterns (under the `base` root)
    /// re-run this task on change. The binding's label is the task name.
    #[serde(default)]
    pub watch: Option<Vec<String>>,
}

/// One step of a pipeline: a bare task/pipeline name, or a nested group.
///
/// ```toml
/// steps = ["clean", { parallel = ["styles", { series = ["a", "b"] }] }]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum StepSpec {
    /// A task or pipeline name.
    Name(String),
    /// `{ series = [...] }`: run the inner steps in sequence.
    Series { series: Vec<StepSpec> },
    /// `{ parallel = [...] }`: run the inner steps concurrently.
    Parallel { parallel: Vec<StepSpec> },
}

/// `[pipeline.<name>]` section. The top-level `steps` run in series.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSection {
    pub steps: Vec<StepSpec>,
}

/// `[watch.<label>]` section: an explicit binding from patterns to a
/// runnable step.
///
/// ```toml
/// [watch.markup]
/// patterns = ["**/*.html"]
/// run = "copy"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Glob patterns, relative to the `base` root.
    pub patterns: Vec<String>,

    /// `[paths]` root selector, like [`TaskSection::base`].
    #[serde(default)]
    pub base: Option<String>,

    /// What to run when the patterns match a change.
    pub run: StepSpec,
}

/// `[reload]` section: patterns under the build root that trigger the
/// dev-server reload sink. Empty means no reload binding.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReloadSection {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    /// Settle window for watch triggers, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    50
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}
