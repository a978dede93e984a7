// src/pattern.rs

//! Glob patterns and their resolution against the filesystem.
//!
//! A [`Pattern`] is a list of glob strings anchored at a base directory;
//! [`PatternMatcher`] walks that directory through the [`FileSystem`] trait
//! and returns the matching files. Nothing is cached: every call reflects
//! the filesystem at the moment of invocation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{EngineError, Result};
use crate::fs::FileSystem;

/// Glob strings anchored at a base directory.
///
/// The globs are interpreted relative to `base`, so
/// `Pattern::new("assets", ["fonts/**/*.woff2"])` matches
/// `assets/fonts/inter/regular.woff2`. Supported syntax is `globset`'s:
/// `*`, `?`, `**`, character classes and `{a,b}` alternation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    base: PathBuf,
    globs: Vec<String>,
}

impl Pattern {
    pub fn new<B, I, S>(base: B, globs: I) -> Self
    where
        B: Into<PathBuf>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base: base.into(),
            globs: globs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    /// True if the pattern has no globs at all. Such a pattern resolves to
    /// an empty file set without touching the filesystem.
    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    /// Compile the glob strings into a matchable set.
    pub fn compile(&self) -> Result<CompiledPattern> {
        let mut builder = GlobSetBuilder::new();
        for pat in &self.globs {
            let glob = Glob::new(pat).map_err(|source| EngineError::Pattern {
                pattern: pat.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| EngineError::Pattern {
            pattern: self.globs.join(", "),
            source,
        })?;
        Ok(CompiledPattern {
            base: self.base.clone(),
            set,
        })
    }
}

/// A [`Pattern`] with its globs compiled into a `GlobSet`.
#[derive(Clone)]
pub struct CompiledPattern {
    base: PathBuf,
    set: GlobSet,
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl CompiledPattern {
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns true if `path` is under the base directory and its relative
    /// form matches any of the globs.
    pub fn matches(&self, path: &Path) -> bool {
        match relative_str(&self.base, path) {
            Some(rel) => self.set.is_match(&rel),
            None => false,
        }
    }

    /// Match an already-relativized, forward-slash path. Used by the
    /// watcher, which relativizes event paths against a canonicalized base.
    pub fn matches_rel(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root` and cannot be relativized.
pub(crate) fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy().replace('\\', "/");
    Some(s)
}

/// Resolves patterns to concrete file sets.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    fs: Arc<dyn FileSystem>,
}

impl PatternMatcher {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Resolve a pattern to the sorted list of matching files.
    ///
    /// An unreadable or missing base directory is a
    /// [`EngineError::Filesystem`]; a pattern with no globs resolves to an
    /// empty set without walking anything.
    pub fn resolve(&self, pattern: &Pattern) -> Result<Vec<PathBuf>> {
        if pattern.is_empty() {
            return Ok(Vec::new());
        }
        let compiled = pattern.compile()?;
        let mut files = self.walk(&compiled)?;
        files.sort();
        Ok(files)
    }

    /// Like [`resolve`](Self::resolve), but keeps only files whose
    /// modification time is strictly after `marker`.
    pub fn resolve_since(&self, pattern: &Pattern, marker: SystemTime) -> Result<Vec<PathBuf>> {
        if pattern.is_empty() {
            return Ok(Vec::new());
        }
        let compiled = pattern.compile()?;
        let mut files = Vec::new();
        for path in self.walk(&compiled)? {
            let mtime = self
                .fs
                .modified(&path)
                .map_err(|e| EngineError::fs(&path, e))?;
            if mtime > marker {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Collect all files under the pattern's base that match its globs.
    fn walk(&self, compiled: &CompiledPattern) -> Result<Vec<PathBuf>> {
        let root = compiled.base();
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            let entries = self.fs.read_dir(&dir).map_err(|e| EngineError::fs(&dir, e))?;
            for path in entries {
                if self.fs.is_dir(&path) {
                    stack.push(path);
                } else if self.fs.is_file(&path) && compiled.matches(&path) {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }
}
