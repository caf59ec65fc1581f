//! Reading a project from disk.
//!
//! Everything past this module is pure: the compiler only sees [`SourceText`]
//! values. `Project::discover` walks the configured directories, applies the
//! exclude globs and reads the manifests.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::config::Settings;
use crate::source::SourceText;

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude pattern '{pattern}': {source}")]
    Exclude {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Every input of one compilation, as read from disk.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub root: PathBuf,
    /// `None` when the manifest file does not exist.
    pub manifest: Option<SourceText>,
    /// Manifest of the deferred-to environment, when configured and present.
    pub reference_manifest: Option<SourceText>,
    pub metadata: Vec<SourceText>,
    pub definitions: Vec<SourceText>,
}

impl Project {
    /// Read every source the settings point at, relative to `root`.
    pub fn discover(settings: &Settings, root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();
        let excludes = settings
            .project
            .exclude
            .iter()
            .map(|pattern| glob_to_regex(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let walker = Walker {
            root: &root,
            excludes: &excludes,
        };

        let manifest = read_optional(&root, &root.join(&settings.project.manifest))?;
        let reference_manifest = match settings.reference_manifest() {
            Some(path) => read_optional(&root, &root.join(path))?,
            None => None,
        };
        let metadata = walker.collect(&settings.project.metadata_paths)?;
        let definitions = walker.collect(&settings.project.definition_paths)?;

        tracing::info!(
            root = %root.display(),
            manifest = manifest.is_some(),
            reference_manifest = reference_manifest.is_some(),
            metadata = metadata.len(),
            definitions = definitions.len(),
            "project discovered"
        );

        Ok(Self {
            root,
            manifest,
            reference_manifest,
            metadata,
            definitions,
        })
    }
}

// ============================================================================
// Directory walk
// ============================================================================

struct Walker<'a> {
    root: &'a Path,
    excludes: &'a [Regex],
}

impl Walker<'_> {
    /// YAML files under each directory, each list sorted by relative path.
    fn collect(&self, dirs: &[String]) -> Result<Vec<SourceText>, ProjectError> {
        let mut files = Vec::new();
        for dir in dirs {
            let start = self.root.join(dir);
            if !start.is_dir() {
                tracing::warn!(path = %start.display(), "configured directory does not exist");
                continue;
            }
            for path in self.walk(&start)? {
                if files.iter().any(|f: &SourceText| f.path == relative(self.root, &path)) {
                    continue;
                }
                let contents = read(&path)?;
                files.push(SourceText::new(relative(self.root, &path), contents));
            }
        }
        Ok(files)
    }

    /// YAML files below `start`, depth first in file name order. Symlinks are
    /// not followed, so a link back to a parent directory cannot loop.
    fn walk(&self, start: &Path) -> Result<Vec<PathBuf>, ProjectError> {
        let mut found = Vec::new();
        let entries = WalkDir::new(start)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let skip = entry.depth() > 0 && self.excluded(entry.path());
                if skip {
                    tracing::debug!(path = %entry.path().display(), "excluded");
                }
                !skip
            });
        for entry in entries {
            let entry = entry.map_err(|err| ProjectError::Read {
                path: err.path().unwrap_or(start).to_path_buf(),
                source: err.into(),
            })?;
            if entry.file_type().is_file() && is_yaml(entry.path()) {
                found.push(entry.into_path());
            }
        }
        Ok(found)
    }

    fn excluded(&self, path: &Path) -> bool {
        let relative = relative(self.root, path);
        self.excludes.iter().any(|re| re.is_match(&relative))
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "yml" || ext == "yaml")
        .unwrap_or(false)
}

/// Forward-slash path relative to the project root.
fn relative(root: &Path, path: &Path) -> String {
    let stripped = path.strip_prefix(root).unwrap_or(path);
    stripped
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read(path: &Path) -> Result<String, ProjectError> {
    fs::read_to_string(path).map_err(|source| ProjectError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional(root: &Path, path: &Path) -> Result<Option<SourceText>, ProjectError> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(SourceText::new(relative(root, path), read(path)?)))
}

/// Translate a path glob into an anchored regex.
///
/// `**` matches across directories, `*` and `?` stay within one segment.
/// A pattern also matches everything below a matching directory.
fn glob_to_regex(pattern: &str) -> Result<Regex, ProjectError> {
    let mut re = String::from("^");
    let mut chars = pattern.trim_start_matches("./").chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    re.push_str("(?:.*/)?");
                } else {
                    re.push_str(".*");
                }
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push_str("(?:/.*)?$");
    Regex::new(&re).map_err(|source| ProjectError::Exclude {
        pattern: pattern.to_string(),
        source,
    })
}
