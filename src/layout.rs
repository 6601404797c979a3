//! Build directory layout
//!
//! All build outputs are relocated out of the project tree: the root build
//! directory becomes `<root>/build/<build_dir>` (lexically normalized, so
//! the default `../../build` lands next to the project root) and each
//! module builds into a subdirectory named after the module.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::info;

/// Errors from layout operations
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Failed to remove {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Refusing to remove build directory {0}")]
    Refused(PathBuf),
}

/// Relocated build directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    root_build_dir: PathBuf,
}

impl BuildLayout {
    /// Layout for a project rooted at `project_root`.
    ///
    /// `build_dir` is resolved against the project's default build
    /// directory `<project_root>/build`; absolute paths are used as is.
    pub fn new(project_root: &Path, build_dir: &str) -> Self {
        Self {
            root_build_dir: normalize(&project_root.join("build").join(build_dir)),
        }
    }

    pub fn root_build_dir(&self) -> &Path {
        &self.root_build_dir
    }

    /// Build directory of the module with the given graph path
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.root_build_dir.join(project_name(module))
    }

    /// Delete the root build directory.
    ///
    /// Returns whether anything was removed.
    pub fn clean(&self) -> Result<bool, LayoutError> {
        if !self
            .root_build_dir
            .components()
            .any(|c| matches!(c, Component::Normal(_)))
        {
            return Err(LayoutError::Refused(self.root_build_dir.clone()));
        }
        if !self.root_build_dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&self.root_build_dir).map_err(|source| LayoutError::Io {
            path: self.root_build_dir.clone(),
            source,
        })?;
        info!(path = %self.root_build_dir.display(), "build directory removed");
        Ok(true)
    }
}

/// Last segment of a module path (`:feature:login` → `login`)
pub fn project_name(module: &str) -> &str {
    module.rsplit(':').next().unwrap_or(module)
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
