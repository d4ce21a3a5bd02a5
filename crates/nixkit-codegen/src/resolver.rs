//! File reference resolution
//!
//! A file in a recipe is written relative to the module that declared it.
//! The resolver turns it into an absolute, lexically normalized path; the
//! filesystem is never consulted, so the referenced file need not exist yet.

use std::path::{Component, Path, PathBuf};

use nixkit_core::LocalFile;

/// Resolves [`LocalFile`]s against their declaring modules
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    base_dir: PathBuf,
}

impl ModuleResolver {
    /// Resolver anchoring relative module locations at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolver anchored at the process working directory
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Directory relative module locations are anchored at
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute path of `file`
    ///
    /// Fails with a message when the declaring module's directory cannot be
    /// determined.
    pub fn resolve(&self, file: &LocalFile) -> Result<PathBuf, String> {
        let module = file
            .module
            .location()
            .ok_or_else(|| "the declaring module's location is unknown".to_string())?;

        let module_dir = module
            .parent()
            .filter(|_| module.file_name().is_some())
            .ok_or_else(|| format!("module location '{}' has no directory", module.display()))?;

        let module_dir = if module_dir.is_absolute() {
            module_dir.to_path_buf()
        } else {
            self.base_dir.join(module_dir)
        };
        if !module_dir.is_absolute() {
            return Err(format!(
                "module directory '{}' is not absolute",
                module_dir.display()
            ));
        }

        Ok(normalize(&module_dir.join(&file.value)))
    }
}

/// Remove `.` components and fold `..` into their parent
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` is `/`
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
