//! Mod discovery and registration
//!
//! Walks a directory for `.pybc` files in sorted path order, decodes each
//! one and registers its entry function with a [`TickScheduler`]. A module
//! that fails to decode is logged and skipped; nothing from it is
//! registered and the remaining modules are unaffected.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use pyrium_vm_bytecode::{BytecodeError, Module};
use pyrium_vm_core::{Vm, World};
use walkdir::WalkDir;

use crate::error::{RuntimeError, RuntimeResult};
use crate::scheduler::{HandlerId, TickScheduler};

/// File extension of compiled mods
pub const MODULE_EXTENSION: &str = "pybc";

/// A module that was decoded and registered
#[derive(Debug, Clone)]
pub struct LoadedMod {
    /// Source file
    pub path: PathBuf,
    /// Decoded module
    pub module: Arc<Module>,
    /// Scheduler handle, `None` when the module has no entry function
    pub handler: Option<HandlerId>,
}

/// A module file that was rejected
#[derive(Debug)]
pub struct LoadFailure {
    /// Source file
    pub path: PathBuf,
    /// Why it was rejected
    pub error: BytecodeError,
}

/// Result of loading a mods directory
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Modules decoded successfully, in path order
    pub loaded: Vec<LoadedMod>,
    /// Files that failed to decode
    pub failed: Vec<LoadFailure>,
}

impl LoadReport {
    /// Number of modules with a registered tick handler
    pub fn registered(&self) -> usize {
        self.loaded.iter().filter(|m| m.handler.is_some()).count()
    }
}

/// List `.pybc` files under `dir`, sorted by path
pub fn discover(dir: &Path) -> RuntimeResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| RuntimeError::ModsDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == MODULE_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Register a module's entry function with the scheduler
///
/// The module gets its own [`Vm`] behind a mutex so overlapping dispatches
/// never touch its registers at the same time. Returns `None` when the
/// module does not define `entry`.
pub fn register_module(
    scheduler: &TickScheduler,
    world: Arc<dyn World>,
    module: Arc<Module>,
    entry: &str,
) -> Option<HandlerId> {
    if module.function(entry).is_none() {
        tracing::debug!(module = %module.name, entry, "module has no entry function");
        return None;
    }

    let name = module.name.clone();
    let entry = entry.to_owned();
    let vm = Mutex::new(Vm::new(module, world));

    let id = scheduler.register(name.clone(), move |tick| {
        let outcome = vm.lock().invoke(&entry, tick)?;
        if outcome.sleep_hint.is_some() || outcome.yielded {
            tracing::trace!(
                sleep = ?outcome.sleep_hint,
                yielded = outcome.yielded,
                "scheduling hint"
            );
        }
        Ok(())
    });

    tracing::info!(module = %name, "registered mod");
    Some(id)
}

/// Discover, decode and register every module in `dir`
pub fn load_dir(
    dir: &Path,
    scheduler: &TickScheduler,
    world: &Arc<dyn World>,
    entry: &str,
) -> RuntimeResult<LoadReport> {
    let mut report = LoadReport::default();

    for path in discover(dir)? {
        match Module::from_path(&path) {
            Ok(module) => {
                let module = Arc::new(module);
                let handler =
                    register_module(scheduler, Arc::clone(world), Arc::clone(&module), entry);
                report.loaded.push(LoadedMod {
                    path,
                    module,
                    handler,
                });
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "rejected module");
                report.failed.push(LoadFailure { path, error });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["b.pybc", "a.pybc", "notes.txt", "nested/c.pybc"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let files = discover(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.pybc"),
                PathBuf::from("b.pybc"),
                PathBuf::from("nested/c.pybc"),
            ]
        );
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, RuntimeError::ModsDir { .. }));
    }
}
