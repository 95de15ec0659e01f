//! Discovery of the Python interpreter and the scripts directory.
//!
//! The backend never bundles an interpreter; it locates one at startup the
//! same way it locates the `python/` scripts folder: an explicit environment
//! override first, then a search of the usual places.

use std::env;
use std::path::{Path, PathBuf};

use crate::utils::{FlowError, FlowResult};

/// Environment variable overriding the interpreter used for all scripts.
pub const PYTHON_ENV: &str = "IMAGEFLOW_PYTHON";

/// Environment variable overriding the scripts directory.
pub const SCRIPTS_DIR_ENV: &str = "IMAGEFLOW_SCRIPTS_DIR";

/// Locates the Python interpreter that will run the image scripts.
///
/// Resolution order: the `IMAGEFLOW_PYTHON` override, then `python3` and
/// `python` on `PATH`.
pub fn find_python() -> FlowResult<PathBuf> {
    if let Ok(configured) = env::var(PYTHON_ENV) {
        let path = absolutize(PathBuf::from(configured));
        if path.is_file() {
            return Ok(path);
        }
        return Err(FlowError::settings(format!(
            "{} is set but does not point to an executable: {}",
            PYTHON_ENV,
            path.display()
        )));
    }

    for candidate in ["python3", "python"] {
        if let Some(path) = search_path(candidate) {
            return Ok(path);
        }
    }

    Err(FlowError::spawn(format!(
        "python executable not found; install python3 or set {PYTHON_ENV}"
    )))
}

/// Locates the directory holding the image-processing scripts.
///
/// Resolution order: the `IMAGEFLOW_SCRIPTS_DIR` override, then a `python/`
/// folder found by walking up from the current directory.
pub fn resolve_scripts_dir() -> FlowResult<PathBuf> {
    if let Ok(configured) = env::var(SCRIPTS_DIR_ENV) {
        let dir = absolutize(PathBuf::from(configured));
        if dir.is_dir() {
            return Ok(dir);
        }
        return Err(FlowError::settings(format!(
            "{} is set but is not a directory: {}",
            SCRIPTS_DIR_ENV,
            dir.display()
        )));
    }

    if let Ok(cwd) = env::current_dir() {
        let mut dir = cwd.as_path();
        for _ in 0..=8 {
            let candidate = dir.join("python");
            if is_scripts_dir(&candidate) {
                return Ok(candidate);
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
    }

    Err(FlowError::settings(format!(
        "python scripts directory not found; set {SCRIPTS_DIR_ENV} or ensure a python folder exists"
    )))
}

fn is_scripts_dir(dir: &Path) -> bool {
    dir.join("converter.py").is_file()
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
