//! Application directory helpers anchored to a single `.tabpredict` folder.
//!
//! Config and log files live under the OS config directory (e.g. `%APPDATA%`
//! on Windows, `~/.config` on Linux). Tests and portable setups can redirect
//! the root with [`set_app_root_override`].

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = ".tabpredict";

static APP_ROOT_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `.tabpredict` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let path = match root_override() {
        Some(path) => path,
        None => config_base_dir()
            .ok_or(AppDirError::NoBaseDir)?
            .join(APP_DIR_NAME),
    };
    ensure_dir(path)
}

/// Return the logs directory inside the app root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join("logs"))
}

/// Redirect the app root to an explicit directory (portable installs, tests).
pub fn set_app_root_override(path: PathBuf) -> Result<(), AppDirError> {
    let path = ensure_dir(path)?;
    if let Ok(mut guard) = APP_ROOT_OVERRIDE.lock() {
        *guard = Some(path);
    }
    Ok(())
}

/// Drop any override installed with [`set_app_root_override`].
pub fn clear_app_root_override() {
    if let Ok(mut guard) = APP_ROOT_OVERRIDE.lock() {
        *guard = None;
    }
}

fn root_override() -> Option<PathBuf> {
    APP_ROOT_OVERRIDE
        .lock()
        .ok()
        .and_then(|guard| guard.clone())
}

fn config_base_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
