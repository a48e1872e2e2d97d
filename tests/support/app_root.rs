use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tabpredict::app_dirs;

static ROOT_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Points the app directory at a temp dir for the guard's lifetime.
pub struct AppRootGuard {
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl AppRootGuard {
    pub fn set(path: PathBuf) -> Self {
        let lock = ROOT_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        app_dirs::set_app_root_override(path).expect("set app root override");
        Self { _lock: lock }
    }
}

impl Drop for AppRootGuard {
    fn drop(&mut self) {
        app_dirs::clear_app_root_override();
    }
}
