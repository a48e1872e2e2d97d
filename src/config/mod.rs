//! TOML-backed settings for the training binaries and the web process.
//!
//! Settings live in `config.toml` under the `.tabpredict` app directory. A
//! missing file yields defaults; out-of-range values are clamped on load.

mod defaults;
mod errors;
mod io;
mod types;

pub use errors::ConfigError;
pub use io::{CONFIG_FILE_NAME, config_path, load_from, load_or_default, save_to_path};
pub use types::{
    DatasetSettings, ModelSettings, PreprocessSettings, ServerSettings, Settings,
    TrainingSettings,
};
