//! Lifecycle orchestration for Dockyard.
//!
//! This crate ties the composed configuration from `dockyard-schema` to the
//! command runner from `dockyard-runtime` through the `Orchestrator`, the
//! central API for building, migrating, configuring, starting, stopping and
//! rebuilding one named container. It also owns the settings file, the scratch
//! build directory, and the bundled-plugin failure classifier.

pub mod lifecycle;
pub mod orchestrator;
pub mod plugins;
pub mod scratch;
pub mod settings;

pub use lifecycle::{ContainerState, Step};
pub use orchestrator::{BuildOptions, Orchestrator};
pub use plugins::{detect_bundled_plugin, BUNDLED_PLUGINS};
pub use scratch::ScratchDir;
pub use settings::{Settings, DEFAULT_NAMESPACE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] dockyard_schema::ConfigError),
    #[error("runtime error: {0}")]
    Runtime(#[from] dockyard_runtime::RuntimeError),
    #[error(
        "external command failed: {step} exited with code {}: {stderr}",
        code.map_or_else(|| "none".to_owned(), |c| c.to_string())
    )]
    ExternalCommandFailed {
        step: Step,
        code: Option<i32>,
        stderr: String,
    },
    #[error("{source}: the plugin '{plugin}' is bundled with Discourse, remove it from '{config}'")]
    BundledPluginConflict {
        plugin: String,
        config: String,
        #[source]
        source: Box<CoreError>,
    },
    #[error("settings error in {}: {message}", path.display())]
    Settings {
        path: std::path::PathBuf,
        message: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
