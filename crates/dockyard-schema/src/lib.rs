//! Configuration documents, template composition, and artifact rendering for Dockyard.
//!
//! This crate is the schema layer: YAML document parsing (`ConfigDocument`),
//! filesystem access to base and template documents (`ConfigStore`), the typed
//! merge that folds templates and base into one effective `Config`, and the two
//! derived artifacts rendered from it: the provisioning manifest and the build
//! recipe.

pub mod config;
pub mod document;
pub mod merge;
pub mod render;
pub mod store;
pub mod types;

pub use config::{is_known_secret, Config, ConfigName, KNOWN_SECRETS};
pub use document::{ConfigDocument, DeploymentShape, Link, Volume};
pub use merge::merge_into;
pub use render::{
    RecipeOptions, DEFAULT_BAKE_ENV, DEFAULT_BOOT_COMMAND, DEFAULT_MANIFEST_FILE,
    MANIFEST_SEPARATOR, PROVISIONER,
};
pub use store::{ConfigStore, RawDocument, CONFIG_EXTENSION};
pub use types::{ContainerName, ImageTag};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "config name '{0}' must not contain upper case characters, spaces or special characters"
    )]
    NameInvalid(String),
    #[error("config '{name}' not found at {}", path.display())]
    ConfigNotFound { name: String, path: PathBuf },
    #[error("template file does not exist: {}", path.display())]
    TemplateNotFound { template: String, path: PathBuf },
    #[error("no base image specified in config '{0}', set base image with `base_image: {{imagename}}`")]
    MissingBaseImage(String),
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
