use crate::config::ConfigName;
use crate::document::ConfigDocument;
use crate::ConfigError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

pub const CONFIG_EXTENSION: &str = "yml";

/// A document as read from disk: its location, verbatim text, and parsed form.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub path: PathBuf,
    pub text: String,
    pub document: ConfigDocument,
}

impl RawDocument {
    /// Parse `text` as if it had been read from `path`.
    pub fn from_text(
        path: impl Into<PathBuf>,
        text: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = text.into();
        let document = ConfigDocument::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            text,
            document,
        })
    }
}

/// Read-only access to base configurations and templates on disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    conf_dir: PathBuf,
    templates_dir: PathBuf,
}

impl ConfigStore {
    pub fn new(conf_dir: impl Into<PathBuf>, templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            conf_dir: conf_dir.into(),
            templates_dir: templates_dir.into(),
        }
    }

    pub fn conf_dir(&self) -> &Path {
        &self.conf_dir
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    pub fn config_path(&self, name: &ConfigName) -> PathBuf {
        self.conf_dir.join(format!("{name}.{CONFIG_EXTENSION}"))
    }

    pub fn template_path(&self, template: &str) -> PathBuf {
        self.templates_dir.join(template)
    }

    pub fn read_base(&self, name: &ConfigName) -> Result<RawDocument, ConfigError> {
        let path = self.config_path(name);
        debug!("reading config {}", path.display());
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::ConfigNotFound {
                    name: name.to_string(),
                    path,
                });
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        RawDocument::from_text(path, text)
    }

    pub fn read_template(&self, template: &str) -> Result<RawDocument, ConfigError> {
        let path = self.template_path(template);
        debug!("reading template {}", path.display());
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!("template file does not exist: {}", path.display());
                return Err(ConfigError::TemplateNotFound {
                    template: template.to_owned(),
                    path,
                });
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        RawDocument::from_text(path, text)
    }

    /// Names of every `*.yml` config in the config directory, sorted.
    pub fn list(&self) -> Result<Vec<String>, ConfigError> {
        let entries = fs::read_dir(&self.conf_dir).map_err(|source| ConfigError::Io {
            path: self.conf_dir.clone(),
            source,
        })?;
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(CONFIG_EXTENSION) {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| ConfigName::parse(s).is_ok())
                    .map(str::to_owned)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("containers");
        fs::create_dir_all(&conf).unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let store = ConfigStore::new(conf, dir.path());
        (dir, store)
    }

    #[test]
    fn reads_base_document_verbatim() {
        let text = "base_image: x\n# keep me\n";
        let (_dir, store) = store_with(&[("containers/app.yml", text)]);
        let name = ConfigName::parse("app").unwrap();
        let raw = store.read_base(&name).unwrap();
        assert_eq!(raw.text, text);
        assert_eq!(raw.document.base_image.as_deref(), Some("x"));
    }

    #[test]
    fn missing_base_is_config_not_found() {
        let (_dir, store) = store_with(&[]);
        let name = ConfigName::parse("absent").unwrap();
        let err = store.read_base(&name).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotFound { .. }));
    }

    #[test]
    fn missing_template_is_template_not_found() {
        let (_dir, store) = store_with(&[]);
        let err = store.read_template("templates/nope.yml").unwrap_err();
        match err {
            ConfigError::TemplateNotFound { template, .. } => {
                assert_eq!(template, "templates/nope.yml");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_error_names_the_file() {
        let (_dir, store) = store_with(&[("containers/bad.yml", "env: [unclosed\n")]);
        let name = ConfigName::parse("bad").unwrap();
        let err = store.read_base(&name).unwrap_err();
        assert!(err.to_string().contains("bad.yml"));
    }

    #[test]
    fn list_returns_sorted_valid_names() {
        let (_dir, store) = store_with(&[
            ("containers/web_only.yml", "base_image: x\n"),
            ("containers/app.yml", "base_image: x\n"),
            ("containers/Bad Name.yml", "base_image: x\n"),
            ("containers/notes.txt", "ignored"),
        ]);
        assert_eq!(store.list().unwrap(), vec!["app", "web_only"]);
    }
}
