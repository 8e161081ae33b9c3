use crate::document::{ConfigDocument, DeploymentShape, Link, Volume};
use crate::merge::merge_into;
use crate::render::DEFAULT_BOOT_COMMAND;
use crate::store::{ConfigStore, RawDocument};
use crate::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use tracing::{debug, info};

const CONFIG_PLACEHOLDER: &str = "{{config}}";

/// Environment variables that are private to one deployment.
///
/// They are never passed as build arguments, so they cannot end up in an image
/// meant to be shared, but they are still handed to runtime containers.
pub const KNOWN_SECRETS: &[&str] = &[
    "DISCOURSE_DB_HOST",
    "DISCOURSE_DB_PORT",
    "DISCOURSE_DB_SOCKET",
    "DISCOURSE_DB_REPLICA_HOST",
    "DISCOURSE_DB_REPLICA_PORT",
    "DISCOURSE_DB_PASSWORD",
    "DISCOURSE_REDIS_HOST",
    "DISCOURSE_REDIS_REPLICA_HOST",
    "DISCOURSE_REDIS_PASSWORD",
    "DISCOURSE_SMTP_ADDRESS",
    "DISCOURSE_SMTP_USER_NAME",
    "DISCOURSE_SMTP_PASSWORD",
    "DISCOURSE_DEVELOPER_EMAILS",
    "DISCOURSE_SECRET_KEY_BASE",
    "DISCOURSE_HOSTNAME",
    "DISCOURSE_SAML_CERT",
    "DISCOURSE_SAML_TITLE",
    "DISCOURSE_SAML_TARGET_URL",
    "DISCOURSE_SAML_NAME_IDENTIFIER_FORMAT",
];

pub fn is_known_secret(key: &str) -> bool {
    KNOWN_SECRETS.contains(&key)
}

/// A validated configuration name: `[a-z0-9-_]+`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigName(String);

impl ConfigName {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let valid = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(name.to_owned()))
        } else {
            Err(ConfigError::NameInvalid(name.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ConfigName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConfigName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The effective configuration: every template and the base document merged,
/// placeholders substituted, and invariants checked.
///
/// Built once per invocation and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub name: ConfigName,
    pub base_image: String,
    pub run_image: Option<String>,
    pub boot_command: Option<String>,
    pub no_boot_command: bool,
    pub docker_args: Option<String>,
    pub deployment: DeploymentShape,
    pub templates: Vec<String>,
    pub expose: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub volumes: Vec<Volume>,
    pub links: Vec<Link>,
    raw_documents: Vec<String>,
}

impl Config {
    /// Load `<conf_dir>/<name>.yml` and every template it lists.
    ///
    /// The name is validated before any file is touched.
    pub fn load(store: &ConfigStore, name: &str) -> Result<Self, ConfigError> {
        let name = ConfigName::parse(name)?;
        let base = store.read_base(&name)?;
        let template_names = base.document.templates.clone().unwrap_or_default();

        let mut templates = Vec::with_capacity(template_names.len());
        for template in &template_names {
            templates.push(store.read_template(template)?);
        }

        let config = Self::compose(name, templates, base)?;
        info!(
            "loaded config '{}' from {} document(s)",
            config.name,
            config.raw_documents.len()
        );
        Ok(config)
    }

    /// Merge `templates` in order, then `base`, into one effective configuration.
    pub fn compose(
        name: ConfigName,
        templates: Vec<RawDocument>,
        base: RawDocument,
    ) -> Result<Self, ConfigError> {
        let mut merged = ConfigDocument::default();
        let mut raw_documents = Vec::with_capacity(templates.len() + 1);

        for template in templates.into_iter().chain(std::iter::once(base)) {
            debug!("merging {}", template.path.display());
            merge_into(&mut merged, template.document);
            raw_documents.push(template.text);
        }

        let mut env = merged.env.unwrap_or_default();
        let mut labels = merged.labels.unwrap_or_default();
        substitute_placeholder(&mut env, &name);
        substitute_placeholder(&mut labels, &name);

        let base_image = merged.base_image.unwrap_or_default().trim().to_owned();
        if base_image.is_empty() {
            return Err(ConfigError::MissingBaseImage(name.to_string()));
        }

        Ok(Self {
            name,
            base_image,
            run_image: merged.run_image.filter(|s| !s.trim().is_empty()),
            boot_command: merged.boot_command.filter(|s| !s.is_empty()),
            no_boot_command: merged.no_boot_command.unwrap_or(false),
            docker_args: merged.docker_args,
            deployment: merged.deployment.unwrap_or_default(),
            templates: merged.templates.unwrap_or_default(),
            expose: merged.expose.unwrap_or_default(),
            env,
            labels,
            volumes: merged
                .volumes
                .unwrap_or_default()
                .into_iter()
                .map(|v| v.volume)
                .collect(),
            links: merged
                .links
                .unwrap_or_default()
                .into_iter()
                .map(|l| l.link)
                .collect(),
            raw_documents,
        })
    }

    /// Verbatim text of every contributing document, in merge order.
    pub fn raw_documents(&self) -> &[String] {
        &self.raw_documents
    }

    /// Explicit boot command, else empty when `no_boot_command` is set, else the default.
    pub fn boot_command(&self) -> &str {
        match &self.boot_command {
            Some(cmd) => cmd,
            None if self.no_boot_command => "",
            None => DEFAULT_BOOT_COMMAND,
        }
    }

    /// `(key, value)` pairs of `env`, sorted by key, optionally without known secrets.
    pub fn env_pairs(&self, include_known_secrets: bool) -> Vec<(&str, &str)> {
        self.env
            .iter()
            .filter(|(k, _)| include_known_secrets || !is_known_secret(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Sorted `KEY=VALUE` strings, optionally without known secrets.
    pub fn env_slice(&self, include_known_secrets: bool) -> Vec<String> {
        self.env_pairs(include_known_secrets)
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }

    /// Extra engine flags from `docker_args`, split on whitespace.
    pub fn docker_args(&self) -> Vec<&str> {
        self.docker_args
            .as_deref()
            .map(|args| args.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Container hostname.
    ///
    /// Uses `DISCOURSE_HOSTNAME` when `DOCKER_USE_HOSTNAME` is present in `env`,
    /// otherwise `default_hostname`. Anything outside `[a-zA-Z-]` becomes `-`.
    pub fn hostname(&self, default_hostname: &str) -> String {
        let raw = if self.env.contains_key("DOCKER_USE_HOSTNAME") {
            self.env
                .get("DISCOURSE_HOSTNAME")
                .map_or("", String::as_str)
        } else {
            default_hostname
        };
        raw.chars()
            .map(|c| if c.is_ascii_alphabetic() || c == '-' { c } else { '-' })
            .collect()
    }
}

fn substitute_placeholder(values: &mut BTreeMap<String, String>, name: &ConfigName) {
    for value in values.values_mut() {
        if value.contains(CONFIG_PLACEHOLDER) {
            *value = value.replace(CONFIG_PLACEHOLDER, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(path: &str, text: &str) -> RawDocument {
        RawDocument::from_text(path, text).unwrap()
    }

    fn compose(name: &str, templates: &[&str], base: &str) -> Result<Config, ConfigError> {
        let templates = templates
            .iter()
            .enumerate()
            .map(|(i, t)| raw(&format!("t{i}.yml"), t))
            .collect();
        Config::compose(ConfigName::parse(name).unwrap(), templates, raw("base.yml", base))
    }

    #[test]
    fn name_validation() {
        assert!(ConfigName::parse("app").is_ok());
        assert!(ConfigName::parse("web_only-2").is_ok());
        for bad in ["", "App", "my app", "a/b", "x!", "semi;colon", "dollar$"] {
            assert!(
                matches!(ConfigName::parse(bad), Err(ConfigError::NameInvalid(_))),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn base_wins_over_every_template() {
        let config = compose(
            "app",
            &["base_image: x\nenv:\n  KEY: t1\n", "env:\n  KEY: t2\n"],
            "env:\n  KEY: base\n",
        )
        .unwrap();
        assert_eq!(config.env["KEY"], "base");
    }

    #[test]
    fn later_template_wins_over_earlier() {
        let config = compose(
            "app",
            &["base_image: one\n", "base_image: two\n"],
            "templates: []\n",
        )
        .unwrap();
        assert_eq!(config.base_image, "two");
    }

    #[test]
    fn raw_documents_follow_merge_order() {
        let config = compose("app", &["base_image: x\n", "env: {}\n"], "labels: {}\n").unwrap();
        assert_eq!(
            config.raw_documents(),
            ["base_image: x\n", "env: {}\n", "labels: {}\n"]
        );
    }

    #[test]
    fn placeholder_replaced_in_env_and_labels() {
        let config = compose(
            "app",
            &["env:\n  PATH_IN: /shared/{{config}}/{{config}}\n"],
            "base_image: x\nlabels:\n  name: '{{config}}'\n",
        )
        .unwrap();
        assert_eq!(config.env["PATH_IN"], "/shared/app/app");
        assert_eq!(config.labels["name"], "app");
    }

    #[test]
    fn missing_base_image_fails() {
        let err = compose("app", &[], "env:\n  A: b\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingBaseImage(name) if name == "app"));
    }

    #[test]
    fn blank_base_image_fails() {
        let err = compose("app", &[], "base_image: '  '\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingBaseImage(_)));
    }

    #[test]
    fn boot_command_precedence() {
        let default = compose("app", &[], "base_image: x\n").unwrap();
        assert_eq!(default.boot_command(), DEFAULT_BOOT_COMMAND);

        let none = compose("app", &[], "base_image: x\nno_boot_command: true\n").unwrap();
        assert_eq!(none.boot_command(), "");

        let explicit = compose(
            "app",
            &[],
            "base_image: x\nno_boot_command: true\nboot_command: /bin/run\n",
        )
        .unwrap();
        assert_eq!(explicit.boot_command(), "/bin/run");
    }

    #[test]
    fn env_slice_filters_known_secrets() {
        let config = compose(
            "app",
            &[],
            "base_image: x\nenv:\n  LANG: C\n  DISCOURSE_DB_PASSWORD: hunter2\n",
        )
        .unwrap();
        assert_eq!(config.env_slice(false), vec!["LANG=C"]);
        assert_eq!(
            config.env_slice(true),
            vec!["DISCOURSE_DB_PASSWORD=hunter2", "LANG=C"]
        );
    }

    #[test]
    fn docker_args_split_on_whitespace() {
        let config = compose("app", &[], "base_image: x\ndocker_args: '--cpus 2  --memory 1g'\n")
            .unwrap();
        assert_eq!(config.docker_args(), vec!["--cpus", "2", "--memory", "1g"]);
    }

    #[test]
    fn hostname_from_env_is_sanitized() {
        let config = compose(
            "app",
            &[],
            "base_image: x\nenv:\n  DOCKER_USE_HOSTNAME: 'true'\n  DISCOURSE_HOSTNAME: 'asdf!@#$%^&*()ASDF'\n",
        )
        .unwrap();
        assert_eq!(config.hostname("ignored"), "asdf----------ASDF");
    }

    #[test]
    fn hostname_falls_back_to_default() {
        let config = compose("app", &[], "base_image: x\n").unwrap();
        assert_eq!(config.hostname("asdf!@#"), "asdf---");
    }

    #[test]
    fn deployment_defaults_to_standalone() {
        let config = compose("app", &[], "base_image: x\n").unwrap();
        assert_eq!(config.deployment, DeploymentShape::Standalone);

        let web = compose("app", &["deployment: web_only\n"], "base_image: x\n").unwrap();
        assert_eq!(web.deployment, DeploymentShape::WebOnly);
    }
}
