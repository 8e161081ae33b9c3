//! Derived artifacts: the provisioning manifest and the build recipe.
//!
//! Both are pure functions of the effective [`Config`]. Generated recipe lines
//! are sorted alphabetically so the output is byte-identical across runs.

use crate::config::Config;
use std::fs;
use std::path::{Path, PathBuf};

/// Separator the provisioning tool splits its stdin on.
pub const MANIFEST_SEPARATOR: &str = "_FILE_SEPERATOR_";

/// File name of the manifest inside the build context.
pub const DEFAULT_MANIFEST_FILE: &str = "config.yaml";

/// In-container provisioning tool.
pub const PROVISIONER: &str = "/usr/local/bin/pups";

pub const DEFAULT_BOOT_COMMAND: &str = "/sbin/boot";

const MANIFEST_TEMP_PATH: &str = "/temp-config.yaml";

/// Runtime tuning variables materialized into the image even without bake-env.
pub const DEFAULT_BAKE_ENV: &[&str] = &[
    "UNICORN_WORKERS",
    "UNICORN_SIDEKIQS",
    "RUBY_GC_HEAP_GROWTH_MAX_SLOTS",
    "RUBY_GC_HEAP_INIT_SLOTS",
    "RUBY_GC_HEAP_OLDOBJECT_LIMIT_FACTOR",
    "CREATE_DB_ON_BOOT",
    "MIGRATE_ON_BOOT",
    "PRECOMPILE_ON_BOOT",
];

#[derive(Debug, Clone, Copy)]
pub struct RecipeOptions<'a> {
    /// Tag filter handed to the provisioning tool, e.g. `--skip-tags=precompile,migrate,db`.
    pub tag_filter: &'a str,
    /// Materialize every `env` key instead of only [`DEFAULT_BAKE_ENV`].
    pub bake_env: bool,
    /// Manifest file name relative to the build context.
    pub manifest_file: &'a str,
}

impl Default for RecipeOptions<'_> {
    fn default() -> Self {
        Self {
            tag_filter: "",
            bake_env: false,
            manifest_file: DEFAULT_MANIFEST_FILE,
        }
    }
}

impl Config {
    /// All raw documents joined with [`MANIFEST_SEPARATOR`], in merge order.
    pub fn manifest(&self) -> String {
        self.raw_documents().join(MANIFEST_SEPARATOR)
    }

    /// Write the manifest to `dir/file_name` and return the written path.
    pub fn write_manifest(&self, dir: &Path, file_name: &str) -> std::io::Result<PathBuf> {
        let path = dir.join(file_name);
        fs::write(&path, self.manifest())?;
        Ok(path)
    }

    pub fn recipe(&self, options: &RecipeOptions<'_>) -> String {
        let mut lines = vec![
            format!("ARG dockerfile_from_image={}", self.base_image),
            "FROM ${dockerfile_from_image}".to_owned(),
        ];
        lines.extend(self.arg_lines());
        lines.extend(self.env_lines(options.bake_env));
        lines.extend(self.expose_lines());
        lines.push(format!("COPY {} {MANIFEST_TEMP_PATH}", options.manifest_file));
        lines.push(provision_line(options.tag_filter));
        lines.push(format!("CMD [\"{}\"]", self.boot_command()));
        lines.join("\n")
    }

    fn arg_lines(&self) -> Vec<String> {
        sorted(self.env.keys().map(|k| format!("ARG {k}")))
    }

    fn env_lines(&self, bake_env: bool) -> Vec<String> {
        sorted(
            self.env
                .keys()
                .filter(|k| bake_env || DEFAULT_BAKE_ENV.contains(&k.as_str()))
                .map(|k| format!("ENV {k}=${{{k}}}")),
        )
    }

    fn expose_lines(&self) -> Vec<String> {
        sorted(self.expose.iter().map(|spec| {
            let port = spec.split_once(':').map_or(spec.as_str(), |(_, port)| port);
            format!("EXPOSE {port}")
        }))
    }
}

fn provision_line(tag_filter: &str) -> String {
    let mut pipeline = vec![PROVISIONER];
    if !tag_filter.is_empty() {
        pipeline.push(tag_filter);
    }
    pipeline.push("--stdin");
    format!(
        "RUN cat {MANIFEST_TEMP_PATH} | {} && rm {MANIFEST_TEMP_PATH}",
        pipeline.join(" ")
    )
}

fn sorted(lines: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = lines.collect();
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigName;
    use crate::store::RawDocument;

    const TEMPLATE: &str = r#"
base_image: discourse/base:2.0
env:
  LANG: en_US.UTF-8
  UNICORN_WORKERS: 3
  RUBY_GC_HEAP_INIT_SLOTS: 400000
expose:
  - "80"
params:
  version: tests-passed
"#;

    const BASE: &str = r#"
templates:
  - web.template.yml
expose:
  - "90"
  - "8443:443"
  - "80:80"
env:
  DISCOURSE_DB_PASSWORD: SOME_SECRET
  RAILS_ENV: production
"#;

    fn config() -> Config {
        Config::compose(
            ConfigName::parse("test").unwrap(),
            vec![RawDocument::from_text("web.template.yml", TEMPLATE).unwrap()],
            RawDocument::from_text("test.yml", BASE).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn manifest_joins_documents_in_merge_order() {
        let manifest = config().manifest();
        assert_eq!(manifest, format!("{TEMPLATE}{MANIFEST_SEPARATOR}{BASE}"));
        assert!(manifest.contains("version: tests-passed"));
    }

    #[test]
    fn recipe_with_default_bake_env() {
        let recipe = config().recipe(&RecipeOptions {
            tag_filter: "--skip-tags=precompile,migrate,db",
            ..RecipeOptions::default()
        });
        let expected = "\
ARG dockerfile_from_image=discourse/base:2.0
FROM ${dockerfile_from_image}
ARG DISCOURSE_DB_PASSWORD
ARG LANG
ARG RAILS_ENV
ARG RUBY_GC_HEAP_INIT_SLOTS
ARG UNICORN_WORKERS
ENV RUBY_GC_HEAP_INIT_SLOTS=${RUBY_GC_HEAP_INIT_SLOTS}
ENV UNICORN_WORKERS=${UNICORN_WORKERS}
EXPOSE 443
EXPOSE 80
EXPOSE 90
COPY config.yaml /temp-config.yaml
RUN cat /temp-config.yaml | /usr/local/bin/pups --skip-tags=precompile,migrate,db --stdin && rm /temp-config.yaml
CMD [\"/sbin/boot\"]";
        assert_eq!(recipe, expected);
    }

    #[test]
    fn recipe_with_baked_env_materializes_every_key() {
        let recipe = config().recipe(&RecipeOptions {
            bake_env: true,
            ..RecipeOptions::default()
        });
        let env_lines: Vec<&str> = recipe.lines().filter(|l| l.starts_with("ENV ")).collect();
        assert_eq!(
            env_lines,
            vec![
                "ENV DISCOURSE_DB_PASSWORD=${DISCOURSE_DB_PASSWORD}",
                "ENV LANG=${LANG}",
                "ENV RAILS_ENV=${RAILS_ENV}",
                "ENV RUBY_GC_HEAP_INIT_SLOTS=${RUBY_GC_HEAP_INIT_SLOTS}",
                "ENV UNICORN_WORKERS=${UNICORN_WORKERS}",
            ]
        );
    }

    #[test]
    fn default_bake_never_contains_known_secrets() {
        let recipe = config().recipe(&RecipeOptions::default());
        for secret in crate::KNOWN_SECRETS {
            assert!(
                !recipe.contains(&format!("ENV {secret}=")),
                "{secret} must not be baked by default"
            );
        }
    }

    #[test]
    fn minimal_config_scenario() {
        let config = Config::compose(
            ConfigName::parse("app").unwrap(),
            Vec::new(),
            RawDocument::from_text("app.yml", "base_image: x\nenv:\n  RAILS_ENV: production\n")
                .unwrap(),
        )
        .unwrap();
        let recipe = config.recipe(&RecipeOptions::default());
        assert!(recipe.lines().any(|l| l == "ARG RAILS_ENV"));
        assert!(!recipe.lines().any(|l| l.starts_with("ENV ")));
        assert_eq!(recipe.lines().filter(|l| l.starts_with("COPY ")).count(), 1);
        assert_eq!(recipe.lines().last(), Some("CMD [\"/sbin/boot\"]"));
        assert!(recipe.contains("/usr/local/bin/pups --stdin"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let a = config();
        let b = config();
        let opts = RecipeOptions {
            tag_filter: "--tags=db",
            bake_env: true,
            manifest_file: "manifest.yaml",
        };
        assert_eq!(a.manifest(), b.manifest());
        assert_eq!(a.recipe(&opts), b.recipe(&opts));
    }

    #[test]
    fn empty_boot_command_renders_empty_cmd() {
        let config = Config::compose(
            ConfigName::parse("app").unwrap(),
            Vec::new(),
            RawDocument::from_text("app.yml", "base_image: x\nno_boot_command: true\n").unwrap(),
        )
        .unwrap();
        assert!(config
            .recipe(&RecipeOptions::default())
            .ends_with("CMD [\"\"]"));
    }

    #[test]
    fn write_manifest_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let path = config.write_manifest(dir.path(), DEFAULT_MANIFEST_FILE).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), config.manifest());
    }
}
