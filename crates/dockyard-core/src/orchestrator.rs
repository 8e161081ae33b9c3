use crate::lifecycle::{ContainerState, Step};
use crate::plugins::detect_bundled_plugin;
use crate::scratch::ScratchDir;
use crate::settings::Settings;
use crate::CoreError;
use chrono::{SecondsFormat, Utc};
use dockyard_runtime::{
    flags_set_tag, BuildSpec, CommandOutput, CommandRunner, DockerCli, Invocation, RestartPolicy,
    RunSpec,
};
use dockyard_schema::{
    Config, ContainerName, DeploymentShape, ImageTag, RecipeOptions, DEFAULT_MANIFEST_FILE,
    PROVISIONER,
};
use tracing::{debug, info, warn};

/// Provisioning tags run while building the image.
pub const BUILD_TAG_FILTER: &str = "--skip-tags=precompile,migrate,db";
pub const MIGRATE_TAG_FILTER: &str = "--tags=db,migrate";
pub const CONFIGURE_TAG_FILTER: &str = "--tags=db,precompile";

const SKIP_ASSET_COMPILE: &str = "SKIP_EMBER_CLI_COMPILE=1";
const SKIP_POST_DEPLOYMENT: &str = "SKIP_POST_DEPLOYMENT_MIGRATIONS=1";
const SHM_SIZE: &str = "512m";
const TRANSIENT_PREFIX: &str = "dockyard-build-";

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Explicit output tag; wins over a tag in `extra_flags` and the default.
    pub tag: Option<ImageTag>,
    /// Passed through to `docker build` verbatim.
    pub extra_flags: Vec<String>,
    pub bake_env: bool,
}

/// Drives the container lifecycle for one configuration.
///
/// Every engine call goes through the injected [`CommandRunner`], strictly one
/// at a time. A non-zero exit aborts the current operation with
/// [`CoreError::ExternalCommandFailed`]; completed steps are never rolled back.
pub struct Orchestrator<'a> {
    runner: &'a dyn CommandRunner,
    docker: DockerCli,
    settings: Settings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, settings: Settings) -> Self {
        let docker = DockerCli::new(settings.docker_program());
        Self {
            runner,
            docker,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// `{namespace}/{config}`.
    pub fn default_tag(&self, config: &Config) -> ImageTag {
        ImageTag::default_for(&self.settings.namespace, &config.name)
    }

    /// Image the long-running container is started from.
    pub fn run_image(&self, config: &Config) -> String {
        config
            .run_image
            .clone()
            .unwrap_or_else(|| self.default_tag(config).into_inner())
    }

    pub fn is_running(&self, name: &ContainerName) -> Result<bool, CoreError> {
        let out = self.exec(Step::Query, &self.docker.ps(name, false))?;
        Ok(!out.stdout.trim().is_empty())
    }

    pub fn exists(&self, name: &ContainerName) -> Result<bool, CoreError> {
        let out = self.exec(Step::Query, &self.docker.ps(name, true))?;
        Ok(!out.stdout.trim().is_empty())
    }

    pub fn state(&self, config: &Config) -> Result<ContainerState, CoreError> {
        let name = container_name(config);
        if self.is_running(&name)? {
            return Ok(ContainerState::Running);
        }
        Ok(ContainerState::from_probes(false, self.exists(&name)?))
    }

    /// Build the image from the rendered recipe. Returns the tags passed to the engine.
    ///
    /// The manifest lives in a scratch directory that is removed whether or
    /// not the build succeeds.
    pub fn build(
        &self,
        config: &Config,
        options: &BuildOptions,
    ) -> Result<Vec<ImageTag>, CoreError> {
        info!("building image for '{}'", config.name);
        let tags = match &options.tag {
            Some(tag) => vec![tag.clone()],
            None if flags_set_tag(&options.extra_flags) => Vec::new(),
            None => vec![self.default_tag(config)],
        };

        let recipe = config.recipe(&RecipeOptions {
            tag_filter: BUILD_TAG_FILTER,
            bake_env: options.bake_env,
            manifest_file: DEFAULT_MANIFEST_FILE,
        });
        let scratch = ScratchDir::create(self.settings.build_dir.as_deref())?;
        config.write_manifest(scratch.path(), DEFAULT_MANIFEST_FILE)?;

        let spec = BuildSpec {
            context_dir: scratch.path().to_path_buf(),
            recipe,
            tags: tags.clone(),
            build_args: owned_pairs(config.env_pairs(false)),
            extra_flags: options.extra_flags.clone(),
        };
        let invocation = self.docker.build(&spec);
        let output = self.runner.run(&invocation)?;
        if !output.success() {
            let failure = failed(Step::Build, &output);
            let captured = format!("{}\n{}", output.stdout, output.stderr);
            if let Some(plugin) = detect_bundled_plugin(&captured) {
                return Err(CoreError::BundledPluginConflict {
                    plugin: plugin.to_owned(),
                    config: config.name.to_string(),
                    source: Box::new(failure),
                });
            }
            return Err(failure);
        }
        Ok(tags)
    }

    /// Run database migrations in a throwaway container from `tag`.
    pub fn migrate(
        &self,
        config: &Config,
        tag: Option<&ImageTag>,
        skip_post_deployment: bool,
    ) -> Result<(), CoreError> {
        let image = tag.cloned().unwrap_or_else(|| self.default_tag(config));
        info!(
            "migrating '{}' from {image}{}",
            config.name,
            if skip_post_deployment {
                " (skipping post-deployment migrations)"
            } else {
                ""
            }
        );
        let mut extra_env = vec![SKIP_ASSET_COMPILE.to_owned()];
        if skip_post_deployment {
            extra_env.push(SKIP_POST_DEPLOYMENT.to_owned());
        }
        let run = self.provision_run(
            config,
            &image,
            MIGRATE_TAG_FILTER,
            extra_env,
            transient_name(),
        );
        let spec = RunSpec {
            remove: true,
            ..run
        };
        self.exec(Step::Migrate, &self.docker.run(&spec))?;
        Ok(())
    }

    /// Precompile in a named container from `source`, commit it as `target`,
    /// then remove the container.
    ///
    /// Removal is attempted even when the run or the commit failed; the first
    /// failure is the one reported.
    pub fn configure(
        &self,
        config: &Config,
        source: Option<&ImageTag>,
        target: Option<&ImageTag>,
    ) -> Result<(), CoreError> {
        let source = source.cloned().unwrap_or_else(|| self.default_tag(config));
        let target = target.cloned().unwrap_or_else(|| self.default_tag(config));
        let container = transient_name();
        let spec = self.provision_run(
            config,
            &source,
            CONFIGURE_TAG_FILTER,
            vec![SKIP_ASSET_COMPILE.to_owned()],
            container.clone(),
        );
        info!("configuring '{}' in {container}: {source} -> {target}", config.name);

        let result = self
            .exec(Step::Configure, &self.docker.run(&spec))
            .and_then(|_| {
                let wait = self.settings.commit_wait();
                if !wait.is_zero() {
                    debug!("waiting {}ms before commit", wait.as_millis());
                    std::thread::sleep(wait);
                }
                let changes = [
                    format!(
                        "LABEL org.opencontainers.image.created=\"{}\"",
                        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
                    ),
                    format!("CMD [\"{}\"]", config.boot_command()),
                ];
                self.exec(Step::Commit, &self.docker.commit(&container, &target, &changes))
            });
        let cleanup = self.exec(Step::Cleanup, &self.docker.remove(&container, true));

        match (result, cleanup) {
            (Err(e), Err(cleanup_err)) => {
                warn!("failed to remove {container} after configure failure: {cleanup_err}");
                Err(e)
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Ok(_), Ok(_)) => Ok(()),
        }
    }

    /// Build, migrate and configure `tag`, stopping at the first failure.
    pub fn bootstrap(
        &self,
        config: &Config,
        tag: Option<&ImageTag>,
    ) -> Result<ImageTag, CoreError> {
        let tag = tag.cloned().unwrap_or_else(|| self.default_tag(config));
        info!("bootstrapping '{}' as {tag}", config.name);
        self.build(
            config,
            &BuildOptions {
                tag: Some(tag.clone()),
                ..BuildOptions::default()
            },
        )?;
        self.migrate(config, Some(&tag), false)?;
        self.configure(config, Some(&tag), Some(&tag))?;
        Ok(tag)
    }

    /// Ensure the container is running. Returns the state observed beforehand.
    pub fn start(&self, config: &Config) -> Result<ContainerState, CoreError> {
        let name = container_name(config);
        if self.is_running(&name)? {
            info!("{name} is already running");
            return Ok(ContainerState::Running);
        }
        if self.exists(&name)? {
            info!("starting stopped container {name}");
            self.exec(Step::Start, &self.docker.start(&name))?;
            return Ok(ContainerState::Stopped);
        }

        info!("creating and starting {name}");
        let (publish, expose): (Vec<String>, Vec<String>) =
            config.expose.iter().cloned().partition(|p| p.contains(':'));
        let boot = config.boot_command();
        let spec = RunSpec {
            image: self.run_image(config),
            name: Some(name),
            env: owned_pairs(config.env_pairs(true)),
            volumes: config.volumes.clone(),
            links: config.links.clone(),
            publish,
            expose,
            labels: config
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            hostname: Some(config.hostname(&format!("{}-{}", host_name(), config.name))),
            shm_size: Some(SHM_SIZE.to_owned()),
            restart: Some(RestartPolicy::Always),
            detach: true,
            extra_args: config.docker_args().into_iter().map(str::to_owned).collect(),
            command: if boot.is_empty() {
                Vec::new()
            } else {
                vec![boot.to_owned()]
            },
            ..RunSpec::default()
        };
        self.exec(Step::Start, &self.docker.run(&spec))?;
        Ok(ContainerState::Absent)
    }

    /// Stop the container if it exists. Returns whether a stop was issued.
    pub fn stop(&self, config: &Config) -> Result<bool, CoreError> {
        let name = container_name(config);
        if !self.exists(&name)? {
            info!("{name} does not exist, nothing to stop");
            return Ok(false);
        }
        info!("stopping {name}");
        self.exec(
            Step::Stop,
            &self.docker.stop(&name, self.settings.stop_grace_secs),
        )?;
        Ok(true)
    }

    pub fn restart(&self, config: &Config) -> Result<ContainerState, CoreError> {
        self.stop(config)?;
        self.start(config)
    }

    /// Stop and remove the container if it exists. Returns whether it existed.
    pub fn destroy(&self, config: &Config) -> Result<bool, CoreError> {
        let name = container_name(config);
        if !self.exists(&name)? {
            info!("{name} does not exist, nothing to destroy");
            return Ok(false);
        }
        info!("destroying {name}");
        self.exec(
            Step::Stop,
            &self.docker.stop(&name, self.settings.stop_grace_secs),
        )?;
        self.exec(Step::Destroy, &self.docker.remove(&name, false))?;
        Ok(true)
    }

    /// Replace the running container with one built from the current config.
    ///
    /// `standalone` stops first, so the old container holds no database
    /// connections during migration. `web_only` keeps the old container
    /// serving until the new image is committed and runs post-deployment
    /// migrations only after the new container has started.
    pub fn rebuild(&self, config: &Config) -> Result<(), CoreError> {
        info!("rebuilding '{}' ({:?})", config.name, config.deployment);
        let tag = self.default_tag(config);
        let build = BuildOptions {
            tag: Some(tag.clone()),
            ..BuildOptions::default()
        };
        match config.deployment {
            DeploymentShape::Standalone => {
                self.stop(config)?;
                self.build(config, &build)?;
                self.migrate(config, Some(&tag), false)?;
                self.configure(config, Some(&tag), Some(&tag))?;
                self.destroy(config)?;
                self.start(config)?;
            }
            DeploymentShape::WebOnly => {
                self.build(config, &build)?;
                self.migrate(config, Some(&tag), true)?;
                self.configure(config, Some(&tag), Some(&tag))?;
                self.destroy(config)?;
                self.start(config)?;
                self.migrate(config, Some(&tag), false)?;
            }
        }
        Ok(())
    }

    /// One-shot provisioning container: manifest on stdin, interactive,
    /// never restarted.
    fn provision_run(
        &self,
        config: &Config,
        image: &ImageTag,
        tag_filter: &str,
        extra_env: Vec<String>,
        name: ContainerName,
    ) -> RunSpec {
        RunSpec {
            image: image.to_string(),
            name: Some(name),
            env: owned_pairs(config.env_pairs(true)),
            literal_env: extra_env,
            volumes: config.volumes.clone(),
            links: config.links.clone(),
            shm_size: Some(SHM_SIZE.to_owned()),
            restart: Some(RestartPolicy::No),
            interactive: true,
            command: vec![
                "/bin/bash".to_owned(),
                "-c".to_owned(),
                format!("{PROVISIONER} --stdin {tag_filter}"),
            ],
            stdin: Some(config.manifest()),
            ..RunSpec::default()
        }
    }

    fn exec(&self, step: Step, invocation: &Invocation) -> Result<CommandOutput, CoreError> {
        let output = self.runner.run(invocation)?;
        if output.success() {
            Ok(output)
        } else {
            Err(failed(step, &output))
        }
    }
}

fn container_name(config: &Config) -> ContainerName {
    ContainerName::new(config.name.as_str())
}

/// Name for a one-shot provisioning container.
fn transient_name() -> ContainerName {
    ContainerName::new(format!("{TRANSIENT_PREFIX}{}", uuid::Uuid::new_v4()))
}

fn failed(step: Step, output: &CommandOutput) -> CoreError {
    CoreError::ExternalCommandFailed {
        step,
        code: output.code,
        stderr: output.stderr.trim().to_owned(),
    }
}

fn owned_pairs(pairs: Vec<(&str, &str)>) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

fn host_name() -> String {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .find_map(|path| {
            let name = std::fs::read_to_string(path).ok()?;
            let name = name.trim();
            (!name.is_empty()).then(|| name.to_owned())
        })
        .unwrap_or_else(|| "docker".to_owned())
}
