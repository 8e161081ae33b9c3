use crate::runner::Invocation;
use dockyard_schema::{ContainerName, ImageTag, Link, Volume};
use std::path::PathBuf;

/// Restart policy passed as `--restart=<policy>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    No,
    Always,
}

impl RestartPolicy {
    fn as_flag(self) -> &'static str {
        match self {
            Self::No => "--restart=no",
            Self::Always => "--restart=always",
        }
    }
}

/// Inputs of an image build.
#[derive(Debug, Clone, Default)]
pub struct BuildSpec {
    /// Build context; the recipe itself is read from stdin.
    pub context_dir: PathBuf,
    pub recipe: String,
    pub tags: Vec<ImageTag>,
    /// Passed as `--build-arg KEY`, with the value in the child environment.
    pub build_args: Vec<(String, String)>,
    pub extra_flags: Vec<String>,
}

/// Inputs of a `run` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunSpec {
    pub image: String,
    pub name: Option<ContainerName>,
    /// Passed as `--env KEY`, with the value in the child environment.
    pub env: Vec<(String, String)>,
    /// Passed verbatim as `--env KEY=VALUE`.
    pub literal_env: Vec<String>,
    pub volumes: Vec<Volume>,
    pub links: Vec<Link>,
    pub publish: Vec<String>,
    pub expose: Vec<String>,
    pub labels: Vec<(String, String)>,
    pub hostname: Option<String>,
    pub shm_size: Option<String>,
    pub restart: Option<RestartPolicy>,
    pub detach: bool,
    pub remove: bool,
    pub interactive: bool,
    pub extra_args: Vec<String>,
    pub command: Vec<String>,
    pub stdin: Option<String>,
}

/// Builds invocations of the `docker` command line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn invocation(&self) -> Invocation {
        Invocation::new(self.program.clone())
    }

    /// `ps` filtered to exactly `name`; `all` includes stopped containers.
    pub fn ps(&self, name: &ContainerName, all: bool) -> Invocation {
        let mut inv = self.invocation().arg("ps");
        if all {
            inv = inv.arg("--all");
        }
        inv.args(["--quiet", "--filter"])
            .arg(format!("name=^{name}$"))
    }

    pub fn build(&self, spec: &BuildSpec) -> Invocation {
        let mut inv = self.invocation().arg("build");
        for (key, value) in &spec.build_args {
            inv = inv.arg("--build-arg").arg(key.clone()).env(key.clone(), value.clone());
        }
        inv = inv.args(["--no-cache", "--pull", "--force-rm"]);
        for tag in &spec.tags {
            inv = inv.arg("--tag").arg(tag.as_str());
        }
        inv.args(spec.extra_flags.iter().cloned())
            .args(["--file", "-", "."])
            .current_dir(spec.context_dir.clone())
            .stdin(spec.recipe.clone())
    }

    pub fn run(&self, spec: &RunSpec) -> Invocation {
        let mut inv = self.invocation().arg("run");
        if spec.remove {
            inv = inv.arg("--rm");
        }
        for (key, value) in &spec.env {
            inv = inv.arg("--env").arg(key.clone()).env(key.clone(), value.clone());
        }
        for literal in &spec.literal_env {
            inv = inv.arg("--env").arg(literal.clone());
        }
        for volume in &spec.volumes {
            inv = inv
                .arg("--volume")
                .arg(format!("{}:{}", volume.host, volume.guest));
        }
        for link in &spec.links {
            inv = inv.arg("--link").arg(format!("{}:{}", link.name, link.alias));
        }
        for port in &spec.publish {
            inv = inv.arg("--publish").arg(port.clone());
        }
        for port in &spec.expose {
            inv = inv.arg("--expose").arg(port.clone());
        }
        for (key, value) in &spec.labels {
            inv = inv.arg("--label").arg(format!("{key}={value}"));
        }
        if let Some(hostname) = &spec.hostname {
            inv = inv.arg("--hostname").arg(hostname.clone());
        }
        if let Some(size) = &spec.shm_size {
            inv = inv.arg(format!("--shm-size={size}"));
        }
        if let Some(policy) = spec.restart {
            inv = inv.arg(policy.as_flag());
        }
        if spec.detach {
            inv = inv.arg("--detach");
        }
        if spec.interactive {
            inv = inv.arg("--interactive");
        }
        inv = inv.args(spec.extra_args.iter().cloned());
        if let Some(name) = &spec.name {
            inv = inv.arg("--name").arg(name.as_str());
        }
        inv = inv
            .arg(spec.image.clone())
            .args(spec.command.iter().cloned());
        if let Some(input) = &spec.stdin {
            inv = inv.stdin(input.clone());
        }
        inv
    }

    pub fn commit(&self, container: &ContainerName, image: &ImageTag, changes: &[String]) -> Invocation {
        let mut inv = self.invocation().arg("commit");
        for change in changes {
            inv = inv.arg("--change").arg(change.clone());
        }
        inv.arg(container.as_str()).arg(image.as_str())
    }

    pub fn start(&self, name: &ContainerName) -> Invocation {
        self.invocation().arg("start").arg(name.as_str())
    }

    pub fn stop(&self, name: &ContainerName, grace_secs: u64) -> Invocation {
        self.invocation()
            .args(["stop", "--time"])
            .arg(grace_secs.to_string())
            .arg(name.as_str())
    }

    pub fn remove(&self, name: &ContainerName, force: bool) -> Invocation {
        let mut inv = self.invocation().arg("rm");
        if force {
            inv = inv.arg("--force");
        }
        inv.arg(name.as_str())
    }
}

/// Whether `flags` already name an output tag (`-t X`, `-t=X`, `--tag X`, `--tag=X`).
pub fn flags_set_tag(flags: &[String]) -> bool {
    flags
        .iter()
        .any(|f| f == "-t" || f == "--tag" || f.starts_with("-t=") || f.starts_with("--tag="))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docker() -> DockerCli {
        DockerCli::new("docker")
    }

    #[test]
    fn ps_filters_exact_name() {
        let name = ContainerName::new("app");
        assert_eq!(
            docker().ps(&name, false).command_line(),
            "docker ps --quiet --filter name=^app$"
        );
        assert_eq!(
            docker().ps(&name, true).command_line(),
            "docker ps --all --quiet --filter name=^app$"
        );
    }

    #[test]
    fn build_keeps_values_out_of_argv() {
        let spec = BuildSpec {
            context_dir: PathBuf::from("/tmp/ctx"),
            recipe: "FROM x".to_owned(),
            tags: vec![ImageTag::new("local/app")],
            build_args: vec![("LANG".to_owned(), "C.UTF-8".to_owned())],
            extra_flags: vec!["--platform".to_owned(), "linux/amd64".to_owned()],
        };
        let inv = docker().build(&spec);
        assert_eq!(
            inv.command_line(),
            "docker build --build-arg LANG --no-cache --pull --force-rm --tag local/app \
             --platform linux/amd64 --file - ."
        );
        assert_eq!(inv.env, vec![("LANG".to_owned(), "C.UTF-8".to_owned())]);
        assert_eq!(inv.dir, Some(PathBuf::from("/tmp/ctx")));
        assert_eq!(inv.stdin.as_deref(), Some("FROM x"));
    }

    #[test]
    fn run_orders_flags_before_name_and_image() {
        let spec = RunSpec {
            image: "local/app".to_owned(),
            name: Some(ContainerName::new("app")),
            env: vec![("SECRET".to_owned(), "s3cr3t".to_owned())],
            literal_env: vec!["SKIP=1".to_owned()],
            volumes: vec![Volume {
                host: "/host".to_owned(),
                guest: "/guest".to_owned(),
            }],
            links: vec![Link {
                name: "data".to_owned(),
                alias: "db".to_owned(),
            }],
            shm_size: Some("512m".to_owned()),
            restart: Some(RestartPolicy::No),
            remove: true,
            interactive: true,
            command: vec!["/bin/bash".to_owned(), "-c".to_owned(), "true".to_owned()],
            ..RunSpec::default()
        };
        let inv = docker().run(&spec);
        assert_eq!(
            inv.command_line(),
            "docker run --rm --env SECRET --env SKIP=1 --volume /host:/guest --link data:db \
             --shm-size=512m --restart=no --interactive --name app local/app /bin/bash -c true"
        );
        assert!(!inv.command_line().contains("s3cr3t"));
        assert_eq!(inv.env[0].1, "s3cr3t");
    }

    #[test]
    fn lifecycle_commands() {
        let name = ContainerName::new("app");
        assert_eq!(docker().start(&name).command_line(), "docker start app");
        assert_eq!(
            docker().stop(&name, 600).command_line(),
            "docker stop --time 600 app"
        );
        assert_eq!(docker().remove(&name, false).command_line(), "docker rm app");
        assert_eq!(
            docker().remove(&name, true).command_line(),
            "docker rm --force app"
        );
        assert_eq!(
            docker()
                .commit(&name, &ImageTag::new("local/app"), &["CMD [\"/sbin/boot\"]".to_owned()])
                .command_line(),
            "docker commit --change CMD [\"/sbin/boot\"] app local/app"
        );
    }

    #[test]
    fn detects_tag_flags() {
        let flags = |v: &[&str]| v.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();
        assert!(flags_set_tag(&flags(&["-t", "x"])));
        assert!(flags_set_tag(&flags(&["-t=x"])));
        assert!(flags_set_tag(&flags(&["--tag", "x"])));
        assert!(flags_set_tag(&flags(&["--tag=x"])));
        assert!(!flags_set_tag(&flags(&["--platform", "linux/amd64"])));
        assert!(!flags_set_tag(&flags(&["--target"])));
    }
}
