use crate::runner::{CommandOutput, CommandRunner, Invocation};
use crate::RuntimeError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct FakeState {
    /// Container name -> running.
    containers: HashMap<String, bool>,
    invocations: Vec<Invocation>,
    /// (command line fragment, stderr) pairs that make a matching call exit 1.
    failures: Vec<(String, String)>,
}

/// In-memory stand-in for the container engine.
///
/// Records every invocation and simulates the container table for `ps`,
/// `run`, `start`, `stop` and `rm`, so lifecycle logic can be tested without
/// a daemon. Any other subcommand succeeds with empty output.
#[derive(Default)]
pub struct FakeRunner {
    state: Mutex<FakeState>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a container that already exists.
    #[must_use]
    pub fn with_container(self, name: &str, running: bool) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.containers.insert(name.to_owned(), running);
        }
        self
    }

    /// Make every invocation whose command line contains `pattern` exit 1 with `stderr`.
    #[must_use]
    pub fn fail_when(self, pattern: &str, stderr: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failures.push((pattern.to_owned(), stderr.to_owned()));
        }
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().map(|s| s.invocations.clone()).unwrap_or_default()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    /// Engine subcommands in call order, e.g. `["ps", "stop", "build"]`.
    pub fn subcommands(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .filter_map(|inv| inv.subcommand().map(str::to_owned))
            .collect()
    }

    /// `None` when absent, otherwise whether the container is running.
    pub fn container_state(&self, name: &str) -> Option<bool> {
        self.lock().ok()?.containers.get(name).copied()
    }

    fn lock(&self) -> Result<MutexGuard<'_, FakeState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RuntimeError> {
        let mut state = self.lock()?;
        state.invocations.push(invocation.clone());

        let line = invocation.command_line();
        if let Some((_, stderr)) = state.failures.iter().find(|(p, _)| line.contains(p.as_str())) {
            return Ok(failed(stderr));
        }

        let args = &invocation.args;
        let has = |flag: &str| args.iter().any(|a| a == flag);
        let last = args.last().map(String::as_str).unwrap_or_default();

        let output = match invocation.subcommand() {
            Some("ps") => {
                let name = args
                    .iter()
                    .find_map(|a| a.strip_prefix("name="))
                    .map(|n| n.trim_start_matches('^').trim_end_matches('$'))
                    .unwrap_or_default();
                match state.containers.get(name) {
                    Some(&running) if running || has("--all") => ok(&format!("{name}-id\n")),
                    _ => ok(""),
                }
            }
            Some("run") => {
                let name = args
                    .iter()
                    .position(|a| a == "--name")
                    .and_then(|i| args.get(i + 1))
                    .cloned();
                match name {
                    Some(name) if state.containers.contains_key(&name) => failed(&format!(
                        "Conflict. The container name \"/{name}\" is already in use"
                    )),
                    Some(name) if !has("--rm") => {
                        state.containers.insert(name, has("--detach"));
                        ok("")
                    }
                    _ => ok(""),
                }
            }
            Some("start") => match state.containers.get_mut(last) {
                Some(running) => {
                    *running = true;
                    ok(&format!("{last}\n"))
                }
                None => failed(&format!("No such container: {last}")),
            },
            Some("stop") => match state.containers.get_mut(last) {
                Some(running) => {
                    *running = false;
                    ok(&format!("{last}\n"))
                }
                None => failed(&format!("No such container: {last}")),
            },
            Some("rm") => match state.containers.get(last).copied() {
                Some(true) if !has("--force") => {
                    failed(&format!("cannot remove running container {last}"))
                }
                Some(_) => {
                    state.containers.remove(last);
                    ok(&format!("{last}\n"))
                }
                None => failed(&format!("No such container: {last}")),
            },
            _ => ok(""),
        };
        Ok(output)
    }
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        code: Some(0),
        stdout: stdout.to_owned(),
        stderr: String::new(),
    }
}

fn failed(stderr: &str) -> CommandOutput {
    CommandOutput {
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::{DockerCli, RunSpec};
    use dockyard_schema::ContainerName;

    fn docker() -> DockerCli {
        DockerCli::new("docker")
    }

    #[test]
    fn ps_reports_running_and_all() {
        let fake = FakeRunner::new()
            .with_container("up", true)
            .with_container("down", false);
        let up = ContainerName::new("up");
        let down = ContainerName::new("down");
        let gone = ContainerName::new("gone");

        assert_eq!(fake.run(&docker().ps(&up, false)).unwrap().stdout, "up-id\n");
        assert_eq!(fake.run(&docker().ps(&down, false)).unwrap().stdout, "");
        assert_eq!(fake.run(&docker().ps(&down, true)).unwrap().stdout, "down-id\n");
        assert_eq!(fake.run(&docker().ps(&gone, true)).unwrap().stdout, "");
    }

    #[test]
    fn run_start_stop_rm_track_state() {
        let fake = FakeRunner::new();
        let name = ContainerName::new("app");
        let spec = RunSpec {
            image: "img".to_owned(),
            name: Some(name.clone()),
            detach: true,
            ..RunSpec::default()
        };

        assert!(fake.run(&docker().run(&spec)).unwrap().success());
        assert_eq!(fake.container_state("app"), Some(true));
        assert!(!fake.run(&docker().run(&spec)).unwrap().success());

        assert!(!fake.run(&docker().remove(&name, false)).unwrap().success());
        assert!(fake.run(&docker().stop(&name, 600)).unwrap().success());
        assert_eq!(fake.container_state("app"), Some(false));
        assert!(fake.run(&docker().start(&name)).unwrap().success());
        assert_eq!(fake.container_state("app"), Some(true));
        assert!(fake.run(&docker().remove(&name, true)).unwrap().success());
        assert_eq!(fake.container_state("app"), None);
        assert!(!fake.run(&docker().stop(&name, 600)).unwrap().success());
    }

    #[test]
    fn transient_runs_leave_no_container() {
        let fake = FakeRunner::new();
        let spec = RunSpec {
            image: "img".to_owned(),
            name: Some(ContainerName::new("once")),
            remove: true,
            ..RunSpec::default()
        };
        assert!(fake.run(&docker().run(&spec)).unwrap().success());
        assert_eq!(fake.container_state("once"), None);
    }

    #[test]
    fn fail_when_matches_command_line() {
        let fake = FakeRunner::new().fail_when("build", "boom");
        let out = fake
            .run(&Invocation::new("docker").args(["build", "."]))
            .unwrap();
        assert_eq!(out.code, Some(1));
        assert_eq!(out.stderr, "boom");
        assert_eq!(fake.subcommands(), vec!["build"]);
        assert_eq!(fake.command_lines(), vec!["docker build ."]);
    }
}
