//! Command execution and container engine plumbing for Dockyard.
//!
//! This crate is the execution layer: the `CommandRunner` trait with a real
//! process implementation (`ProcessRunner`) and a recording, state-simulating
//! fake (`FakeRunner`), typed construction of container engine invocations
//! (`DockerCli`), and detection of the engine binary.

pub mod docker;
pub mod mock;
pub mod prereq;
pub mod runner;

pub use docker::{flags_set_tag, BuildSpec, DockerCli, RestartPolicy, RunSpec};
pub use mock::FakeRunner;
pub use prereq::{check_engine_prereqs, find_engine, format_missing, MissingPrereq};
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("container engine '{0}' not found; install docker or pass --docker-path")]
    EngineNotFound(String),
    #[error("runtime execution failed: {0}")]
    ExecFailed(String),
}
