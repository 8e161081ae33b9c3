use crate::RuntimeError;
use std::fmt;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// A fully described external command: argv, extra environment, working
/// directory, and optional stdin text.
///
/// `env` is added on top of the caller's environment. Secret values travel
/// here and never in `args`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub dir: Option<PathBuf>,
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// The engine subcommand, e.g. `build` or `run`.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Exit status and captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes invocations synchronously.
///
/// A non-zero exit is reported through [`CommandOutput::code`], not as an
/// error; `Err` means the command could not be run at all.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RuntimeError>;
}

/// Runs invocations as child processes, streaming their output to the
/// `debug` log while capturing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RuntimeError> {
        debug!("exec: {invocation}");
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = &invocation.dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                RuntimeError::EngineNotFound(invocation.program.clone())
            } else {
                RuntimeError::Io(e)
            }
        })?;

        let stdin_pipe = child.stdin.take();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        // Feed stdin and drain both pipes concurrently so a chatty child never
        // blocks on a full pipe while we are still writing its input.
        let (stdout, stderr) = std::thread::scope(|s| {
            if let (Some(mut pipe), Some(text)) = (stdin_pipe, invocation.stdin.as_deref()) {
                s.spawn(move || {
                    if let Err(e) = pipe.write_all(text.as_bytes()) {
                        debug!("stdin write ended early: {e}");
                    }
                });
            }
            let out = s.spawn(move || stdout_pipe.map(|p| drain(p, "stdout")).unwrap_or_default());
            let err = s.spawn(move || stderr_pipe.map(|p| drain(p, "stderr")).unwrap_or_default());
            (
                out.join().unwrap_or_default(),
                err.join().unwrap_or_default(),
            )
        });

        let status = child.wait()?;
        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

fn drain(stream: impl Read, label: &str) -> String {
    let mut reader = BufReader::new(stream);
    let mut collected = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                debug!("{label}: {}", line.trim_end());
                collected.push_str(&line);
            }
        }
    }
    collected
}
