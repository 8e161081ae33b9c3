use std::fmt;

/// Observed state of the named container.
///
/// Always derived from fresh engine queries; never cached between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

impl ContainerState {
    /// Combine the two `ps` probes. `running` implies existence.
    pub fn from_probes(running: bool, exists: bool) -> Self {
        match (running, exists) {
            (true, _) => Self::Running,
            (false, true) => Self::Stopped,
            (false, false) => Self::Absent,
        }
    }

    pub fn exists(self) -> bool {
        self != Self::Absent
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::Stopped => "stopped",
            Self::Running => "running",
        })
    }
}

/// Orchestration step an engine call belongs to, used in failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Query,
    Build,
    Migrate,
    Configure,
    Commit,
    Cleanup,
    Start,
    Stop,
    Destroy,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Build => "build",
            Self::Migrate => "migrate",
            Self::Configure => "configure",
            Self::Commit => "commit",
            Self::Cleanup => "cleanup",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Destroy => "destroy",
        })
    }
}
