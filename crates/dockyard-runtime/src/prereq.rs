use std::fmt;
use std::path::Path;
use std::process::Command;

/// Engine binaries probed in order when no explicit path is configured.
pub const ENGINE_CANDIDATES: &[&str] = &["docker.io", "docker"];

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    if name.contains('/') {
        return Path::new(name).is_file();
    }
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Resolve the engine binary: `explicit` when given and present, otherwise
/// the first of [`ENGINE_CANDIDATES`] found on `PATH`.
pub fn find_engine(explicit: Option<&str>) -> Option<String> {
    match explicit {
        Some(path) => command_exists(path).then(|| path.to_owned()),
        None => ENGINE_CANDIDATES
            .iter()
            .find(|c| command_exists(c))
            .map(|c| (*c).to_owned()),
    }
}

/// Check that a container engine client is available.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_engine_prereqs(explicit: Option<&str>) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    if find_engine(explicit).is_none() {
        missing.push(MissingPrereq {
            name: "docker",
            purpose: "building images and running containers",
            install_hint:
                "zypper install docker | apt install docker.io | dnf install moby-engine | pacman -S docker",
        });
    }
    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nDockyard drives the container engine through its command line client.");
    msg
}
