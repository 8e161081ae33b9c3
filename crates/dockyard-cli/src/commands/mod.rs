pub mod bootstrap;
pub mod build;
pub mod completions;
pub mod configure;
pub mod destroy;
pub mod list;
pub mod man_pages;
pub mod migrate;
pub mod rebuild;
pub mod render;
pub mod restart;
pub mod settings;
pub mod start;
pub mod status;
pub mod stop;

use dockyard_core::{CoreError, Orchestrator};
use dockyard_schema::{Config, ConfigStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_EXTERNAL_ERROR: u8 = 3;

/// Everything a subcommand needs, built once in `main`.
pub struct Ctx<'a> {
    pub orch: &'a Orchestrator<'a>,
    pub store: &'a ConfigStore,
    pub json: bool,
}

impl Ctx<'_> {
    pub fn load(&self, name: &str) -> Result<Config, String> {
        Config::load(self.store, name).map_err(|e| format!("config error: {e}"))
    }

    /// Run one orchestration step behind a spinner (suppressed with `--json`).
    pub fn step<T>(
        &self,
        msg: &str,
        done: &str,
        failed: &str,
        f: impl FnOnce() -> Result<T, CoreError>,
    ) -> Result<T, String> {
        let pb = if self.json { None } else { Some(spinner(msg)) };
        match f() {
            Ok(value) => {
                if let Some(ref pb) = pb {
                    spin_ok(pb, done);
                }
                Ok(value)
            }
            Err(e) => {
                if let Some(ref pb) = pb {
                    spin_fail(pb, failed);
                }
                Err(e.to_string())
            }
        }
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "running" => Style::new().cyan().bold().apply_to(state).to_string(),
        "stopped" => Style::new().yellow().apply_to(state).to_string(),
        "absent" => Style::new().dim().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}
