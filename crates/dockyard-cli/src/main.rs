mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use commands::{Ctx, EXIT_CONFIG_ERROR, EXIT_EXTERNAL_ERROR, EXIT_FAILURE};
use dockyard_core::orchestrator::BUILD_TAG_FILTER;
use dockyard_core::{Orchestrator, Settings};
use dockyard_runtime::ProcessRunner;
use dockyard_schema::{ConfigName, ConfigStore};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "dockyard",
    version,
    about = "Composable single-container application launcher"
)]
struct Cli {
    /// Directory holding `<config>.yml` files.
    #[arg(long, global = true)]
    conf_dir: Option<PathBuf>,

    /// Directory templates are resolved against.
    #[arg(long, global = true)]
    templates_dir: Option<PathBuf>,

    /// Image namespace for default tags, `{namespace}/{config}`.
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Fixed build context directory (removed after every build).
    #[arg(long, global = true)]
    build_dir: Option<PathBuf>,

    /// Container engine client binary.
    #[arg(long, global = true)]
    docker_path: Option<String>,

    /// Settings file (defaults to ~/.config/dockyard/settings.toml).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Artifact {
    Manifest,
    Recipe,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build an image from a config (extra docker build flags go after --).
    Build {
        config: String,
        /// Resulting image tag. Defaults to {namespace}/{config}.
        #[arg(short, long)]
        tag: Option<String>,
        /// Bake every env variable into the image.
        #[arg(short = 'e', long, default_value_t = false)]
        bake_env: bool,
        /// Extra flags passed through to docker build.
        #[arg(last = true)]
        extra_flags: Vec<String>,
    },
    /// Run database migrations against an image.
    Migrate {
        config: String,
        /// Image tag to migrate. Defaults to {namespace}/{config}.
        #[arg(long)]
        tag: Option<String>,
        /// Run safe migrations only and defer post-deployment ones.
        #[arg(long, default_value_t = false)]
        skip_post_deployment_migrations: bool,
    },
    /// Precompile assets and commit the result as a new image.
    Configure {
        config: String,
        /// Source image tag. Defaults to {namespace}/{config}.
        #[arg(short, long)]
        source_tag: Option<String>,
        /// Target image tag. Defaults to {namespace}/{config}.
        #[arg(short = 't', long = "tag")]
        target_tag: Option<String>,
    },
    /// Build, migrate and configure an image.
    Bootstrap {
        config: String,
        /// Image tag. Defaults to {namespace}/{config}.
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Start the container, creating it if needed.
    Start { config: String },
    /// Stop the container.
    Stop { config: String },
    /// Show whether the container is running, stopped or absent.
    Status { config: String },
    /// Stop, then start the container.
    Restart { config: String },
    /// Stop and remove the container.
    Destroy { config: String },
    /// Rebuild the image and replace the container.
    Rebuild { config: String },
    /// Print a derived artifact without touching the container engine.
    Render {
        artifact: Artifact,
        config: String,
        /// Bake every env variable into the recipe.
        #[arg(short = 'e', long, default_value_t = false)]
        bake_env: bool,
        /// Provisioning tag filter for the recipe.
        #[arg(long, default_value = BUILD_TAG_FILTER, allow_hyphen_values = true)]
        tag_filter: String,
    },
    /// List the configs in the config directory.
    List,
    /// Print the effective settings (file values plus command line overrides).
    Settings {
        /// Write the effective settings back to the settings file.
        #[arg(long, default_value_t = false)]
        save: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

impl Commands {
    fn needs_engine(&self) -> bool {
        !matches!(
            self,
            Self::Render { .. }
                | Self::List
                | Self::Settings { .. }
                | Self::Completions { .. }
                | Self::ManPages { .. }
        )
    }

    fn config_name(&self) -> Option<&str> {
        match self {
            Self::Build { config, .. }
            | Self::Migrate { config, .. }
            | Self::Configure { config, .. }
            | Self::Bootstrap { config, .. }
            | Self::Start { config }
            | Self::Stop { config }
            | Self::Status { config }
            | Self::Restart { config }
            | Self::Destroy { config }
            | Self::Rebuild { config }
            | Self::Render { config, .. } => Some(config.as_str()),
            Self::List | Self::Settings { .. } | Self::Completions { .. } | Self::ManPages { .. } => {
                None
            }
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, String> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path),
        None => Settings::load_default(),
    }
    .map_err(|e| e.to_string())?;

    if let Some(dir) = &cli.conf_dir {
        settings.conf_dir.clone_from(dir);
    }
    if let Some(dir) = &cli.templates_dir {
        settings.templates_dir.clone_from(dir);
    }
    if let Some(ns) = &cli.namespace {
        settings.namespace.clone_from(ns);
    }
    if cli.build_dir.is_some() {
        settings.build_dir.clone_from(&cli.build_dir);
    }
    if cli.docker_path.is_some() {
        settings.docker_path.clone_from(&cli.docker_path);
    }
    Ok(settings)
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("config error:") || msg.starts_with("settings error") {
        EXIT_CONFIG_ERROR
    } else if msg.starts_with("external command failed:") {
        EXIT_EXTERNAL_ERROR
    } else {
        EXIT_FAILURE
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DOCKYARD_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    if let Some(name) = cli.command.config_name() {
        if let Err(e) = ConfigName::parse(name) {
            eprintln!("error: config error: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    }

    let mut settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::from(exit_code_for(&msg));
        }
    };

    if cli.command.needs_engine() && std::env::var("DOCKYARD_SKIP_PREREQS").as_deref() != Ok("1")
    {
        let missing = dockyard_runtime::check_engine_prereqs(settings.docker_path.as_deref());
        if !missing.is_empty() {
            eprintln!("error: {}", dockyard_runtime::format_missing(&missing));
            return ExitCode::from(EXIT_FAILURE);
        }
        if settings.docker_path.is_none() {
            settings.docker_path = dockyard_runtime::find_engine(None);
        }
    }

    let runner = ProcessRunner::new();
    let store = ConfigStore::new(settings.conf_dir.clone(), settings.templates_dir.clone());
    let orch = Orchestrator::new(&runner, settings);
    let ctx = Ctx {
        orch: &orch,
        store: &store,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Build {
            config,
            tag,
            bake_env,
            extra_flags,
        } => commands::build::run(&ctx, &config, tag, bake_env, extra_flags),
        Commands::Migrate {
            config,
            tag,
            skip_post_deployment_migrations,
        } => commands::migrate::run(&ctx, &config, tag, skip_post_deployment_migrations),
        Commands::Configure {
            config,
            source_tag,
            target_tag,
        } => commands::configure::run(&ctx, &config, source_tag, target_tag),
        Commands::Bootstrap { config, tag } => commands::bootstrap::run(&ctx, &config, tag),
        Commands::Start { config } => commands::start::run(&ctx, &config),
        Commands::Stop { config } => commands::stop::run(&ctx, &config),
        Commands::Status { config } => commands::status::run(&ctx, &config),
        Commands::Restart { config } => commands::restart::run(&ctx, &config),
        Commands::Destroy { config } => commands::destroy::run(&ctx, &config),
        Commands::Rebuild { config } => commands::rebuild::run(&ctx, &config),
        Commands::Render {
            artifact,
            config,
            bake_env,
            tag_filter,
        } => match artifact {
            Artifact::Manifest => commands::render::manifest(&ctx, &config),
            Artifact::Recipe => commands::render::recipe(&ctx, &config, bake_env, &tag_filter),
        },
        Commands::List => commands::list::run(&ctx),
        Commands::Settings { save } => {
            let path = cli
                .settings
                .clone()
                .or_else(dockyard_core::settings::default_settings_path);
            commands::settings::run(&ctx, path.as_deref(), save)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn exit_codes_follow_message_prefix() {
        assert_eq!(exit_code_for("config error: bad name"), EXIT_CONFIG_ERROR);
        assert_eq!(exit_code_for("settings error in /x: bad"), EXIT_CONFIG_ERROR);
        assert_eq!(
            exit_code_for("external command failed: build exited with code 1: boom"),
            EXIT_EXTERNAL_ERROR
        );
        assert_eq!(exit_code_for("runtime error: spawn"), EXIT_FAILURE);
    }

    #[test]
    fn build_collects_trailing_flags() {
        let cli = Cli::parse_from([
            "dockyard", "build", "app", "-t", "x/y", "--", "--platform", "linux/amd64",
        ]);
        match cli.command {
            Commands::Build {
                config,
                tag,
                extra_flags,
                ..
            } => {
                assert_eq!(config, "app");
                assert_eq!(tag.as_deref(), Some("x/y"));
                assert_eq!(extra_flags, vec!["--platform", "linux/amd64"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn render_accepts_hyphenated_tag_filter() {
        let cli = Cli::parse_from([
            "dockyard",
            "render",
            "recipe",
            "app",
            "--tag-filter",
            "--tags=db",
        ]);
        assert!(matches!(
            cli.command,
            Commands::Render { ref tag_filter, .. } if tag_filter == "--tags=db"
        ));
        assert!(!Cli::parse_from(["dockyard", "list"]).command.needs_engine());
    }

    #[test]
    fn config_name_is_known_before_dispatch() {
        let cli = Cli::parse_from(["dockyard", "build", "Bad_Name"]);
        assert_eq!(cli.command.config_name(), Some("Bad_Name"));
        let cli = Cli::parse_from(["dockyard", "settings", "--save"]);
        assert_eq!(cli.command.config_name(), None);
        assert!(!cli.command.needs_engine());
    }
}
