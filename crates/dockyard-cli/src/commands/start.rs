use super::{colorize_state, json_pretty, Ctx, EXIT_SUCCESS};
use dockyard_core::ContainerState;

pub fn run(ctx: &Ctx<'_>, name: &str) -> Result<u8, String> {
    let config = ctx.load(name)?;
    let before = ctx.step("starting container...", "container up", "start failed", || {
        ctx.orch.start(&config)
    })?;

    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "previous_state": before.to_string(),
            "status": "running"
        });
        println!("{}", json_pretty(&payload)?);
    } else if before == ContainerState::Running {
        println!("{name} is already {}", colorize_state("running"));
    } else {
        println!(
            "started {name} (was {})",
            colorize_state(&before.to_string())
        );
    }
    Ok(EXIT_SUCCESS)
}
