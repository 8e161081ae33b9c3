use super::{json_pretty, Ctx, EXIT_SUCCESS};

pub fn run(ctx: &Ctx<'_>, name: &str) -> Result<u8, String> {
    let config = ctx.load(name)?;
    let stopped = ctx.step("stopping container...", "stop complete", "stop failed", || {
        ctx.orch.stop(&config)
    })?;

    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "stopped": stopped
        });
        println!("{}", json_pretty(&payload)?);
    } else if stopped {
        println!("stopped {name}");
    } else {
        println!("{name} was not found");
    }
    Ok(EXIT_SUCCESS)
}
