use super::{json_pretty, Ctx, EXIT_SUCCESS};

pub fn run(ctx: &Ctx<'_>, name: &str) -> Result<u8, String> {
    let config = ctx.load(name)?;
    ctx.step("restarting container...", "container restarted", "restart failed", || {
        ctx.orch.restart(&config)
    })?;

    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "status": "running"
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("restarted {name}");
    }
    Ok(EXIT_SUCCESS)
}
