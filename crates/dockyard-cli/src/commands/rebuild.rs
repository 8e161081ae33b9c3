use super::{json_pretty, Ctx, EXIT_SUCCESS};

pub fn run(ctx: &Ctx<'_>, name: &str) -> Result<u8, String> {
    let config = ctx.load(name)?;
    ctx.step("rebuilding...", "rebuild complete", "rebuild failed", || {
        ctx.orch.rebuild(&config)
    })?;

    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "deployment": config.deployment,
            "image": ctx.orch.default_tag(&config),
            "status": "running"
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("rebuilt {name} from {}", ctx.orch.default_tag(&config));
    }
    Ok(EXIT_SUCCESS)
}
