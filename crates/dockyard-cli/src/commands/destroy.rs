use super::{json_pretty, Ctx, EXIT_SUCCESS};

pub fn run(ctx: &Ctx<'_>, name: &str) -> Result<u8, String> {
    let config = ctx.load(name)?;
    let removed = ctx.step("destroying container...", "destroy complete", "destroy failed", || {
        ctx.orch.destroy(&config)
    })?;

    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "removed": removed
        });
        println!("{}", json_pretty(&payload)?);
    } else if removed {
        println!("destroyed {name}");
    } else {
        println!("{name} was not found");
    }
    Ok(EXIT_SUCCESS)
}
