use super::{colorize_state, json_pretty, Ctx, EXIT_SUCCESS};

pub fn run(ctx: &Ctx<'_>, name: &str) -> Result<u8, String> {
    let config = ctx.load(name)?;
    let state = ctx.orch.state(&config).map_err(|e| e.to_string())?;

    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "state": state.to_string(),
            "exists": state.exists(),
            "run_image": ctx.orch.run_image(&config)
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{name}: {}", colorize_state(&state.to_string()));
    }
    Ok(EXIT_SUCCESS)
}
