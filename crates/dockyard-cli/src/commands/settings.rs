use super::{json_pretty, Ctx, EXIT_SUCCESS};
use std::path::Path;

/// Print the effective settings, optionally writing them to `path`.
pub fn run(ctx: &Ctx<'_>, path: Option<&Path>, save: bool) -> Result<u8, String> {
    let settings = ctx.orch.settings();

    if save {
        let path = path.ok_or("cannot determine settings path: HOME is not set")?;
        settings.save(path).map_err(|e| e.to_string())?;
        if !ctx.json {
            println!("saved settings to {}", path.display());
        }
    }

    if ctx.json {
        println!("{}", json_pretty(settings)?);
    } else if !save {
        print!("{}", settings.to_toml()?);
    }
    Ok(EXIT_SUCCESS)
}
