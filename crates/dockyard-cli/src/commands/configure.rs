use super::{json_pretty, Ctx, EXIT_SUCCESS};
use dockyard_schema::ImageTag;

pub fn run(
    ctx: &Ctx<'_>,
    name: &str,
    source: Option<String>,
    target: Option<String>,
) -> Result<u8, String> {
    let config = ctx.load(name)?;
    let source = source.map(ImageTag::from);
    let target = target.map(ImageTag::from);
    ctx.step("configuring image...", "image configured", "configure failed", || {
        ctx.orch.configure(&config, source.as_ref(), target.as_ref())
    })?;

    let target = target.unwrap_or_else(|| ctx.orch.default_tag(&config));
    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "image": target,
            "status": "configured"
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("configured image {target}");
    }
    Ok(EXIT_SUCCESS)
}
