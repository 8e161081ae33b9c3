use super::{json_pretty, Ctx, EXIT_SUCCESS};
use dockyard_schema::ImageTag;

pub fn run(ctx: &Ctx<'_>, name: &str, tag: Option<String>) -> Result<u8, String> {
    let config = ctx.load(name)?;
    let tag = tag.map(ImageTag::from);
    let tag = ctx.step("bootstrapping...", "bootstrap complete", "bootstrap failed", || {
        ctx.orch.bootstrap(&config, tag.as_ref())
    })?;

    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "image": tag,
            "status": "bootstrapped"
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("bootstrapped image {tag}");
    }
    Ok(EXIT_SUCCESS)
}
