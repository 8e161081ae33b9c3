use super::{json_pretty, Ctx, EXIT_SUCCESS};
use dockyard_schema::ImageTag;

pub fn run(
    ctx: &Ctx<'_>,
    name: &str,
    tag: Option<String>,
    skip_post_deployment: bool,
) -> Result<u8, String> {
    let config = ctx.load(name)?;
    let tag = tag.map(ImageTag::from);
    ctx.step("running migrations...", "migrations complete", "migrations failed", || {
        ctx.orch.migrate(&config, tag.as_ref(), skip_post_deployment)
    })?;

    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "image": tag.unwrap_or_else(|| ctx.orch.default_tag(&config)),
            "skip_post_deployment_migrations": skip_post_deployment,
            "status": "migrated"
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("migrated '{name}'");
    }
    Ok(EXIT_SUCCESS)
}
