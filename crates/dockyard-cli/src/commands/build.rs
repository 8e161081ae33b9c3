use super::{json_pretty, Ctx, EXIT_SUCCESS};
use dockyard_core::BuildOptions;
use dockyard_schema::ImageTag;

pub fn run(
    ctx: &Ctx<'_>,
    name: &str,
    tag: Option<String>,
    bake_env: bool,
    extra_flags: Vec<String>,
) -> Result<u8, String> {
    let config = ctx.load(name)?;
    let options = BuildOptions {
        tag: tag.map(ImageTag::from),
        extra_flags,
        bake_env,
    };
    let tags = ctx.step("building image...", "image built", "build failed", || {
        ctx.orch.build(&config, &options)
    })?;

    if ctx.json {
        let payload = serde_json::json!({
            "config": config.name.as_str(),
            "tags": tags,
            "status": "built"
        });
        println!("{}", json_pretty(&payload)?);
    } else if tags.is_empty() {
        println!("built image for '{name}' (tag from build flags)");
    } else {
        for tag in &tags {
            println!("built image {tag}");
        }
    }
    Ok(EXIT_SUCCESS)
}
