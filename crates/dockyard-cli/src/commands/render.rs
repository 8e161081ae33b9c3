use super::{json_pretty, Ctx, EXIT_SUCCESS};
use dockyard_schema::{RecipeOptions, DEFAULT_MANIFEST_FILE};

pub fn manifest(ctx: &Ctx<'_>, name: &str) -> Result<u8, String> {
    let config = ctx.load(name)?;
    emit(ctx, name, "manifest", &config.manifest())
}

pub fn recipe(ctx: &Ctx<'_>, name: &str, bake_env: bool, tag_filter: &str) -> Result<u8, String> {
    let config = ctx.load(name)?;
    let recipe = config.recipe(&RecipeOptions {
        tag_filter,
        bake_env,
        manifest_file: DEFAULT_MANIFEST_FILE,
    });
    emit(ctx, name, "recipe", &recipe)
}

fn emit(ctx: &Ctx<'_>, name: &str, artifact: &str, content: &str) -> Result<u8, String> {
    if ctx.json {
        let payload = serde_json::json!({
            "config": name,
            "artifact": artifact,
            "content": content
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{content}");
    }
    Ok(EXIT_SUCCESS)
}
