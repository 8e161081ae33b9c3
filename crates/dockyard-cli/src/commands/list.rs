use super::{json_pretty, Ctx, EXIT_SUCCESS};

pub fn run(ctx: &Ctx<'_>) -> Result<u8, String> {
    let names = ctx
        .store
        .list()
        .map_err(|e| format!("config error: {e}"))?;
    if ctx.json {
        println!("{}", json_pretty(&names)?);
    } else if names.is_empty() {
        println!("no configs in {}", ctx.store.conf_dir().display());
    } else {
        for name in &names {
            println!("{name}");
        }
    }
    Ok(EXIT_SUCCESS)
}
