use anyhow::Result;

use super::context::AppContext;

pub fn show(ctx: &AppContext) -> Result<()> {
    print!("{}", ctx.config.to_toml_string()?);
    Ok(())
}

pub fn path(ctx: &AppContext) {
    println!("{}", ctx.config_path.display());
}
