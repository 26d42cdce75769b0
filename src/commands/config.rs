use anyhow::{Context as _, Result};
use std::path::Path;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{Config, default_path};
use crate::ui;

pub fn run(_ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { config } => show(config.as_deref()),
        ConfigCommand::Path => path(),
    }
}

fn show(path: Option<&Path>) -> Result<()> {
    let resolved = match path {
        Some(path) => path.to_path_buf(),
        None => default_path()?,
    };
    let config = Config::load(Some(&resolved))?;

    ui::header("Configuration");
    ui::kv("File", &resolved.display().to_string());
    if !resolved.exists() {
        ui::dim("Not found, showing defaults");
    }
    println!();

    let rendered = toml::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{rendered}");
    Ok(())
}

fn path() -> Result<()> {
    println!("{}", default_path()?.display());
    Ok(())
}
