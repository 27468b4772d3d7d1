//! Configuration commands

use colored::Colorize;

use crate::cli::{GlobalOptions, OutputFormat};
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::output::print_json;

/// Print the effective configuration (file or defaults)
pub fn show(opts: &GlobalOptions) -> Result<()> {
    let config = Config::load_at(opts.config_ref())?;
    let path = Config::resolve_path(opts.config_ref())?;

    match opts.format {
        OutputFormat::Json => print_json(&config)?,
        _ => {
            println!("# {}", path.display().to_string().dimmed());
            let yaml =
                serde_yaml::to_string(&config).map_err(|e| ConfigError::SaveError(e.to_string()))?;
            print!("{}", yaml);
            println!("# data dir: {}", config.data_dir()?.display());
        }
    }
    Ok(())
}

/// Write the default configuration file
pub fn init(opts: &GlobalOptions, force: bool) -> Result<()> {
    let path = Config::resolve_path(opts.config_ref())?;
    if path.exists() && !force {
        println!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
        return Ok(());
    }

    Config::default().save_to(&path)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}
