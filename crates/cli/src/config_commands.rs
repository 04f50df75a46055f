use std::path::Path;

use {anyhow::Result, breadcord_config::BreadcordConfig, clap::Subcommand};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file in use and the standard directories.
    Path,
    /// Print the effective configuration as TOML.
    Show,
}

pub fn handle_config(
    action: ConfigAction,
    config: &BreadcordConfig,
    explicit: Option<&Path>,
) -> Result<()> {
    match action {
        ConfigAction::Path => {
            match explicit
                .map(Path::to_path_buf)
                .or_else(breadcord_config::find_config_file)
            {
                Some(path) => println!("config:  {}", path.display()),
                None => println!("config:  (none, using defaults)"),
            }
            if let Some(dir) = breadcord_config::config_dir() {
                println!("configs: {}", dir.display());
            }
            println!("data:    {}", breadcord_config::data_dir().display());
            println!("plugins: {}", breadcord_config::plugins_dir(config).display());
        },
        ConfigAction::Show => print!("{}", breadcord_config::render_config(config)?),
    }
    Ok(())
}
