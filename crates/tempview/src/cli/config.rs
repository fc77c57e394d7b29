//! `tempview config`: show the resolved configuration.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::config::{redact_connection_string, AppConfig, ConfigOverrides};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show resolved configuration in JSON format
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path, ConfigOverrides::default())?;
    let home = tempview_logging::tempview_home();
    let logs = tempview_logging::logs_dir();
    let connection = config
        .connection_string
        .as_deref()
        .map(redact_connection_string);
    let source = match config.backend() {
        Ok(_) => None,
        Err(err) => Some(err.to_string()),
    };

    if args.json {
        let value = serde_json::json!({
            "home": home.to_string_lossy(),
            "config_file": {
                "path": config.config_path.to_string_lossy(),
                "exists": config.config_path.exists(),
            },
            "logs": logs.to_string_lossy(),
            "bind_addr": config.bind_addr,
            "fixture": config.fixture.as_ref().map(|p| p.to_string_lossy()),
            "connection_string": connection,
            "read_hint": config.read_hint.as_str(),
            "source_error": source,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("TEMPORAL VIEWER CONFIGURATION");
        println!("=============================");
        println!();
        println!("Home:        {}", home.display());
        println!(
            "Config file: {}{}",
            config.config_path.display(),
            if config.config_path.exists() { "" } else { " (not found)" }
        );
        println!("Logs:        {}", logs.display());
        println!();
        println!("Bind:        {}", config.bind_addr);
        println!("Read hint:   {}", config.read_hint.as_str());
        match (&config.fixture, &connection) {
            (Some(fixture), None) => println!("Source:      fixture {}", fixture.display()),
            (None, Some(conn)) => println!("Source:      sqlserver {}", conn),
            _ => {}
        }
        if let Some(err) = source {
            println!();
            println!("WARNING: {}", err);
        }
    }
    Ok(())
}
