//! Config command implementations.

use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::config::{
    Overrides, Settings, config_path, load_config, mask_token, reset_config, save_config,
};
use crate::error::{Error, Result};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowOutput {
    config_path: String,
    config_exists: bool,
    api_url: String,
    token: Option<String>,
    page_size: u32,
    reconnect_retries: u32,
}

/// Execute config commands.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or written.
pub fn execute(command: &ConfigCommands, overrides: &Overrides, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(overrides, json),
        ConfigCommands::SetToken { value: token } => {
            if token.trim().is_empty() {
                return Err(Error::InvalidArgument("token must not be empty".to_string()));
            }
            let mut config = load_config()?;
            config.token = Some(token.trim().to_string());
            let path = save_config(&config)?;
            report(json, "token", &mask_token(token.trim()), &path.display().to_string())
        }
        ConfigCommands::SetUrl { url } => {
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| Error::InvalidArgument(format!("invalid URL '{url}': {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::InvalidArgument(format!(
                    "URL must use http or https, got '{}'",
                    parsed.scheme()
                )));
            }
            let mut config = load_config()?;
            let url = url.trim_end_matches('/').to_string();
            config.api_url = Some(url.clone());
            let path = save_config(&config)?;
            report(json, "apiUrl", &url, &path.display().to_string())
        }
        ConfigCommands::Reset => {
            let removed = reset_config()?;
            if json {
                println!("{}", serde_json::json!({ "reset": removed }));
            } else if removed {
                println!("Config file removed.");
            } else {
                println!("No config file to remove.");
            }
            Ok(())
        }
    }
}

fn show(overrides: &Overrides, json: bool) -> Result<()> {
    use colored::Colorize;

    let settings = Settings::load(overrides)?;
    let path = config_path()?;
    let output = ShowOutput {
        config_exists: path.exists(),
        config_path: path.display().to_string(),
        api_url: settings.api_url,
        token: settings.token.as_deref().map(mask_token),
        page_size: settings.page_size,
        reconnect_retries: settings.reconnect.max_retries,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    let exists = if output.config_exists { "" } else { " (not created)" };
    println!("{}", "Configuration".bold());
    println!("  Config file: {}{}", output.config_path, exists.dimmed());
    println!("  API URL:     {}", output.api_url);
    println!(
        "  Token:       {}",
        output.token.as_deref().unwrap_or("(not set)")
    );
    println!("  Page size:   {}", output.page_size);
    if output.reconnect_retries == 0 {
        println!("  Reconnect:   off");
    } else {
        println!("  Reconnect:   up to {} retries", output.reconnect_retries);
    }
    Ok(())
}

fn report(json: bool, key: &str, value: &str, path: &str) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({ "key": key, "value": value, "path": path })
        );
    } else {
        println!("Saved {key} = {value} to {path}");
    }
    Ok(())
}
