//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use dm_core::config::{self, ConfigFile};

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path)
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    toml::from_str(&content).with_context(|| "Failed to parse config file")
}

/// Get a config value by dotted key, e.g. `desktops.max_desktops_allowed`
pub fn config_get(config_path: Option<&Path>, key: &str) -> Result<()> {
    let path = resolve_path(config_path);

    if !path.exists() {
        print_error(&format!("Config file not found: {:?}", path));
        print_info("Run 'desktop-manager config init' to create one");
        return Ok(());
    }

    let table = read_table(&path)?;
    let mut current = &toml::Value::Table(table);

    for part in key.split('.') {
        match current.get(part) {
            Some(value) => current = value,
            None => {
                print_error(&format!("Key not found: {}", key));
                return Ok(());
            }
        }
    }

    match current {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Table(_) => println!("{}", toml::to_string_pretty(current)?),
        other => println!("{}", other),
    }

    Ok(())
}

/// Set a config value by dotted key
///
/// The result must still parse as a valid configuration, so a typo in a
/// key or a value of the wrong type is rejected before anything is written.
/// A value that looks like a number or boolean is stored as a string when
/// the field it lands in expects one.
pub fn config_set(config_path: Option<&Path>, key: &str, value: &str) -> Result<()> {
    let path = resolve_path(config_path);

    if !path.exists() {
        print_info("Creating default configuration...");
        config_init(Some(&path), false)?;
    }

    let table = read_table(&path)?;

    let typed = parse_value(value);
    let new_content = match validated(&table, key, typed.clone()) {
        Ok(content) => content,
        Err(e) if !typed.is_str() => {
            validated(&table, key, toml::Value::String(value.to_string())).map_err(|_| e)?
        }
        Err(e) => return Err(e),
    };

    std::fs::write(&path, new_content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

/// Insert `value` at `key` into a copy of `table` and render it, provided
/// the result is still a valid configuration file
fn validated(table: &toml::Table, key: &str, value: toml::Value) -> Result<String> {
    let mut table = table.clone();

    let parts: Vec<&str> = key.split('.').collect();
    let (last_key, parents) = parts
        .split_last()
        .filter(|(last, _)| !last.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Invalid key: {:?}", key))?;

    let mut current = &mut table;
    for part in parents {
        current = current
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("Cannot navigate to key: {}", key))?;
    }
    let rendered = value.to_string();
    current.insert(last_key.to_string(), value);

    let content = toml::to_string_pretty(&table)?;
    toml::from_str::<ConfigFile>(&content)
        .with_context(|| format!("Invalid value for {}: {}", key, rendered))?;
    Ok(content)
}

fn parse_value(value: &str) -> toml::Value {
    if value == "true" {
        toml::Value::Boolean(true)
    } else if value == "false" {
        toml::Value::Boolean(false)
    } else if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(value.to_string())
    }
}

/// Show current configuration
pub fn config_show(config_path: Option<&Path>) -> Result<()> {
    let path = resolve_path(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Built-in defaults:");
        println!();
        println!("{}", toml::to_string_pretty(&ConfigFile::default())?);
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    Ok(())
}

/// Write the default configuration file
pub fn config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
            print_success(&format!("Created config directory: {:?}", dir));
        }
    }

    std::fs::write(&path, generate_default_config())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}

/// Print the configuration file path
pub fn config_path(config_path: Option<&Path>) -> Result<()> {
    println!("{}", resolve_path(config_path).display());
    Ok(())
}

fn generate_default_config() -> String {
    r#"# desktop-manager configuration

[api]
# Base URL of the Job API (endpoints are resolved against it)
base_url = "http://127.0.0.1:8080/api/"

# Session cookie sent with every request, e.g. "JSESSIONID=..."
# session_cookie = ""

# Upper bound on a single remote call in seconds (0 disables)
request_timeout_secs = 60

[api.endpoints]
start = "execute/startserver"
list = "execute/listall"
stop = "execute/stop"
running = "execute/running"
configurations = "configurations"
session_info = "session_info"
end_session = "end_session"

[desktops]
# Highest allowed number of standing desktops per configuration (0 = unlimited)
max_desktops_allowed = 0

# Launch defaults not published by the configuration
default_nodes = 1
default_resolution = "1440x900"

[refresh]
# Countdown tick length in milliseconds
tick_interval_ms = 30

# Ticks between two refreshes
countdown_ticks = 100
"#
    .to_string()
}
