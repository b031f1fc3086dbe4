// ABOUTME: Config command implementations.
// ABOUTME: Writes the starter config file and prints individual values.

use quall::config::{self, Config};
use quall::error::Result;
use quall::output::Output;
use serde_yaml::Value;
use std::path::Path;

pub fn init(dir: &Path, environment: &str, force: bool, output: &Output) -> Result<()> {
    let path = config::init_config(dir, environment, force)?;
    output.success(&format!("Created {}", path.display()));
    Ok(())
}

pub fn show_value(config: &Config, section: &str, key: &str, output: &Output) -> Result<()> {
    let value = config.get(section, key)?;
    output.success(&render(value)?);
    Ok(())
}

/// Scalars print bare; anything else as YAML.
fn render(value: &Value) -> Result<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)?.trim_end().to_string(),
    })
}
