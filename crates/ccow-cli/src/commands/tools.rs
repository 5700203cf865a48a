//! Tool catalogue commands.
//!
//! `ccow tools list` - List every tool the server advertises.
//! `ccow tools describe` - Show the input schema of one tool.

use anyhow::{Result, bail};
use ccow_mcp::{ToolDefinition, ToolRegistry};

fn badge(registry: &ToolRegistry, tool: &ToolDefinition) -> &'static str {
    if registry.is_read_only(&tool.name) {
        "read"
    } else {
        "action"
    }
}

/// List every tool.
pub fn list(verbose: bool) -> Result<()> {
    let registry = ToolRegistry::catalog();

    println!("Available tools ({}):", registry.len());
    for tool in registry.list() {
        println!("  {} ({})", tool.name, badge(&registry, tool));
        if verbose {
            if let Some(desc) = &tool.description {
                println!("    {}", desc);
            }
            println!(
                "    Schema: {}",
                serde_json::to_string_pretty(&tool.input_schema)?
            );
        }
    }
    Ok(())
}

/// Describe one tool by name.
pub fn describe(name: &str) -> Result<()> {
    let registry = ToolRegistry::catalog();
    let tool = find(&registry, name)?;
    println!("{} ({})", tool.name, badge(&registry, tool));
    if let Some(desc) = &tool.description {
        println!("\n{}", desc);
    }
    println!(
        "\nInput schema:\n{}",
        serde_json::to_string_pretty(&tool.input_schema)?
    );
    Ok(())
}

fn find<'a>(registry: &'a ToolRegistry, name: &str) -> Result<&'a ToolDefinition> {
    match registry.get(name) {
        Some(tool) => Ok(tool),
        None => bail!("Unknown tool '{}'. Run `ccow tools list` to see every tool.", name),
    }
}
