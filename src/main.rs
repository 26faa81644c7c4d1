use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};

use gcode_sim::config::Config;
use gcode_sim::dialect::DialectRegistry;
use gcode_sim::machine::Machine;
use gcode_sim::validation::{Severity, validate_document};

fn main() -> Result<ExitCode> {
    let config = Config::from_args_and_env()?;

    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .init();

    let mut registry = DialectRegistry::with_builtins()?;
    for dir in &config.dialect_dirs {
        let loaded = registry.load_directory(dir)?;
        if loaded > 0 {
            log::info!("loaded {} dialects from {}", loaded, dir.display());
        }
    }

    let input = config.input.display().to_string();
    let content = std::fs::read_to_string(&config.input)
        .with_context(|| format!("failed to read {}", input))?;

    // Dialect priority: CLI > modeline > default
    let modeline = registry.detect_modeline_dialect(&content);
    let dialect = match config.effective_dialect(modeline) {
        Some(name) => registry.get(&name).cloned().ok_or_else(|| {
            anyhow!(
                "unknown dialect '{}' (available: {})",
                name,
                registry.list_dialects().join(", ")
            )
        })?,
        None => registry
            .active_dialect()
            .cloned()
            .ok_or_else(|| anyhow!("no default dialect registered"))?,
    };
    log::info!(
        "using dialect {} ({})",
        dialect.name(),
        dialect.description().unwrap_or("no description")
    );

    if config.validate_only {
        let result = validate_document(&content, &dialect);
        if config.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            for diagnostic in &result.diagnostics {
                let severity = match diagnostic.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                };
                println!(
                    "{}:{}: {}: {}",
                    input, diagnostic.line, severity, diagnostic.message
                );
            }
        }
        return Ok(if result.is_valid() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let mut machine = Machine::new(dialect)?;
    for (index, line) in content.lines().enumerate() {
        machine
            .process_str(line)
            .with_context(|| format!("{}:{}", input, index + 1))?;
    }

    let snapshot = machine.snapshot();
    if config.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", snapshot);
    }
    Ok(ExitCode::SUCCESS)
}
