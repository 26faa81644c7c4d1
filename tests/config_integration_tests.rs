//! Tests for command-line configuration
use std::path::PathBuf;

use clap::Parser;
use gcode_sim::config::{Args, Config};

fn config(args: &[&str]) -> Config {
    let mut argv = vec!["gcode-sim"];
    argv.extend_from_slice(args);
    Config::from_args(Args::parse_from(argv)).expect("create config")
}

#[test]
fn test_defaults() {
    let config = config(&["part.ngc"]);
    assert_eq!(config.input, PathBuf::from("part.ngc"));
    assert_eq!(config.cli_dialect, None);
    assert_eq!(config.log_level, "warn");
    assert!(!config.validate_only);
    assert!(!config.json);
    assert_eq!(config.effective_dialect(None), None);
}

#[test]
fn test_flags() {
    let config = config(&[
        "--validate",
        "--json",
        "--log-level",
        "debug",
        "--dialect",
        "marlin2",
        "part.gcode",
    ]);
    assert!(config.validate_only);
    assert!(config.json);
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.cli_dialect.as_deref(), Some("marlin2"));
}

#[test]
fn test_custom_dialect_dir_is_loaded_last() {
    let config = config(&["--dialect-dir", "/opt/dialects", "part.ngc"]);
    assert_eq!(
        config.dialect_dirs.last(),
        Some(&PathBuf::from("/opt/dialects"))
    );
    if dirs::config_dir().is_some() {
        assert_eq!(config.dialect_dirs.len(), 2);
        assert!(config.dialect_dirs[0].ends_with("gcode-sim/dialects"));
    }
}

#[test]
fn test_input_is_required() {
    assert!(Args::try_parse_from(["gcode-sim"]).is_err());
}
