use std::fs;
use std::path::PathBuf;

use gcode_sim::dialect;
use gcode_sim::validation::{Severity, validate_document};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read_to_string(path).expect("read fixture")
}

#[test]
fn test_fixtures_are_valid() {
    let linuxcnc = dialect::builtin("linuxcnc").unwrap();
    let result = validate_document(&fixture("sample_mill.ngc"), &linuxcnc);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let marlin = dialect::builtin("marlin2").unwrap();
    let result = validate_document(&fixture("sample_marlin.gcode"), &marlin);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn test_printer_program_against_mill_dialect() {
    let linuxcnc = dialect::builtin("linuxcnc").unwrap();
    let result = validate_document(&fixture("sample_marlin.gcode"), &linuxcnc);
    assert!(!result.is_valid());

    // M82 and E words are unknown to the mill; M1xx are user defined there
    let lines: Vec<usize> = result.diagnostics.iter().map(|d| d.line).collect();
    assert!(!lines.contains(&4));
    assert!(lines.contains(&9));
    assert!(lines.contains(&12));
}

#[test]
fn test_errors_do_not_stop_validation() {
    let d = dialect::builtin("linuxcnc").unwrap();
    let content = "G1 X1\nG2 X5\nG0 G1 X2\nM999\nG1 X3 Y3\n";
    let result = validate_document(content, &d);

    let errors: Vec<usize> = result
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.line)
        .collect();
    assert_eq!(errors, vec![2, 3, 4]);
    assert_eq!(result.error_count(), 3);
}

#[test]
fn test_block_delete_warning() {
    let d = dialect::builtin("linuxcnc").unwrap();
    let result = validate_document("/G0 X1\n", &d);
    assert!(result.is_valid());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].severity, Severity::Warning);
}

#[test]
fn test_diagnostics_json() {
    let d = dialect::builtin("linuxcnc").unwrap();
    let result = validate_document("G2 X5\n", &d);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["diagnostics"][0]["line"], 1);
    assert_eq!(json["diagnostics"][0]["severity"], "error");
}
