use anyhow::Result;
use std::process::{Command, Output};

#[path = "../common/mod.rs"]
mod common;
use common::write_json_file;

fn relopt(args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_relopt"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()?;
    Ok(output)
}

/// Test that the convert command prints the algebra expression
#[test]
fn test_cli_convert() -> Result<()> {
    let output = relopt(&["convert", "SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID WHERE B.Y > 10;"])?;
    assert!(output.status.success(), "convert command failed");

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.trim(), "π_{A.X}(σ_{B.Y > 10}((A ⋈_{A.ID = B.A_ID} B)))");
    Ok(())
}

/// Test that every stage is printed in order with --steps
#[test]
fn test_cli_convert_steps() -> Result<()> {
    let output = relopt(&["convert", "--steps", "SELECT * FROM T WHERE T.X = 1;"])?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let stages: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split(':').next())
        .collect();
    assert_eq!(stages, vec!["join", "selection", "projection", "final"]);
    Ok(())
}

/// Test that parse errors are reported and the process fails
#[test]
fn test_cli_rejects_invalid_query() -> Result<()> {
    let output = relopt(&["convert", "SELECT * FROM T"])?;
    assert!(!output.status.success(), "invalid query must fail");

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Missing ';'"), "unexpected error output: {}", stderr);
    Ok(())
}

/// Test the optimization report as JSON
#[test]
fn test_cli_optimize_json() -> Result<()> {
    let output = relopt(&[
        "optimize",
        "--json",
        "SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID WHERE B.Y > 10;",
    ])?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let steps = report["steps"].as_array().cloned().unwrap_or_default();
    let names: Vec<&str> = steps.iter().filter_map(|s| s["heuristic"].as_str()).collect();
    assert_eq!(
        names,
        vec!["selection_pushdown", "projection_pushdown", "cartesian_avoidance", "join_reordering"]
    );
    assert_eq!(report["model"]["where_clause"], serde_json::json!([]));
    Ok(())
}

/// Test that a schema file restricts the accepted tables
#[test]
fn test_cli_with_schema_file() -> Result<()> {
    let schema = write_json_file(r#"{"tables": {"ALUNOS": ["ID", "NOME"]}}"#)?;
    let schema_path = schema.path().to_string_lossy().to_string();

    let ok = relopt(&["--schema", &schema_path, "convert", "SELECT ALUNOS.NOME FROM ALUNOS;"])?;
    assert!(ok.status.success());
    assert_eq!(String::from_utf8(ok.stdout)?.trim(), "π_{ALUNOS.NOME}(ALUNOS)");

    let rejected = relopt(&["--schema", &schema_path, "convert", "SELECT * FROM CURSOS;"])?;
    assert!(!rejected.status.success());
    assert!(String::from_utf8(rejected.stderr)?.contains("CURSOS"));
    Ok(())
}

/// Test that a malformed statistics file is reported
#[test]
fn test_cli_bad_statistics_file() -> Result<()> {
    let stats = write_json_file("{ not json")?;
    let stats_path = stats.path().to_string_lossy().to_string();

    let output = relopt(&["--stats", &stats_path, "optimize", "SELECT * FROM T;"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("Failed to load statistics"));
    Ok(())
}

/// Test the explain command output sections
#[test]
fn test_cli_explain() -> Result<()> {
    let output = relopt(&["explain", "SELECT A.X FROM A INNER JOIN B ON A.ID = B.A_ID;"])?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Plan:"));
    assert!(stdout.contains("1. SCAN - Table: A"));
    assert!(stdout.contains("JOIN - Join with B: A.ID = B.A_ID"));
    assert!(stdout.contains("\"join_count\": 1"));
    Ok(())
}
