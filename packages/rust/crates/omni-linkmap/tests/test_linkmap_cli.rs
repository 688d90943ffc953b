//! Integration tests for the `linkmap` CLI binary.

use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn linkmap_cmd(project: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_linkmap"));
    cmd.env("PRJ_ROOT", project);
    cmd.env_remove("PRJ_CONFIG_HOME");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn notebook() -> Result<TempDir, Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("vault/A.md"), "# Alpha\n[[B]]\n")?;
    write_file(&tmp.path().join("vault/B.md"), "# Beta\n")?;
    write_file(&tmp.path().join("vault/C.md"), "# Gamma\n")?;
    Ok(tmp)
}

fn stdout_json(output: &std::process::Output) -> Result<Value, Box<dyn std::error::Error>> {
    assert!(
        output.status.success(),
        "linkmap failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn test_graph_prints_refresh_message() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let vault = tmp.path().join("vault").canonicalize()?;

    let output = linkmap_cmd(tmp.path())
        .arg("--root")
        .arg(&vault)
        .arg("graph")
        .arg("--current")
        .arg(vault.join("A.md"))
        .output()?;
    let payload = stdout_json(&output)?;

    assert_eq!(payload["type"], "refresh");
    let a = format!("{}/A", vault.display());
    let b = format!("{}/B", vault.display());
    assert_eq!(payload["payload"]["currentNode"], Value::String(a.clone()));
    let list = payload["payload"]["adjacencyList"]
        .as_object()
        .ok_or("missing adjacencyList")?;
    assert_eq!(list.len(), 3);
    assert_eq!(list[&a]["label"], "Alpha");
    assert_eq!(list[&a]["links"], serde_json::json!([b.clone()]));
    assert_eq!(list[&b]["links"], serde_json::json!([a.clone()]));
    Ok(())
}

#[test]
fn test_graph_without_current_omits_field() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let output = linkmap_cmd(tmp.path())
        .arg("--root")
        .arg(tmp.path().join("vault"))
        .arg("graph")
        .output()?;
    let payload = stdout_json(&output)?;
    assert!(payload["payload"].get("currentNode").is_none());
    Ok(())
}

#[test]
fn test_dot_export() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let vault = tmp.path().join("vault").canonicalize()?;
    let output = linkmap_cmd(tmp.path())
        .arg("--root")
        .arg(&vault)
        .arg("dot")
        .output()?;
    assert!(output.status.success());

    let dot = String::from_utf8(output.stdout)?;
    let a = format!("{}/A", vault.display());
    let b = format!("{}/B", vault.display());
    assert!(dot.starts_with("digraph g {\n"));
    assert!(dot.trim_end().ends_with('}'));
    assert!(dot.contains(&format!("\"{a}\" [label=\"Alpha\"];")));
    assert!(dot.contains(&format!("\"{a}\" -> \"{b}\"")));
    assert!(!dot.contains(&format!("\"{b}\" -> \"{a}\"")));
    Ok(())
}

#[test]
fn test_layout_focus_mode() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let vault = tmp.path().join("vault").canonicalize()?;
    let output = linkmap_cmd(tmp.path())
        .arg("--root")
        .arg(&vault)
        .arg("layout")
        .arg("--mode")
        .arg("focus")
        .arg("--current")
        .arg(vault.join("A.md"))
        .output()?;
    let payload = stdout_json(&output)?;

    assert_eq!(payload["mode"], "focus");
    let nodes = payload["nodes"].as_array().ok_or("missing nodes")?;
    assert_eq!(nodes.len(), 3);
    let hidden: Vec<&str> = nodes
        .iter()
        .filter(|n| n["visible"] == Value::Bool(false))
        .filter_map(|n| n["label"].as_str())
        .collect();
    assert_eq!(hidden, vec!["Gamma"]);
    Ok(())
}

#[test]
fn test_settings_from_conf_file_and_file_type_flag() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let conf = tmp.path().join("custom.yaml");
    write_file(&conf, "linkmap:\n  autoStart: true\n  openColumn: two\n")?;

    let output = linkmap_cmd(tmp.path())
        .arg("--conf")
        .arg(&conf)
        .arg("--file-type")
        .arg("markdown")
        .arg("settings")
        .output()?;
    let payload = stdout_json(&output)?;
    assert_eq!(payload["autoStart"], true);
    assert_eq!(payload["openColumn"], "two");
    assert_eq!(payload["fileTypes"], serde_json::json!(["markdown"]));
    Ok(())
}

#[test]
fn test_file_type_flag_changes_scanned_notes() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    write_file(&tmp.path().join("vault/D.markdown"), "# Delta\n")?;
    let output = linkmap_cmd(tmp.path())
        .arg("--root")
        .arg(tmp.path().join("vault"))
        .arg("--file-type")
        .arg("markdown")
        .arg("graph")
        .output()?;
    let payload = stdout_json(&output)?;
    let list = payload["payload"]["adjacencyList"]
        .as_object()
        .ok_or("missing adjacencyList")?;
    assert_eq!(list.len(), 1);
    Ok(())
}

#[test]
fn test_watch_answers_ready_on_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let mut child = linkmap_cmd(tmp.path())
        .arg("--root")
        .arg(tmp.path().join("vault"))
        .arg("watch")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    {
        let stdin = child.stdin.as_mut().ok_or("missing stdin")?;
        stdin.write_all(b"{\"type\":\"ready\"}\n")?;
        stdin.write_all(b"{\"type\":\"click\",\"payload\":{\"path\":\"/x/A.md\"}}\n")?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output()?;
    assert!(
        output.status.success(),
        "linkmap watch failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<Value> = stdout
        .lines()
        .map(serde_json::from_str::<Value>)
        .collect::<Result<_, _>>()?;
    assert!(lines.iter().any(|line| line["type"] == "refresh"));
    assert!(lines.iter().any(|line| line["type"] == "openDocument"
        && line["path"] == "/x/A.md"
        && line["column"] == 1));
    Ok(())
}

#[test]
fn test_missing_root_fails() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let output = linkmap_cmd(tmp.path())
        .arg("--root")
        .arg(tmp.path().join("does-not-exist"))
        .arg("graph")
        .output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_auto_start_watches_without_subcommand() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let conf = tmp.path().join("auto.yaml");
    write_file(&conf, "linkmap:\n  autoStart: true\n")?;

    let mut child = linkmap_cmd(tmp.path())
        .arg("--root")
        .arg(tmp.path().join("vault"))
        .arg("--conf")
        .arg(&conf)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    {
        let stdin = child.stdin.as_mut().ok_or("missing stdin")?;
        stdin.write_all(b"{\"type\":\"ready\"}\n")?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output()?;
    assert!(
        output.status.success(),
        "linkmap failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    let first = stdout.lines().next().ok_or("no output")?;
    let message = serde_json::from_str::<Value>(first)?;
    assert_eq!(message["type"], "refresh");
    assert_eq!(
        message["payload"]["adjacencyList"]
            .as_object()
            .map(serde_json::Map::len),
        Some(3)
    );
    Ok(())
}

#[test]
fn test_no_subcommand_without_auto_start_fails() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let output = linkmap_cmd(tmp.path())
        .arg("--root")
        .arg(tmp.path().join("vault"))
        .stdin(Stdio::null())
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("autoStart"));
    Ok(())
}
