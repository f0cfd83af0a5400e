//! The `linegraph` binary.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn linegraph(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("linegraph").unwrap();
    cmd.env("LINEGRAPH_CONFIG_PATH", config).env_remove("RUST_LOG").arg("--quiet");
    cmd
}

fn write_config(temp: &TempDir) -> Result<std::path::PathBuf> {
    let path = temp.path().join("config.toml");
    let web_root = temp.path().join("web");
    std::fs::write(
        &path,
        format!(
            "web_root = {:?}\nscratch_dir = {:?}\n",
            web_root.to_string_lossy(),
            temp.path().join("scratch").to_string_lossy()
        ),
    )?;
    Ok(path)
}

#[test]
fn test_config_path_follows_env() -> Result<()> {
    let temp = TempDir::new()?;
    let config = temp.path().join("custom.toml");

    linegraph(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
    Ok(())
}

#[test]
fn test_config_init_then_refuses_overwrite() -> Result<()> {
    let temp = TempDir::new()?;
    let config = temp.path().join("nested/config.toml");

    linegraph(&config)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config"));
    let content = std::fs::read_to_string(&config)?;
    assert!(content.contains("site_base_url = \"https://data.example.org\""));
    assert!(content.contains("[render_service]"));

    linegraph(&config)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    linegraph(&config).args(["config", "init", "--force"]).assert().success();
    Ok(())
}

#[test]
fn test_config_show() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(&temp)?;

    linegraph(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web_root").and(predicate::str::contains("[render_service]")));
    Ok(())
}

#[test]
fn test_invalidate_removes_cached_charts() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(&temp)?;
    let dir = temp.path().join("web/uploads/files/graphs/datatype_5");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("Chart__10_11_12_1000.svg"), "<svg/>")?;
    std::fs::write(dir.join("Chart__10_999.svg"), "<svg/>")?;

    linegraph(&config)
        .args(["invalidate", "--datatype", "5", "--file", "11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 cached chart for file 11"));

    assert!(!dir.join("Chart__10_11_12_1000.svg").exists());
    assert!(dir.join("Chart__10_999.svg").exists());

    linegraph(&config)
        .args(["invalidate", "--datatype", "5", "--file", "11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached charts"));
    Ok(())
}

#[test]
fn test_render_fragment_from_request_file() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(&temp)?;
    let request = temp.path().join("request.json");
    std::fs::write(
        &request,
        r#"{
            "datatype": {"id": 5, "fields": [
                {"id": 1, "name": "Sample", "type_class": "ShortVarchar"},
                {"id": 2, "name": "Data", "type_class": "File"}
            ]},
            "bindings": {"pivot_field": 1, "graph_file": 2},
            "record_set": {"records": [
                {"id": "7", "values": {"1": {"type": "ShortText", "value": "Run A"}},
                 "files": {"2": [{"id": 10, "local_path": "/tmp/File_10.csv"}]}}
            ]}
        }"#,
    )?;

    linegraph(&config)
        .args(["render", "--request"])
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("Run A").and(predicate::str::contains("linegraph-record")));
    Ok(())
}

#[test]
fn test_render_build_without_target_fails() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(&temp)?;
    let request = temp.path().join("request.json");
    std::fs::write(&request, r#"{"datatype": {"id": 5}, "bindings": {}}"#)?;

    linegraph(&config)
        .args(["render", "--build", "--request"])
        .arg(&request)
        .assert()
        .failure();
    Ok(())
}
