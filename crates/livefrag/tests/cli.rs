use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn livefrag() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_livefrag"));
    command.env_remove("LIVEFRAG_SOURCE").env_remove("RUST_LOG");
    command
}

#[test]
fn fingerprint_prints_rolling_hash() {
    let dir = TempDir::new().unwrap();
    let shader = dir.path().join("hello.frag");
    fs::write(&shader, "void main(){gl_FragColor=vec4(1.0);}").unwrap();

    let output = livefrag()
        .arg("fingerprint")
        .arg(&shader)
        .output()
        .expect("failed to run livefrag fingerprint");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "-645961105");
}

#[test]
fn config_json_reflects_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("livefrag.toml");
    fs::write(
        &config,
        "source = \"http://127.0.0.1:5000/dev.frag\"\npoll_interval = \"250ms\"\n",
    )
    .unwrap();

    let output = livefrag()
        .env("LIVEFRAG_CONFIG", &config)
        .args(["config", "--json"])
        .output()
        .expect("failed to run livefrag config");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("http://127.0.0.1:5000/dev.frag"), "{stdout}");
    assert!(stdout.contains("\"250ms\""), "{stdout}");
}

#[test]
fn config_rejects_too_short_interval() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("livefrag.toml");
    fs::write(&config, "").unwrap();

    let output = livefrag()
        .env("LIVEFRAG_CONFIG", &config)
        .args(["config", "--interval", "1ms"])
        .output()
        .expect("failed to run livefrag config");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("at least 10ms"));
}

#[test]
fn fingerprint_of_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    let status = livefrag()
        .arg("fingerprint")
        .arg(dir.path().join("missing.frag"))
        .status()
        .expect("failed to run livefrag fingerprint");

    assert!(!status.success());
}
