use std::process::Command;

fn shiseitai() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_shiseitai"));
    cmd.env("RUST_LOG", "off")
        .env_remove("SHISEITAI_POPULATION")
        .env_remove("SHISEITAI_GENERATIONS")
        .env_remove("SHISEITAI_NUTRIENTS")
        .env_remove("SHISEITAI_PRESET")
        .env_remove("SHISEITAI_TOXIC")
        .env_remove("SHISEITAI_SEED")
        .env_remove("SHISEITAI_CONFIG");
    cmd
}

#[test]
fn run_writes_a_readable_run_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("run.json");
    let output = shiseitai()
        .args(["run", "--population", "8", "--generations", "2", "--preset", "harbor"])
        .args(["--seed", "1234", "--run-id", "run-smoke", "--output"])
        .arg(&path)
        .output()
        .expect("failed to run shiseitai binary");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("run-smoke"));

    let raw = std::fs::read_to_string(&path).expect("run file");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(json["runId"], "run-smoke");
    assert_eq!(json["seed"], 1234);
    assert_eq!(json["biome"], "harbor");
    assert_eq!(json["schemaVersion"], "v1");
    assert_eq!(json["generations"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["toxicWords"].as_array().map(Vec::len), Some(2));
}

#[test]
fn json_flag_prints_the_whole_run() {
    let output = shiseitai()
        .args(["run", "--population", "4", "--generations", "1"])
        .args(["--nutrients", "雨、灯、石", "--toxic", "腐食", "--seed", "7", "--json"])
        .output()
        .expect("failed to run shiseitai binary");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json on stdout");
    assert_eq!(json["nutrients"], serde_json::json!(["雨", "灯", "石"]));
    assert_eq!(json["toxicWords"], serde_json::json!(["腐食"]));
    assert_eq!(json["specimens"].as_array().map(Vec::len), Some(3));
}

#[test]
fn rejects_out_of_range_population() {
    let status = shiseitai()
        .args(["run", "--population", "0"])
        .status()
        .expect("failed to run shiseitai binary");
    assert!(!status.success());
}

#[test]
fn lists_presets() {
    let output = shiseitai().arg("presets").output().expect("failed to run shiseitai binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for key in ["garden", "work", "cosmic", "body", "harbor", "ritual"] {
        assert!(stdout.contains(key), "missing {key}");
    }
}
