use assert_cmd::Command;

#[test]
fn runs_a_small_script_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("orchestrator")?;

    let script = r#"{"config":{"phases":[{"arrivalRate":5,"duration":1}]}}"#;
    cmd.arg("--completion-deadline-secs")
        .arg("5")
        .write_stdin(script);

    cmd.assert().success();

    Ok(())
}

#[test]
fn rejects_a_script_with_no_phases() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("orchestrator")?;

    cmd.write_stdin(r#"{"config":{"phases":[]}}"#);

    cmd.assert().failure();

    Ok(())
}

#[test]
fn rejects_malformed_json() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("orchestrator")?;

    cmd.write_stdin("not json");

    cmd.assert().failure();

    Ok(())
}
