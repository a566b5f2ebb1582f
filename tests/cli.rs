//! CLI smoke tests.

use assert_cmd::Command;
use predicates::prelude::*;

fn write_intake(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("intake.json");
    std::fs::write(
        &path,
        serde_json::json!({
            "estatePlan": { "stateOfResidence": "Texas" },
            "personal": { "data": "{\"age\": 67}" },
            "existingDocuments": { "data": "{\"hasWill\": true}" }
        })
        .to_string(),
    )
    .unwrap();
    path
}

#[test]
fn runs_lists_all_thirteen_entries() {
    let assert = Command::cargo_bin("gapcheck").unwrap().arg("runs").assert();
    assert
        .success()
        .stdout(predicate::str::contains("state_law_research"))
        .stdout(predicate::str::contains("final_report"))
        .stdout(predicate::str::contains("final_analysis.json"));
}

#[test]
fn plan_reports_applicable_runs_and_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let intake = write_intake(&dir);

    let assert = Command::cargo_bin("gapcheck")
        .unwrap()
        .arg("plan")
        .arg(&intake)
        .assert();
    assert
        .success()
        .stdout(predicate::str::contains("Texas"))
        .stdout(predicate::str::contains("existing_document_review"))
        // 67-year-old with no reported assets: medicaid stays (age), asset
        // protection is skipped.
        .stdout(predicate::str::contains("Skipped for this client"))
        .stdout(predicate::str::contains("Estimated duration"));
}

#[test]
fn plan_rejects_malformed_intake() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{not json").unwrap();

    Command::cargo_bin("gapcheck")
        .unwrap()
        .arg("plan")
        .arg(&path)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn plan_rejects_missing_intake_file() {
    Command::cargo_bin("gapcheck")
        .unwrap()
        .arg("plan")
        .arg("/nonexistent/intake.json")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn analyze_dry_run_completes_against_stub() {
    let dir = tempfile::tempdir().unwrap();
    let intake = write_intake(&dir);
    let output_dir = dir.path().join("generated");

    let assert = Command::cargo_bin("gapcheck")
        .unwrap()
        .arg("analyze")
        .arg(&intake)
        .arg("--dry-run")
        .arg("--output-dir")
        .arg(&output_dir)
        .assert();
    assert
        .success()
        .stdout(predicate::str::contains("Status:      completed"))
        .stdout(predicate::str::contains("Final score:"));

    assert!(output_dir.join("report.json").is_file());
    assert!(output_dir.join("final_analysis.json").is_file());
}
