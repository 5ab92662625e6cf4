use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn validate_reports_issues() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("doc.md"),
        "# Guide\n## Notes\n## Notes\n### Steps:\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path()).arg("validate").arg("doc.md");
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("error: line 3: duplicate title 'Notes'"))
        .stdout(predicate::str::contains("warning: line 4: heading ends with a colon"))
        .stdout(predicate::str::contains("1 error(s), 1 warning(s)"));
}

#[test]
fn skip_hierarchy_check_allows_jumps() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "# Top\n#### Deep\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path()).arg("validate").arg("doc.md");
    cmd.assert().failure();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path())
        .arg("validate")
        .arg("doc.md")
        .arg("--skip-hierarchy-check");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0 error(s)"));
}

#[test]
fn write_cleaned_saves_repaired_copy() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "\\# Title\n##Sub\n``python\nx = 1\n``\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path())
        .arg("validate")
        .arg("doc.md")
        .arg("--write-cleaned");
    cmd.assert().success();

    let cleaned = fs::read_to_string(dir.path().join("doc.cleaned.md")).unwrap();
    assert_eq!(cleaned, "# Title\n## Sub\n```python\nx = 1\n```\n");
}

#[test]
fn json_report() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "no headings here\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path())
        .arg("validate")
        .arg("doc.md")
        .arg("--json")
        .arg("--force");
    let output = cmd.assert().success().get_output().stdout.clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["issues"][0]["level"], "error");
    assert_eq!(report["issues"][0]["message"], "no headings found in the document");
}
