use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const NOTES: &str = "# 1. Intro\n\nHello *world*.\n\n# 2. Usage\n\n- run it\n- read it\n";

#[test]
fn convert_writes_sections_and_main() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.md");
    fs::write(&input, NOTES).unwrap();
    let out = dir.path().join("out");

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg(input.as_os_str())
        .arg("-o")
        .arg(out.as_os_str());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("intro.tex"))
        .stdout(predicate::str::contains("main.tex"));

    let intro = fs::read_to_string(out.join("sections/intro.tex")).unwrap();
    assert_eq!(intro, "\\section{Intro}\n\nHello \\emph{world}.\n");
    let usage = fs::read_to_string(out.join("sections/usage.tex")).unwrap();
    assert!(usage.contains("\\begin{itemize}"));

    let main = fs::read_to_string(out.join("main.tex")).unwrap();
    assert!(main.contains("\\title{notes}"));
    assert!(main.contains("\\input{sections/intro}\n\\input{sections/usage}"));
}

#[test]
fn convert_is_the_default_command() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.md"), NOTES).unwrap();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path()).arg("notes.md");
    cmd.assert().success();

    assert!(dir.path().join("sections/intro.tex").is_file());
    assert!(dir.path().join("main.tex").is_file());
}

#[test]
fn validation_errors_stop_conversion() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bad.md"), "# Top\n### Too deep\nText\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path()).arg("convert").arg("bad.md");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Validation failed"));
    assert!(!dir.path().join("main.tex").exists());

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg("bad.md")
        .arg("--force");
    cmd.assert().success();
    assert!(dir.path().join("sections/top.tex").is_file());
}

#[test]
fn images_resolve_relative_to_output() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("chart.png"), b"png").unwrap();
    fs::write(dir.path().join("doc.md"), "# Figures\n\n![Growth](chart.png)\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path()).arg("doc.md").arg("-o").arg("build");
    cmd.assert().success();

    let figures = fs::read_to_string(dir.path().join("build/sections/figures.tex")).unwrap();
    assert!(figures.contains("\\includegraphics[width=\\linewidth]{../chart.png}"));
    assert!(figures.contains("\\label{fig:chart}"));
}

#[test]
fn backups_keep_previous_output() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.md"), NOTES).unwrap();
    fs::create_dir_all(dir.path().join("sections")).unwrap();
    fs::write(dir.path().join("sections/intro.tex"), "old").unwrap();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path()).arg("notes.md").arg("--backup");
    cmd.assert().success();

    let backup = fs::read_to_string(dir.path().join("sections/intro.tex.bak")).unwrap();
    assert_eq!(backup, "old");
}

#[test]
fn missing_input_is_reported() {
    let dir = tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path()).arg("convert").arg("nope.md");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error reading file 'nope.md'"));
}

#[test]
fn languages_lists_the_alias_table() {
    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.arg("languages");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("JavaScript"))
        .stdout(predicate::str::contains("Untagged and unknown fences use Python."));
}

#[cfg(all(unix, feature = "native-export"))]
#[test]
fn build_runs_the_engine() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let stub = dir.path().join("fake-latex.sh");
    fs::write(
        &stub,
        "#!/bin/sh\nfor arg in \"$@\"; do last=\"$arg\"; done\nprintf '%%PDF-1.5\\n' > \"${last%.tex}.pdf\"\n",
    )
    .unwrap();
    let mut perms = fs::metadata(&stub).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&stub, perms).unwrap();
    fs::write(dir.path().join("notes.md"), NOTES).unwrap();

    let mut cmd = cargo_bin_cmd!("mdtex");
    cmd.current_dir(dir.path())
        .env("MDTEX_LATEX_BIN", &stub)
        .arg("build")
        .arg("notes.md")
        .arg("-o")
        .arg("out");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("main.pdf"));
    assert!(dir.path().join("out/main.pdf").is_file());
}
