//! Binary-level tests for `pgate`: flag parsing, exit codes, and output.

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use clap::Parser;
use patchgate::cli::{ApplyArgs, AutomodeState, Cli, Commands};
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;

const UPDATE_PATCH: &str = "*** Begin Patch\n\
                            *** Update File: a.txt\n\
                            @@\n \
                            one\n\
                            -two\n\
                            +TWO\n\
                            *** Add File: notes/new.txt\n\
                            +hello\n\
                            *** End Patch\n";

fn pgate(dir: &assert_fs::TempDir) -> Command
{
    let mut cmd = Command::cargo_bin("pgate").expect("bin");
    cmd.current_dir(dir.path())
        .env_remove("PGATE_LOG")
        .env_remove("PGATE_AUTOMODE")
        .env("PGATE_LOCK_DIR", dir.path().join(".locks"));
    cmd
}

fn fixture() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("a.txt")
        .write_str("one\ntwo\nthree\n")
        .expect("write a.txt");
    tmp.child("change.patch")
        .write_str(UPDATE_PATCH)
        .expect("write patch");
    tmp
}

#[test]
fn apply_flags_parse()
{
    let cli = Cli::parse_from(["pgate", "apply", "p.patch", "--yes", "--fuzz-threshold", "5", "--json", "-vv"]);

    assert_eq!(cli.verbose, 2);
    match cli.command
    {
        Commands::Apply(ApplyArgs { patch, yes, fuzz_threshold, json, .. }) =>
        {
            assert_eq!(patch.as_deref(), Some(std::path::Path::new("p.patch")));
            assert!(yes && json);
            assert_eq!(fuzz_threshold, Some(5));
        }
        _ => panic!("expected Apply command"),
    }

    let cli = Cli::parse_from(["pgate", "automode", "status"]);
    assert!(matches!(cli.command, Commands::Automode(ref a) if a.state == AutomodeState::Status));
}

#[test]
fn apply_with_yes_writes_files()
{
    let tmp = fixture();

    pgate(&tmp)
        .args(["--no-color", "apply", "change.patch", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Successfully applied patch to 2 files"));

    tmp.child("a.txt")
        .assert("one\nTWO\nthree\n");
    tmp.child("notes/new.txt")
        .assert("hello");
}

#[test]
fn apply_json_reports_metadata()
{
    let tmp = fixture();

    let assert = pgate(&tmp)
        .args(["apply", "change.patch", "--yes", "--json"])
        .assert()
        .success();
    let out = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let v: Value = serde_json::from_str(out.trim()).expect("valid json");

    insta::assert_yaml_snapshot!(v["metadata"], @r#"
    additions: 2
    files_changed:
      - a.txt
      - notes/new.txt
    removals: 1
    "#);
    assert_eq!(v["is_error"], false);
}

#[test]
fn denied_prompt_exits_two_and_writes_nothing()
{
    let tmp = fixture();

    // stdin is closed, so the prompt reads end of input
    pgate(&tmp)
        .args(["--no-color", "apply", "change.patch"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("permission denied for modifying file: a.txt"));

    tmp.child("a.txt")
        .assert("one\ntwo\nthree\n");
    tmp.child("notes/new.txt")
        .assert(predicate::path::missing());
}

#[test]
fn rejected_patch_exits_two()
{
    let tmp = fixture();
    tmp.child("dup.patch")
        .write_str("*** Begin Patch\n*** Add File: a.txt\n+x\n*** End Patch\n")
        .expect("write patch");

    pgate(&tmp)
        .args(["apply", "dup.patch", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("file already exists"));
}

#[test]
fn check_and_dry_run_leave_files_alone()
{
    let tmp = fixture();

    pgate(&tmp)
        .args(["--no-color", "check", "change.patch", "--diff"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("update a.txt (+1 -1)")
                .and(predicate::str::contains("add    notes/new.txt (+1 -0)"))
                .and(predicate::str::contains("2 files, fuzz 0"))
                .and(predicate::str::contains("+++ b/a.txt")),
        );

    pgate(&tmp)
        .args(["--no-color", "--dry-run", "apply", "change.patch", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    tmp.child("a.txt")
        .assert("one\ntwo\nthree\n");
    tmp.child("notes/new.txt")
        .assert(predicate::path::missing());
}

#[test]
fn files_lists_directive_paths()
{
    let tmp = fixture();

    pgate(&tmp)
        .args(["files", "change.patch", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"needed":["a.txt"],"added":["notes/new.txt"],"moved_to":[]}"#));
}

#[test]
fn automode_persists_in_config()
{
    let tmp = fixture();

    pgate(&tmp)
        .args(["automode", "on"])
        .assert()
        .success();
    tmp.child("pgate.toml")
        .assert(predicate::str::contains("automode = true"));

    pgate(&tmp)
        .args(["automode", "status"])
        .assert()
        .success()
        .stdout("automode: on\n");

    // automode grants without --yes
    pgate(&tmp)
        .args(["apply", "change.patch"])
        .assert()
        .success();
    tmp.child("a.txt")
        .assert("one\nTWO\nthree\n");
}

#[test]
fn completions_print_by_default_and_install_into_out_dir()
{
    let tmp = fixture();

    pgate(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_pgate()"));

    pgate(&tmp)
        .args(["completions", "bash", "--out-dir", "comp"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("Installed bash completions for pgate"));
    tmp.child("comp/pgate.bash")
        .assert(predicate::str::contains("complete -F _pgate"));
}
