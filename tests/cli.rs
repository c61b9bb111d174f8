//! Integration tests for the `tb` command line.
//!
//! Each test works in its own temporary data directory so runs never share a task
//! document.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the tb binary, pointed at a temp data directory.
fn tb_in(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tb"));
    cmd.arg("--data-dir").arg(dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    String::from_utf8(output.stdout).unwrap()
}

/// Add a task and return its id.
fn add(dir: &TempDir, args: &[&str]) -> String {
    let out = stdout_of(tb_in(dir).arg("add").args(args));
    out.trim()
        .strip_prefix("Added ")
        .expect("add prints the new id")
        .to_string()
}

/// Id of the subtask whose text is `text`, read from `tb show`.
fn subtask_id(dir: &TempDir, task: &str, text: &str) -> String {
    let out = stdout_of(tb_in(dir).args(["show", task]));
    out.lines()
        .find(|l| l.starts_with("  ") && l.trim_end().ends_with(text))
        .and_then(|l| l.split_whitespace().next())
        .expect("subtask listed")
        .to_string()
}

// === Add / List ===

#[test]
fn test_empty_board() {
    let temp = TempDir::new().unwrap();
    tb_in(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks."));
}

#[test]
fn test_add_then_list() {
    let temp = TempDir::new().unwrap();
    add(&temp, &["Buy milk", "--due", "today"]);
    add(&temp, &["Launch", "--subtask", "Design", "--subtask", "Build"]);

    tb_in(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Buy milk"))
        .stdout(predicate::str::contains("[ ]"))
        .stdout(predicate::str::contains("- Design, Build"));

    assert!(temp.path().join("tasks.json").is_file());
}

#[test]
fn test_add_rejects_blank_text_and_bad_date() {
    let temp = TempDir::new().unwrap();
    tb_in(&temp)
        .args(["add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("text must not be empty"));
    tb_in(&temp)
        .args(["add", "Later", "--due", "someday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a recognised date"));
    tb_in(&temp)
        .arg("list")
        .assert()
        .stdout(predicate::str::contains("No tasks."));
}

// === Progress ===

#[test]
fn test_leaf_progress_is_clamped() {
    let temp = TempDir::new().unwrap();
    let id = add(&temp, &["Buy milk"]);

    tb_in(&temp)
        .args(["progress", &id, "150"])
        .assert()
        .success()
        .stdout(predicate::str::contains("100%"));
    tb_in(&temp)
        .args(["list", "--filter", "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[x]"))
        .stdout(predicate::str::contains("completed"));

    tb_in(&temp)
        .args(["progress", &id, "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a whole number"));
}

#[test]
fn test_subtask_progress_completes_task() {
    let temp = TempDir::new().unwrap();
    let id = add(&temp, &["Launch", "--subtask", "Design", "--subtask", "Build"]);
    let design = subtask_id(&temp, &id, "Design");
    let build = subtask_id(&temp, &id, "Build");

    tb_in(&temp)
        .args(["progress", &id, "100", "--subtask", &design])
        .assert()
        .success();
    tb_in(&temp)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress:  50%"))
        .stdout(predicate::str::contains("Status:    open"));

    tb_in(&temp)
        .args(["progress", &id, "100", "--subtask", &build])
        .assert()
        .success();
    tb_in(&temp)
        .args(["list", "--filter", "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Launch"))
        .stdout(predicate::str::contains("[x]"));
}

#[test]
fn test_composite_progress_needs_subtask() {
    let temp = TempDir::new().unwrap();
    let id = add(&temp, &["Launch", "--subtask", "Design"]);
    tb_in(&temp)
        .args(["progress", &id, "40"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has subtasks"));
}

// === Search / Filter ===

#[test]
fn test_search_without_match() {
    let temp = TempDir::new().unwrap();
    add(&temp, &["Buy milk"]);
    tb_in(&temp)
        .args(["list", "--search", "MILK"])
        .assert()
        .stdout(predicate::str::contains("Buy milk"));
    tb_in(&temp)
        .args(["list", "--search", "zebra"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks."));
}

#[test]
fn test_overdue_filter() {
    let temp = TempDir::new().unwrap();
    add(&temp, &["Late report", "--due", "2000-01-01"]);
    add(&temp, &["Future plan", "--due", "in 30d"]);

    tb_in(&temp)
        .args(["list", "--filter", "overdue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Late report"))
        .stdout(predicate::str::contains("Future plan").not());
    tb_in(&temp)
        .args(["list", "--filter", "pending"])
        .assert()
        .stdout(predicate::str::contains("Future plan"))
        .stdout(predicate::str::contains("Late report").not());
}

// === Move / Edit / Delete ===

#[test]
fn test_move_reorders_board() {
    let temp = TempDir::new().unwrap();
    add(&temp, &["first"]);
    add(&temp, &["second"]);
    let third = add(&temp, &["third"]);

    tb_in(&temp)
        .args(["move", &third, "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved to 0"));

    let out = stdout_of(tb_in(&temp).arg("list"));
    let order: Vec<usize> = ["third", "first", "second"]
        .iter()
        .map(|t| out.find(t).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{out}");
}

#[test]
fn test_edit_to_leaf() {
    let temp = TempDir::new().unwrap();
    let id = add(&temp, &["Launch", "--subtask", "Design"]);

    tb_in(&temp)
        .args(["edit", &id, "--text", "Ship it", "--leaf"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Updated {id}")));
    tb_in(&temp)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ship it"))
        .stdout(predicate::str::contains("Progress:  0%"))
        .stdout(predicate::str::contains("Subtasks").not());
}

#[test]
fn test_delete_task_and_subtask() {
    let temp = TempDir::new().unwrap();
    let id = add(&temp, &["Launch", "--subtask", "Design", "--subtask", "Build"]);
    let design = subtask_id(&temp, &id, "Design");

    tb_in(&temp)
        .args(["delete", &id, "--subtask", &design])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted."));
    tb_in(&temp)
        .arg("list")
        .assert()
        .stdout(predicate::str::contains("- Build"))
        .stdout(predicate::str::contains("Design").not());

    tb_in(&temp).args(["delete", &id]).assert().success();
    tb_in(&temp)
        .arg("list")
        .assert()
        .stdout(predicate::str::contains("No tasks."));
}

#[test]
fn test_unknown_id_exits_non_zero() {
    let temp = TempDir::new().unwrap();
    for args in [["show", "42"], ["delete", "42"], ["progress", "42"]] {
        let mut cmd = tb_in(&temp);
        cmd.args(args);
        if args[0] == "progress" {
            cmd.arg("10");
        }
        cmd.assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Task 42 not found."));
    }
}

// === Config / Completions ===

#[test]
fn test_config_default_filter() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.toml"), "default-filter = \"completed\"\n").unwrap();
    add(&temp, &["Buy milk"]);
    tb_in(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks."));
}

#[test]
fn test_bad_config_is_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.toml"), "colour = \"blue\"\n").unwrap();
    tb_in(&temp)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config"));
}

#[test]
fn test_completions() {
    let temp = TempDir::new().unwrap();
    tb_in(&temp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tb"));
}
