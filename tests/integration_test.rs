use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

fn rfpdesk_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rfpdesk"));
    cmd.current_dir(dir).env_remove("RFPDESK_DIR");
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    rfpdesk_cmd(dir).args(args).output().unwrap()
}

/// Run a command with `--json` and parse its stdout
fn run_json(dir: &Path, args: &[&str]) -> Value {
    let mut args = args.to_vec();
    args.push("--json");
    let output = run(dir, &args);
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn init(dir: &Path) {
    let output = run(dir, &["init"]);
    assert!(output.status.success());
}

fn create_rfp(dir: &Path, title: &str, scope: &str) -> String {
    let rfp = run_json(
        dir,
        &["rfp", "create", title, "--company", "acme", "--scope", scope],
    );
    rfp["id"].as_str().unwrap().to_string()
}

fn section_id(dir: &Path, rfp_id: &str, key: &str) -> String {
    let sections = run_json(dir, &["sections", rfp_id]);
    sections
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["section_key"] == key)
        .and_then(|s| s["id"].as_str())
        .unwrap()
        .to_string()
}

#[test]
fn test_init_creates_store_directory() {
    let tmp = TempDir::new().unwrap();

    let output = run(tmp.path(), &["init"]);

    assert!(output.status.success());
    assert!(tmp.path().join(".rfpdesk").exists());
    assert!(tmp.path().join(".rfpdesk/loro.db").exists());
}

#[test]
fn test_init_twice_fails() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());

    let output = run(tmp.path(), &["init"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Already initialized"));
}

#[test]
fn test_command_without_init_fails() {
    let tmp = TempDir::new().unwrap();

    let output = run(tmp.path(), &["rfp", "list", "--company", "acme"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not in an rfpdesk project"));
}

#[test]
fn test_project_root_from_env() {
    let project = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();

    let output = rfpdesk_cmd(elsewhere.path())
        .env("RFPDESK_DIR", project.path())
        .args(["init"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(project.path().join(".rfpdesk/loro.db").exists());

    let output = rfpdesk_cmd(elsewhere.path())
        .env("RFPDESK_DIR", project.path())
        .args(["rfp", "create", "Homepage", "--company", "acme"])
        .output()
        .unwrap();
    assert!(output.status.success());
}

#[test]
fn test_create_seeds_sections_in_order() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let rfp_id = create_rfp(tmp.path(), "Homepage", "Redesign homepage");

    let sections = run_json(tmp.path(), &["sections", &rfp_id]);
    let keys: Vec<&str> = sections
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["section_key"].as_str().unwrap())
        .collect();
    assert_eq!(
        keys,
        vec![
            "agency_overview",
            "approach",
            "team",
            "work_samples",
            "plan_timeline",
            "pricing",
            "references"
        ]
    );
    assert!(sections
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["status"] == "empty" && s["is_stale"] == false));

    let bindings = run_json(tmp.path(), &["bindings", "show", &rfp_id]);
    assert_eq!(bindings["rfp_id"], rfp_id.as_str());
    assert_eq!(bindings["team_member_ids"], serde_json::json!([]));
}

#[test]
fn test_rfp_update_and_get() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let rfp_id = create_rfp(tmp.path(), "Homepage", "Redesign homepage");

    let updated = run_json(
        tmp.path(),
        &[
            "rfp",
            "update",
            &rfp_id,
            "--status",
            "in_progress",
            "--competitor",
            "Globex",
            "--due",
            "2026-12-01",
        ],
    );
    assert_eq!(updated["status"], "in_progress");
    assert_eq!(updated["title"], "Homepage");
    assert_eq!(updated["due_date"], "2026-12-01");

    let output = run(tmp.path(), &["rfp", "get", &rfp_id]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Homepage"));
    assert!(stdout.contains("in_progress"));
    assert!(stdout.contains("Globex"));

    let output = run(tmp.path(), &["rfp", "update", &rfp_id, "--status", "pending"]);
    assert!(!output.status.success());
}

#[test]
fn test_rfp_update_clears_due_date_and_opportunity() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let rfp_id = create_rfp(tmp.path(), "Homepage", "Redesign homepage");

    let updated = run_json(
        tmp.path(),
        &[
            "rfp",
            "update",
            &rfp_id,
            "--due",
            "2026-12-01",
            "--opportunity",
            "opp-7",
        ],
    );
    assert_eq!(updated["due_date"], "2026-12-01");
    assert_eq!(updated["opportunity_id"], "opp-7");

    let updated = run_json(
        tmp.path(),
        &["rfp", "update", &rfp_id, "--clear-due", "--clear-opportunity"],
    );
    assert!(updated["due_date"].is_null());
    assert!(updated["opportunity_id"].is_null());
    assert_eq!(updated["title"], "Homepage");

    let rfp = run_json(tmp.path(), &["rfp", "get", &rfp_id]);
    assert!(rfp["due_date"].is_null());
    assert!(rfp["opportunity_id"].is_null());

    let output = run(
        tmp.path(),
        &["rfp", "update", &rfp_id, "--due", "2026-12-01", "--clear-due"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_outcomes_empty_messages() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());

    let output = run(tmp.path(), &["outcomes", "--range", "all"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No outcomes recorded."));
    assert!(!stdout.contains("last all"));

    let output = run(tmp.path(), &["outcomes", "--range", "90d"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No outcomes in the last 90d."));
}

#[test]
fn test_generate_then_scope_change_marks_stale() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let rfp_id = create_rfp(tmp.path(), "Homepage", "Redesign homepage");
    let approach = section_id(tmp.path(), &rfp_id, "approach");

    let section = run_json(
        tmp.path(),
        &["section", "generate", &approach, "--content", "Our approach"],
    );
    assert_eq!(section["status"], "drafted");
    assert_eq!(section["source_type"], "generated");
    assert!(section["generated_using"]["scopeSummaryHash"].is_string());

    let results = run_json(tmp.path(), &["stale", &rfp_id]);
    assert!(results
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["is_stale"] == false));

    run_json(
        tmp.path(),
        &[
            "rfp",
            "update",
            &rfp_id,
            "--scope",
            "Redesign homepage and checkout",
        ],
    );

    let results = run_json(tmp.path(), &["stale", &rfp_id]);
    let result = results
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["section_id"] == approach.as_str())
        .unwrap();
    assert_eq!(result["is_stale"], true);
    assert_eq!(result["stale_reason"], "Scope summary changed");
    assert_eq!(result["changed"], true);

    // the verdict was written back
    let output = run(tmp.path(), &["sections", &rfp_id]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Scope summary changed"));

    // regenerating clears it
    let section = run_json(
        tmp.path(),
        &["section", "generate", &approach, "--content", "Revised approach"],
    );
    assert_eq!(section["is_stale"], false);
    assert!(section["stale_reason"].is_null());
}

#[test]
fn test_stale_with_dependency_file() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let rfp_id = create_rfp(tmp.path(), "Homepage", "Redesign homepage");
    let team = section_id(tmp.path(), &rfp_id, "team");

    let bindings = run_json(
        tmp.path(),
        &[
            "bindings",
            "set",
            &rfp_id,
            "--team-member",
            "m1",
            "--team-member",
            "m2",
        ],
    );
    assert_eq!(bindings["team_member_ids"], serde_json::json!(["m1", "m2"]));

    run_json(tmp.path(), &["section", "generate", &team, "--content", "Our team"]);

    let deps = tmp.path().join("deps.json");
    std::fs::write(
        &deps,
        r#"{"team_members": {"m2": "2100-01-01T00:00:00Z", "m9": "2100-01-01T00:00:00Z"}}"#,
    )
    .unwrap();

    let results = run_json(
        tmp.path(),
        &["stale", &rfp_id, "--deps", deps.to_str().unwrap()],
    );
    let stale: Vec<&Value> = results
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["is_stale"] == true)
        .collect();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0]["section_key"], "team");
    assert_eq!(stale[0]["stale_reason"], "Team member updated");
}

#[test]
fn test_manual_edit_and_approve() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let rfp_id = create_rfp(tmp.path(), "Homepage", "Redesign homepage");
    let pricing = section_id(tmp.path(), &rfp_id, "pricing");

    // nothing to approve yet
    let output = run(tmp.path(), &["section", "approve", &pricing]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no working content"));

    let mut child = rfpdesk_cmd(tmp.path())
        .args(["section", "update", &pricing, "--stdin", "--json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Fixed fee of 40k")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let section: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(section["source_type"], "manual");
    assert_eq!(section["content_working"], "Fixed fee of 40k");

    let approved = run_json(tmp.path(), &["section", "approve", &pricing]);
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["content_approved"], "Fixed fee of 40k");
}

#[test]
fn test_outcome_workflow() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let won = create_rfp(tmp.path(), "Homepage", "Redesign homepage");
    create_rfp(tmp.path(), "Intranet", "Build intranet");

    // not decided yet
    let output = run(tmp.path(), &["rfp", "outcome", &won]);
    assert!(!output.status.success());

    run_json(tmp.path(), &["rfp", "update", &won, "--status", "won"]);
    let rfp = run_json(
        tmp.path(),
        &["rfp", "outcome", &won, "--pricing-total", "48000"],
    );
    assert_eq!(rfp["submission_snapshot"]["outcome"], "won");
    assert_eq!(rfp["submission_snapshot"]["pricing_total"], 48000.0);

    // snapshots are immutable
    let output = run(tmp.path(), &["rfp", "outcome", &won]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already recorded"));

    let outcomes = run_json(tmp.path(), &["outcomes", "--range", "90d"]);
    let outcomes = outcomes.as_array().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["id"], won.as_str());
    assert_eq!(outcomes[0]["status"], "won");

    let output = run(tmp.path(), &["outcomes", "--range", "30d"]);
    assert!(!output.status.success());
}

#[test]
fn test_delete_cascades() {
    let tmp = TempDir::new().unwrap();
    init(tmp.path());
    let rfp_id = create_rfp(tmp.path(), "Homepage", "Redesign homepage");

    // non-interactive delete needs --force
    let output = rfpdesk_cmd(tmp.path())
        .args(["rfp", "delete", &rfp_id])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(!output.status.success());

    let output = run(tmp.path(), &["rfp", "delete", &rfp_id, "--force"]);
    assert!(output.status.success());

    let output = run(tmp.path(), &["rfp", "get", &rfp_id]);
    assert!(!output.status.success());
    let output = run(tmp.path(), &["bindings", "show", &rfp_id]);
    assert!(!output.status.success());

    let rfps = run_json(tmp.path(), &["rfp", "list", "--company", "acme"]);
    assert!(rfps.as_array().unwrap().is_empty());
}
