#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn pw(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pw").unwrap();
    cmd.current_dir(dir.path()).env("PLANWRIGHT_ROOT", dir.path());
    cmd
}

fn json_of(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout should be one JSON object")
}

fn init_project(dir: &TempDir) {
    pw(dir).args(["init", "--name", "demo"]).assert().success();
}

fn read(dir: &TempDir, rel: &str) -> String {
    std::fs::read_to_string(dir.path().join(rel)).unwrap()
}

fn write(dir: &TempDir, rel: &str, content: &str) {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn phase_dirs(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path().join(".planning/phases"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn exists(dir: &TempDir, rel: &str) -> bool {
    Path::new(&dir.path().join(rel)).exists()
}

// ---------------------------------------------------------------------------
// pw init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_planning_tree() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();

    let report = json_of(pw(&dir).args(["init", "--name", "demo"]));
    assert_eq!(report["config_written"], true);

    assert!(exists(&dir, ".planning/phases"));
    assert!(exists(&dir, ".planning/backlog"));
    assert!(read(&dir, ".planning/ROADMAP.md").starts_with("# Roadmap: demo"));
    assert!(read(&dir, ".planning/STATE.md").contains("**Total Phases:** 0"));

    let cfg: Value = serde_json::from_str(&read(&dir, ".planning/config.json")).unwrap();
    assert_eq!(cfg["release"]["version_file"], "Cargo.toml");
    assert_eq!(cfg["health_check"]["frequency"], "per_milestone");
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let again = json_of(pw(&dir).arg("init"));
    assert_eq!(again["config_written"], false);
    assert_eq!(again["created"].as_array().unwrap().len(), 0);
}

// ---------------------------------------------------------------------------
// pw phase
// ---------------------------------------------------------------------------

#[test]
fn phase_add_appends_and_updates_documents() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let first = json_of(pw(&dir).args(["phase", "add", "Foundation"]));
    assert_eq!(first["phase_number"], "1");
    assert_eq!(first["directory"], "01-foundation");
    assert_eq!(first["depends_on"], Value::Null);

    let second = json_of(pw(&dir).args(["phase", "add", "API Layer"]));
    assert_eq!(second["padded"], "02");
    assert_eq!(second["depends_on"], "1");

    assert_eq!(phase_dirs(&dir), vec!["01-foundation", "02-api-layer"]);
    let roadmap = read(&dir, ".planning/ROADMAP.md");
    assert!(roadmap.contains("- [ ] **Phase 2: API Layer**"));
    assert!(roadmap.contains("### Phase 2: API Layer"));
    assert!(roadmap.contains("**Depends on:** Phase 1"));
    assert!(read(&dir, ".planning/STATE.md").contains("**Total Phases:** 2"));
}

#[test]
fn phase_add_without_roadmap_fails() {
    let dir = TempDir::new().unwrap();
    pw(&dir)
        .args(["phase", "add", "Orphan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn phase_insert_creates_decimal_after_anchor() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["phase", "add", "Foundation"]).assert().success();
    pw(&dir).args(["phase", "add", "API"]).assert().success();

    let inserted = json_of(pw(&dir).args(["phase", "insert", "1", "Hotfix"]));
    assert_eq!(inserted["padded"], "01.1");
    assert_eq!(inserted["after_phase"], "1");

    let next = json_of(pw(&dir).args(["phase", "next-decimal", "1"]));
    assert_eq!(next["next"], "01.2");

    let roadmap = read(&dir, ".planning/ROADMAP.md");
    let hotfix = roadmap.find("### Phase 1.1: Hotfix (INSERTED)").unwrap();
    let api = roadmap.find("### Phase 2: API").unwrap();
    assert!(hotfix < api);
}

#[test]
fn phase_insert_after_missing_phase_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir)
        .args(["phase", "insert", "7", "Nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("phase not found"));
}

#[test]
fn phase_remove_renumbers_later_phases() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    for title in ["Foundation", "Auth", "Billing"] {
        pw(&dir).args(["phase", "add", title]).assert().success();
    }
    write(&dir, ".planning/phases/03-billing/03-01-PLAN.md", "---\nphase: 03\n---\n");

    let dry = json_of(pw(&dir).args(["phase", "remove", "2", "--dry-run"]));
    assert_eq!(dry["dry_run"], true);
    assert_eq!(dry["renamed_directories"], 1);
    assert_eq!(phase_dirs(&dir).len(), 3);

    let removed = json_of(pw(&dir).args(["phase", "remove", "2"]));
    assert_eq!(removed["removed"], "02");
    assert_eq!(removed["renamed_files"], 1);
    assert_eq!(phase_dirs(&dir), vec!["01-foundation", "02-billing"]);
    assert!(exists(&dir, ".planning/phases/02-billing/02-01-PLAN.md"));

    let roadmap = read(&dir, ".planning/ROADMAP.md");
    assert!(roadmap.contains("### Phase 2: Billing"));
    assert!(!roadmap.contains("Auth"));
    assert!(read(&dir, ".planning/STATE.md").contains("**Total Phases:** 2"));
}

#[test]
fn phase_remove_with_summaries_requires_force() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["phase", "add", "Foundation"]).assert().success();
    write(&dir, ".planning/phases/01-foundation/01-01-PLAN.md", "# plan\n");
    write(&dir, ".planning/phases/01-foundation/01-01-SUMMARY.md", "# done\n");

    pw(&dir)
        .args(["phase", "remove", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert!(exists(&dir, ".planning/phases/01-foundation"));

    let forced = json_of(pw(&dir).args(["phase", "remove", "1", "--force"]));
    assert_eq!(forced["forced"], true);
    assert!(!exists(&dir, ".planning/phases/01-foundation"));
}

#[test]
fn phase_complete_advances_state() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["phase", "add", "Foundation"]).assert().success();
    pw(&dir).args(["phase", "add", "API"]).assert().success();
    write(&dir, ".planning/phases/01-foundation/01-01-PLAN.md", "# plan\n");
    write(&dir, ".planning/phases/01-foundation/01-01-SUMMARY.md", "# done\n");

    let done = json_of(pw(&dir).args(["phase", "complete", "1", "--date", "2026-10-18"]));
    assert_eq!(done["plans_executed"], "1/1");
    assert_eq!(done["all_plans_executed"], true);
    assert_eq!(done["next_phase"], "02");
    assert_eq!(done["is_last_phase"], false);

    let roadmap = read(&dir, ".planning/ROADMAP.md");
    assert!(roadmap.contains("- [x] **Phase 1: Foundation**"));
    let state = read(&dir, ".planning/STATE.md");
    assert!(state.contains("**Current Phase:** 02"));
    assert!(state.contains("**Last Activity:** 2026-10-18"));

    let last = json_of(pw(&dir).args(["phase", "complete", "2", "--date", "2026-10-19"]));
    assert_eq!(last["is_last_phase"], true);
    assert_eq!(last["all_plans_executed"], false);
}

#[test]
fn phase_list_and_status() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["phase", "add", "Foundation"]).assert().success();
    write(&dir, ".planning/phases/01-foundation/01-01-PLAN.md", "# plan\n");

    let list = json_of(pw(&dir).args(["phase", "list"]));
    assert_eq!(list["count"], 1);
    assert_eq!(list["phases"][0]["plan_count"], 1);

    let status = json_of(pw(&dir).args(["phase", "status", "1"]));
    assert_eq!(status["found"], true);
    assert_eq!(status["plans_missing_summary"][0], "01-01-PLAN.md");

    let missing = json_of(pw(&dir).args(["phase", "status", "9"]));
    assert_eq!(missing["found"], false);
}

#[test]
fn phase_id_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir)
        .args(["phase", "status", "two"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// pw roadmap
// ---------------------------------------------------------------------------

#[test]
fn roadmap_get_phase_found_and_missing() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["phase", "add", "Foundation"]).assert().success();

    let found = json_of(pw(&dir).args(["roadmap", "get-phase", "1"]));
    assert_eq!(found["found"], true);
    assert_eq!(found["phase_name"], "Foundation");
    assert_eq!(found["goal"], "[To be planned]");

    let missing = json_of(pw(&dir).args(["roadmap", "get-phase", "4"]));
    assert_eq!(missing["found"], false);
    assert!(missing["error"].as_str().unwrap().contains("4"));
}

#[test]
fn roadmap_get_phase_without_roadmap_is_not_found() {
    let dir = TempDir::new().unwrap();
    let out = json_of(pw(&dir).args(["roadmap", "get-phase", "1"]));
    assert_eq!(out["found"], false);
}

#[test]
fn roadmap_analyze_reports_progress() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["phase", "add", "Foundation"]).assert().success();
    pw(&dir).args(["phase", "add", "API"]).assert().success();
    write(&dir, ".planning/phases/01-foundation/01-01-PLAN.md", "# plan\n");
    write(&dir, ".planning/phases/01-foundation/01-01-SUMMARY.md", "# done\n");

    let analysis = json_of(pw(&dir).args(["roadmap", "analyze"]));
    assert_eq!(analysis["phase_count"], 2);
    assert_eq!(analysis["completed_phases"], 1);
    assert_eq!(analysis["progress_percent"], 50);
    assert_eq!(analysis["phases"][1]["disk_status"], "planned");
}

// ---------------------------------------------------------------------------
// pw manifest
// ---------------------------------------------------------------------------

#[test]
fn manifest_validate_fresh_config_is_valid() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let report = json_of(pw(&dir).args(["manifest", "validate"]));
    assert_eq!(report["valid"], true);
    assert_eq!(report["features_missing"], 0);
}

#[test]
fn manifest_validate_flags_enum_mismatch() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir)
        .args(["config", "set", "health_check.frequency", "hourly"])
        .assert()
        .success();
    let report = json_of(pw(&dir).args(["manifest", "validate"]));
    assert_eq!(report["valid"], false);
    assert_eq!(report["errors"][0]["kind"], "enum_mismatch");
}

#[test]
fn manifest_apply_migration_coerces_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        ".planning/config.json",
        r#"{"health_check": {"max_warnings": "5"}}"#,
    );

    let first = json_of(pw(&dir).args(["manifest", "apply-migration", "--log"]));
    assert_eq!(first["written"], true);
    assert_eq!(first["logged"], true);
    let kinds: Vec<&str> = first["changes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"type_coerced"));
    assert!(kinds.contains(&"feature_added"));

    let cfg: Value = serde_json::from_str(&read(&dir, ".planning/config.json")).unwrap();
    assert_eq!(cfg["health_check"]["max_warnings"], 5);
    assert!(read(&dir, ".planning/migration-log.md").contains("manifest v0 -> v2"));

    let second = json_of(pw(&dir).args(["manifest", "apply-migration"]));
    assert_eq!(second["change_count"], 0);
    assert_eq!(second["written"], false);
}

#[test]
fn manifest_apply_migration_dry_run_leaves_config_alone() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".planning/config.json", "{}\n");
    let out = json_of(pw(&dir).args(["manifest", "apply-migration", "--dry-run", "--log"]));
    assert!(out["change_count"].as_u64().unwrap() > 0);
    assert_eq!(out["logged"], false);
    assert_eq!(read(&dir, ".planning/config.json"), "{}\n");
    assert!(!exists(&dir, ".planning/migration-log.md"));
}

#[test]
fn manifest_log_migration_records_given_changes_only() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".planning/config.json", "{}\n");
    pw(&dir)
        .args(["manifest", "log-migration"])
        .assert()
        .failure();
    assert!(!exists(&dir, ".planning/migration-log.md"));

    let changes = r#"[{"type": "manifest_version_updated", "from": 1, "to": 2}]"#;
    let out = json_of(pw(&dir).args([
        "manifest",
        "log-migration",
        "--changes",
        changes,
        "--from",
        "1",
    ]));
    assert_eq!(out["change_count"], 1);
    let log = read(&dir, ".planning/migration-log.md");
    assert!(log.contains("manifest v1 -> v2"));
    assert!(log.contains("Updated `manifest_version`: 1 -> 2"));
}

#[test]
fn manifest_auto_detect_and_unknown_feature() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".github/workflows")).unwrap();
    let out = json_of(pw(&dir).args(["manifest", "auto-detect", "ci"]));
    assert_eq!(out["detected"]["provider"], "github_actions");

    pw(&dir)
        .args(["manifest", "auto-detect", "telemetry"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// pw validate
// ---------------------------------------------------------------------------

#[test]
fn validate_consistency_reports_drift_as_warnings() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["phase", "add", "Foundation"]).assert().success();
    std::fs::create_dir_all(dir.path().join(".planning/phases/03-stray")).unwrap();

    let report = json_of(pw(&dir).args(["validate", "consistency"]));
    assert_eq!(report["passed"], true);
    assert!(report["warning_count"].as_u64().unwrap() >= 1);
}

#[test]
fn validate_consistency_without_roadmap_fails_check() {
    let dir = TempDir::new().unwrap();
    let report = json_of(pw(&dir).args(["validate", "consistency"]));
    assert_eq!(report["passed"], false);
    assert_eq!(report["errors"][0], "ROADMAP.md not found");
}

// ---------------------------------------------------------------------------
// pw backlog
// ---------------------------------------------------------------------------

#[test]
fn backlog_add_list_and_index() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let first = json_of(pw(&dir).args([
        "backlog",
        "add",
        "Dark mode",
        "--priority",
        "high",
        "--tags",
        "ui,theme",
    ]));
    assert_eq!(first["id"], "B001");
    assert_eq!(first["status"], "open");
    assert_eq!(first["tags"][1], "theme");

    pw(&dir).args(["backlog", "add", "Export CSV"]).assert().success();

    let high = json_of(pw(&dir).args(["backlog", "list", "--priority", "high"]));
    assert_eq!(high["count"], 1);

    let index = json_of(pw(&dir).args(["backlog", "index"]));
    assert_eq!(index["item_count"], 2);
    let rendered = read(&dir, ".planning/backlog/INDEX.md");
    assert!(rendered.contains("Dark mode"));
    assert!(rendered.contains("Export CSV"));
}

#[test]
fn backlog_update_and_group() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["backlog", "add", "Dark mode"]).assert().success();
    pw(&dir).args(["backlog", "add", "Themes"]).assert().success();

    let updated = json_of(pw(&dir).args(["backlog", "update", "B001", "--status", "triaged"]));
    assert_eq!(updated["status"], "triaged");

    let grouped = json_of(pw(&dir).args(["backlog", "group", "appearance", "B001", "B002"]));
    assert_eq!(grouped["count"], 2);

    pw(&dir)
        .args(["backlog", "group", "appearance", "B001", "B404"])
        .assert()
        .failure();

    let stats = json_of(pw(&dir).args(["backlog", "stats"]));
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["by_group"]["appearance"], 2);
}

#[test]
fn backlog_promote_creates_phase() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["phase", "add", "Foundation"]).assert().success();
    pw(&dir).args(["backlog", "add", "Dark mode"]).assert().success();

    let promoted = json_of(pw(&dir).args(["backlog", "promote", "B001"]));
    assert_eq!(promoted["created_phase"], true);
    assert_eq!(promoted["phase"], "02");
    assert_eq!(promoted["item"]["status"], "promoted");
    assert!(exists(&dir, ".planning/phases/02-dark-mode"));

    pw(&dir)
        .args(["backlog", "promote", "B001"])
        .assert()
        .failure();
}

#[test]
fn backlog_rejects_unknown_status() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir)
        .args(["backlog", "list", "--status", "someday"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// pw config
// ---------------------------------------------------------------------------

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let set = json_of(pw(&dir).args(["config", "set", "workflow.research", "false"]));
    assert_eq!(set["value"], false);
    assert_eq!(set["previous"], Value::Null);

    let got = json_of(pw(&dir).args(["config", "get", "workflow.research"]));
    assert_eq!(got["found"], true);
    assert_eq!(got["value"], false);

    let missing = json_of(pw(&dir).args(["config", "get", "workflow.nope"]));
    assert_eq!(missing["found"], false);
}

#[test]
fn config_get_before_init_fails() {
    let dir = TempDir::new().unwrap();
    pw(&dir)
        .args(["config", "get", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// ---------------------------------------------------------------------------
// pw frontmatter
// ---------------------------------------------------------------------------

#[test]
fn frontmatter_set_preserves_body() {
    let dir = TempDir::new().unwrap();
    let rel = ".planning/phases/01-foundation/01-01-PLAN.md";
    write(&dir, rel, "---\nphase: 01\nwave: 1\n---\n\n# Plan\n\nBody text.\n");

    pw(&dir)
        .args(["frontmatter", "set", rel, "--field", "wave", "--value", "2"])
        .assert()
        .success();

    let content = read(&dir, rel);
    assert!(content.contains("wave: 2"));
    assert!(content.contains("phase: 01"));
    assert!(content.ends_with("\n# Plan\n\nBody text.\n"));

    let field = json_of(pw(&dir).args(["frontmatter", "get", rel, "--field", "wave"]));
    assert_eq!(field["found"], true);
    assert_eq!(field["value"], 2);
}

#[test]
fn frontmatter_get_missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let out = json_of(pw(&dir).args(["frontmatter", "get", "nope.md"]));
    assert_eq!(out["found"], false);
}

#[test]
fn frontmatter_merge_requires_object() {
    let dir = TempDir::new().unwrap();
    write(&dir, "doc.md", "---\na: 1\n---\nbody\n");
    pw(&dir)
        .args(["frontmatter", "merge", "doc.md", "--data", "[1, 2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));

    let merged = json_of(pw(&dir).args([
        "frontmatter",
        "merge",
        "doc.md",
        "--data",
        r#"{"status": "complete", "a": 3}"#,
    ]));
    assert_eq!(merged["frontmatter"]["status"], "complete");
    assert_eq!(merged["frontmatter"]["a"], 3);
}

// ---------------------------------------------------------------------------
// pw summary
// ---------------------------------------------------------------------------

#[test]
fn summary_digest_collects_provides_and_tags() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    pw(&dir).args(["phase", "add", "Foundation"]).assert().success();
    write(
        &dir,
        ".planning/phases/01-foundation/01-01-SUMMARY.md",
        "---\nprovides:\n  - user model\ntags: [db, auth]\n---\n\n# Summary\n",
    );

    let digest = json_of(pw(&dir).args(["summary", "digest"]));
    assert_eq!(digest["summary_count"], 1);
    assert_eq!(digest["phases"][0]["provides"][0], "user model");
    assert!(digest["tags"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t == "auth"));
}
