//! End-to-end apply/remove/status runs through the binary.

mod common;

use common::{stdout, Sandbox};
use indoc::indoc;

const INJECT_MANIFEST: &str = indoc! {r##"
    [{
        "id": "x",
        "file": "a.txt",
        "type": "inject",
        "anchor": "HOOK",
        "position": "after",
        "lines": ["BEGIN:x", "added line", "END:x"]
    }]
"##};

#[test]
fn inject_apply_then_remove_round_trips() {
    let sandbox = Sandbox::new();
    sandbox.write("a.txt", "start\nHOOK\nend\n");
    let manifest = sandbox.manifest(INJECT_MANIFEST);

    let apply = sandbox.run("apply", &manifest, &[]);
    assert!(apply.status.success(), "{}", common::stderr(&apply));
    assert_eq!(sandbox.read("a.txt"), "start\nHOOK\nBEGIN:x\nadded line\nEND:x\nend\n");
    assert!(stdout(&apply).contains("1 changed, 0 skipped"));

    let remove = sandbox.run("remove", &manifest, &[]);
    assert!(remove.status.success());
    assert_eq!(sandbox.read("a.txt"), "start\nHOOK\nend\n");
}

#[test]
fn second_apply_is_a_skip() {
    let sandbox = Sandbox::new();
    sandbox.write("a.txt", "start\nHOOK\nend\n");
    let manifest = sandbox.manifest(INJECT_MANIFEST);

    assert!(sandbox.run("apply", &manifest, &[]).status.success());
    let after_first = sandbox.read("a.txt");

    let second = sandbox.run("apply", &manifest, &[]);
    assert!(second.status.success());
    assert_eq!(sandbox.read("a.txt"), after_first);
    assert!(stdout(&second).contains("0 changed, 1 skipped"));
}

#[test]
fn remove_of_unapplied_intervention_succeeds() {
    let sandbox = Sandbox::new();
    sandbox.write("a.txt", "start\nHOOK\nend\n");
    let manifest = sandbox.manifest(INJECT_MANIFEST);

    let remove = sandbox.run("remove", &manifest, &[]);
    assert!(remove.status.success());
    assert_eq!(sandbox.read("a.txt"), "start\nHOOK\nend\n");
    assert!(stdout(&remove).contains("0 changed, 1 skipped"));
}

#[test]
fn comment_line_toggle_applies_idempotently() {
    let sandbox = Sandbox::new();
    sandbox.write(".env", "PORT=80\nDEBUG=true\n");
    let manifest = sandbox.manifest(indoc! {r##"
        [{
            "id": "debug",
            "file": ".env",
            "type": "comment",
            "comment_prefix": "# ",
            "max_matches": 1,
            "identifier": "DEBUG=true"
        }]
    "##});

    assert!(sandbox.run("apply", &manifest, &[]).status.success());
    assert_eq!(sandbox.read(".env"), "PORT=80\n# DEBUG=true\n");

    // Second apply: prefix already present, nothing changes.
    assert!(sandbox.run("apply", &manifest, &[]).status.success());
    assert_eq!(sandbox.read(".env"), "PORT=80\n# DEBUG=true\n");

    assert!(sandbox.run("remove", &manifest, &[]).status.success());
    assert_eq!(sandbox.read(".env"), "PORT=80\nDEBUG=true\n");
}

#[test]
fn wrapped_manifest_document_is_accepted() {
    let sandbox = Sandbox::new();
    sandbox.write("a.txt", "start\nHOOK\nend\n");
    let manifest = sandbox.manifest(&format!(r#"{{ "interventions": {INJECT_MANIFEST} }}"#));

    assert!(sandbox.run("apply", &manifest, &[]).status.success());
    assert_eq!(sandbox.read("a.txt"), "start\nHOOK\nBEGIN:x\nadded line\nEND:x\nend\n");
}

#[test]
fn status_json_tracks_apply_state() {
    let sandbox = Sandbox::new();
    sandbox.write("a.txt", "start\nHOOK\nend\n");
    let manifest = sandbox.manifest(INJECT_MANIFEST);

    let before = sandbox.run("status", &manifest, &["--json"]);
    assert!(before.status.success());
    let summary: serde_json::Value = serde_json::from_str(&stdout(&before)).unwrap();
    assert_eq!(summary["interventions"][0]["state"], "not_applied");

    assert!(sandbox.run("apply", &manifest, &[]).status.success());

    let after = sandbox.run("status", &manifest, &["--json"]);
    let summary: serde_json::Value = serde_json::from_str(&stdout(&after)).unwrap();
    assert_eq!(summary["interventions"][0]["state"], "applied");
    assert_eq!(summary["counts"]["applied"], 1);
    assert_eq!(summary["files"]["a.txt"]["applied"], 1);
}

#[test]
fn status_reports_missing_target_without_failing() {
    let sandbox = Sandbox::new();
    let manifest = sandbox.manifest(INJECT_MANIFEST);

    let output = sandbox.run("status", &manifest, &["--json"]);
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["interventions"][0]["state"], "missing");
}

#[test]
fn default_manifest_is_discovered_under_the_root() {
    let sandbox = Sandbox::new();
    sandbox.write("a.txt", "start\nHOOK\nend\n");
    sandbox.write("interventions.json", INJECT_MANIFEST);

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_dotpatch"))
        .arg("apply")
        .arg("--root")
        .arg(sandbox.root())
        .output()
        .expect("run dotpatch");
    assert!(output.status.success(), "{}", common::stderr(&output));
    assert_eq!(sandbox.read("a.txt"), "start\nHOOK\nBEGIN:x\nadded line\nEND:x\nend\n");
}
