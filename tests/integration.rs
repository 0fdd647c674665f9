use std::path::PathBuf;
use std::process::Command;

// ── helpers ──────────────────────────────────────────────────────────────────

fn reaper_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vba-reaper"))
}

struct TempProject {
    dir: tempfile::TempDir,
}

impl TempProject {
    fn new() -> Self {
        Self { dir: tempfile::TempDir::new().unwrap() }
    }

    fn file(&self, name: &str, content: &str) -> &Self {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        self
    }

    fn model(&self, json: &str) -> &Self {
        self.file("vba_model.json", json)
    }

    /// Runs the analyzer over this project's directory, writing the report
    /// to `report.json` inside it, and returns (stdout, stderr, exit_code).
    fn run(&self, extra: &[&str]) -> (String, String, i32) {
        let report_path = self.dir.path().join("report.json");
        let mut cmd = Command::new(reaper_bin());
        cmd.arg(self.dir.path());
        cmd.arg("--output").arg(&report_path);
        cmd.args(extra);
        let out = cmd.output().expect("failed to run vba-reaper");
        (
            String::from_utf8_lossy(&out.stdout).into_owned(),
            String::from_utf8_lossy(&out.stderr).into_owned(),
            out.status.code().unwrap_or(-1),
        )
    }

    fn report(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.dir.path().join("report.json")).unwrap();
        serde_json::from_str(&text).unwrap()
    }
}

fn issue_messages(report: &serde_json::Value) -> Vec<String> {
    report["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| format!("{}:{}: {}", i["file"], i["line"], i["message"]))
        .collect()
}

// ── concrete scenarios (spec §8) ─────────────────────────────────────────────

#[test]
fn scenario_1_undefined_identifier() {
    let proj = TempProject::new();
    proj.file("A.bas", "Sub S()\n  Dim x As Integer\n  y = 1\nEnd Sub\n");
    let (_, _, code) = proj.run(&[]);
    assert_eq!(code, 0);
    let report = proj.report();
    assert_eq!(report["summary"]["issues_found"], 1);
    let issues = report["issues"].as_array().unwrap();
    assert_eq!(issues[0]["line"], 3);
    assert_eq!(issues[0]["message"], "Undefined identifier 'y' in 'S'.");
}

#[test]
fn scenario_2_member_not_found() {
    let proj = TempProject::new();
    proj.model(r#"{"classes": {"Foo": {"members": {"Bar": {"type": "Integer"}}}}}"#);
    proj.file("M.bas", "Sub T()\n  Dim f As Foo\n  f.Bar = 1\n  f.Baz = 2\nEnd Sub\n");
    proj.run(&[]);
    let report = proj.report();
    assert_eq!(report["summary"]["issues_found"], 1);
    let issues = report["issues"].as_array().unwrap();
    assert_eq!(issues[0]["line"], 4);
    assert!(issues[0]["message"].as_str().unwrap().contains("Member 'Baz' not found in type 'Foo' inside 'T'"));
}

#[test]
fn scenario_3_with_block_suppresses_member_diagnostic() {
    let proj = TempProject::new();
    proj.model(
        r#"{"globals": {"ActiveDoc": {"type": "Document"}}, "classes": {"Document": {"members": {"Save": {"type": "Variant"}}}}}"#,
    );
    proj.file("U.bas", "Sub U()\n  With ActiveDoc\n    .Save\n  End With\n  .Save\nEnd Sub\n");
    proj.run(&[]);
    let report = proj.report();
    assert_eq!(report["summary"]["issues_found"], 1);
    let issues = report["issues"].as_array().unwrap();
    assert_eq!(issues[0]["line"], 5);
}

#[test]
fn scenario_4_unreachable_after_exit_sub() {
    let proj = TempProject::new();
    proj.file("P.bas", "Sub V()\n  Exit Sub\n  Dim x As Long\nEnd Sub\n");
    proj.run(&[]);
    let report = proj.report();
    assert_eq!(report["summary"]["issues_found"], 1);
    let issues = report["issues"].as_array().unwrap();
    assert_eq!(issues[0]["line"], 3);
    assert!(issues[0]["message"].as_str().unwrap().to_lowercase().contains("unreachable"));
}

#[test]
fn scenario_5_argument_count_too_few_and_too_many() {
    let too_few = TempProject::new();
    too_few.model(r#"{"globals": {"MsgBox": {"type": "Integer", "min_args": 1, "max_args": 3}}}"#);
    too_few.file("M1.bas", "Sub A()\n  MsgBox\nEnd Sub\n");
    too_few.run(&[]);
    let report = too_few.report();
    let messages = issue_messages(&report);
    assert!(messages.iter().any(|m| m.contains("at least 1")), "{messages:?}");

    let too_many = TempProject::new();
    too_many.model(r#"{"globals": {"MsgBox": {"type": "Integer", "min_args": 1, "max_args": 3}}}"#);
    too_many.file("M2.bas", "Sub B()\n  MsgBox \"a\", \"b\", \"c\", \"d\"\nEnd Sub\n");
    too_many.run(&[]);
    let report = too_many.report();
    let messages = issue_messages(&report);
    assert!(messages.iter().any(|m| m.contains("at most 3")), "{messages:?}");
}

#[test]
fn scenario_6_form_implicit_control_no_diagnostic() {
    let proj = TempProject::new();
    proj.file(
        "MyForm.frm",
        "VERSION 5.00\nBegin VB.Form MyForm \n   Caption = \"MyForm\"\nEnd\nAttribute VB_Name = \"MyForm\"\nSub W()\n  lblTitle.Caption = \"hi\"\nEnd Sub\n",
    );
    let (stdout, _, code) = proj.run(&[]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No issues found"));
    let report = proj.report();
    assert_eq!(report["summary"]["issues_found"], 0);
}

// ── CLI / report plumbing ────────────────────────────────────────────────────

#[test]
fn missing_input_directory_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");
    let out = Command::new(reaper_bin()).arg(&missing).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn bad_explicit_model_path_is_fatal() {
    let proj = TempProject::new();
    proj.file("A.bas", "Sub S()\nEnd Sub\n");
    let (_, stderr, code) = proj.run(&["--model", "/nonexistent/vba_model.json"]);
    assert_eq!(code, 1);
    assert!(!stderr.is_empty());
}

#[test]
fn define_flag_gates_conditional_compilation() {
    let proj = TempProject::new();
    proj.file("C.bas", "Sub S()\n#If DEBUG Then\n  y = 1\n#End If\nEnd Sub\n");

    // DEBUG undefined → branch is inactive → no diagnostic for `y`.
    proj.run(&[]);
    let report = proj.report();
    assert_eq!(report["summary"]["issues_found"], 0);

    // DEBUG defined truthy → branch is active → `y` is undefined.
    proj.run(&["--define", "DEBUG=True"]);
    let report = proj.report();
    assert_eq!(report["summary"]["issues_found"], 1);
}

#[test]
fn clean_run_exits_zero_with_empty_report() {
    let proj = TempProject::new();
    proj.file("Clean.bas", "Sub S()\n  Dim x As Long\n  x = 1\nEnd Sub\n");
    let (stdout, _, code) = proj.run(&[]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No issues found"));
    let report = proj.report();
    assert_eq!(report["summary"]["files_scanned"], 1);
    assert_eq!(report["summary"]["issues_found"], 0);
}

#[test]
fn cross_module_public_sub_resolves_without_diagnostic() {
    let proj = TempProject::new();
    proj.file("Utils.bas", "Public Sub Helper()\nEnd Sub\n");
    proj.file("Main.bas", "Sub Main()\n  Helper\nEnd Sub\n");
    proj.run(&[]);
    let report = proj.report();
    assert_eq!(report["summary"]["issues_found"], 0);
}

#[test]
fn qualified_cross_module_reference_resolves_without_diagnostic() {
    let proj = TempProject::new();
    proj.file("Utils.bas", "Public Sub Helper()\nEnd Sub\n");
    proj.file("Main.bas", "Sub Main()\n  Utils.Helper\nEnd Sub\n");
    proj.run(&[]);
    let report = proj.report();
    assert_eq!(report["summary"]["issues_found"], 0, "{:?}", issue_messages(&report));
}
