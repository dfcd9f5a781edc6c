//! CLI integration tests. All runs are offline with an isolated HOME.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const LETTER: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<?xml-model href="https://example.org/tei.rng" type="application/xml"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <text>
    <body><p><persName ref="#pmb2121">Arthur</persName> trifft <persName ref="#pmb12345">Hugo</persName>.</p></body>
  </text>
</TEI>
"##;

const LISTPERSON: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body><listPerson>
  <person xml:id="pmb12345"><persName><surname>Hofmannsthal</surname></persName></person>
</listPerson></body></text></TEI>"#;

struct Workspace {
    root: TempDir,
    home: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            root: tempfile::tempdir().unwrap(),
            home: tempfile::tempdir().unwrap(),
        };
        fs::create_dir_all(ws.path().join("lists")).unwrap();
        fs::create_dir_all(ws.path().join("editions")).unwrap();
        fs::write(ws.path().join("lists/listperson.xml"), LISTPERSON).unwrap();
        ws
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path().join(relative)).unwrap()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_backmatter"));
        cmd.current_dir(self.path())
            .env("HOME", self.home.path())
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_help_lists_subcommands() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("enrich"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["-q", "-v", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_enrich_single_file_to_output() {
    let ws = Workspace::new();
    ws.write("editions/L00001.xml", LETTER);

    ws.cmd()
        .args([
            "enrich",
            "editions/L00001.xml",
            "out.xml",
            "--offline",
            "--lists-dir",
            "lists",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("=== PMB Processing Statistics ==="));

    let out = ws.read("out.xml");
    assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<?xml-model"));
    assert!(out.contains("<surname>Schnitzler</surname>"));
    assert!(out.contains("<surname>Hofmannsthal</surname>"));
    assert_eq!(ws.read("editions/L00001.xml"), LETTER);
}

#[test]
fn test_enrich_missing_input_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["enrich", "editions/missing.xml", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_batch_reports_failures_and_exits_nonzero() {
    let ws = Workspace::new();
    ws.write("editions/L00001.xml", LETTER);
    ws.write("editions/L00002.xml", "<TEI><text>");

    ws.cmd()
        .args(["batch", "--offline", "--lists-dir", "lists", "-j", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("L00002.xml"))
        .stderr(predicate::str::contains("Batch Enrichment Summary"));

    assert!(ws.read("editions/L00001.xml").contains("<listPerson>"));
    assert_eq!(ws.read("editions/L00002.xml"), "<TEI><text>");
}

#[test]
fn test_batch_json_summary() {
    let ws = Workspace::new();
    ws.write("letters/L00001.xml", LETTER);
    ws.write("letters/L00002.xml", LETTER);
    ws.write("letters/notes.xml", "<TEI><text>");

    let output = ws
        .cmd()
        .args([
            "batch",
            "--dir",
            "letters",
            "--offline",
            "--lists-dir",
            "lists",
            "--json",
            "-j",
            "1",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["succeeded"], 2);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["resolver"]["local_hits"], 1);
    assert_eq!(summary["resolver"]["cache_hits"], 1);
}

#[test]
fn test_batch_limit_processes_first_files() {
    let ws = Workspace::new();
    ws.write("editions/L00001.xml", LETTER);
    ws.write("editions/L00002.xml", LETTER);

    ws.cmd()
        .args(["-q", "batch", "--offline", "--lists-dir", "lists", "-l", "1"])
        .assert()
        .success();

    assert!(ws.read("editions/L00001.xml").contains("<back>"));
    assert_eq!(ws.read("editions/L00002.xml"), LETTER);
}

#[test]
fn test_validate_writes_report_of_problem_files() {
    let ws = Workspace::new();
    ws.write(
        "editions/2024/L00001.xml",
        "<TEI><text><back><listPerson><person><birth/></person></listPerson></back></text></TEI>",
    );
    ws.write(
        "editions/L00002.xml",
        "<TEI><text><back><listPlace><place><idno type=\"geonames\">1</idno></place></listPlace></back></text></TEI>",
    );

    ws.cmd()
        .args(["validate", "--report", "report.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("L00001.xml"));

    let report = ws.read("report.txt");
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(Path::new(lines[0]), Path::new("2024").join("L00001.xml"));
}

#[test]
fn test_validate_clean_directory_succeeds() {
    let ws = Workspace::new();
    ws.write(
        "editions/L00001.xml",
        "<TEI><text><back><listPerson><person><birth><date when=\"1862\"/></birth></person></listPerson></back></text></TEI>",
    );
    ws.cmd().args(["validate"]).assert().success();
}

#[test]
fn test_config_show_merges_project_file() {
    let ws = Workspace::new();
    ws.write(".backmatter.toml", "[batch]\nparallel = 8\n");
    ws.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("parallel = 8"))
        .stdout(predicate::str::contains("pattern = \"L*.xml\""))
        .stdout(predicate::str::contains("lists_dir = \"python-temp\""));
}

#[test]
fn test_config_show_with_explicit_file() {
    let ws = Workspace::new();
    ws.write("custom.toml", "[resolver]\noffline = true\n");
    ws.cmd()
        .args(["--config", "custom.toml", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("offline = true"));
}

#[test]
fn test_config_path_lists_locations() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".backmatter.toml"))
        .stdout(predicate::str::contains("not found"));
}
