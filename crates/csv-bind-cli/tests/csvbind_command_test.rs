use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const STUDENT_SCHEMA: &str = r#"record:
  name: Student
  fields:
    - ident: name
      column: name
      required: true
    - ident: age
      column: age
config:
  separator: ","
"#;

fn cargo_bin() -> PathBuf {
    if let Ok(path) = env::var("CARGO_BIN_EXE_csvbind") {
        return PathBuf::from(path);
    }

    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| repo_root().join("target"));
    let executable_name = format!("csvbind{}", std::env::consts::EXE_SUFFIX);
    let fallback = target_dir.join("debug").join(executable_name);

    if fallback.exists() {
        return fallback;
    }

    panic!(
        "CARGO_BIN_EXE_csvbind is not set and fallback binary was not found at {}",
        fallback.display()
    );
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temporary directory should be created"),
        }
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("temporary file should be created");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn run_csvbind(schema: &Path, args: &[&str]) -> Output {
    Command::new(cargo_bin())
        .arg("--schema")
        .arg(schema)
        .args(args)
        .output()
        .expect("csvbind should execute")
}

fn assert_exit_code(output: &Output, expected: i32) {
    let actual = output.status.code().unwrap_or(-1);
    assert_eq!(
        actual,
        expected,
        "unexpected exit code; stdout: {}; stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn header_prints_generated_header() {
    let ws = Workspace::new();
    let schema = ws.file("student.yaml", STUDENT_SCHEMA);

    let output = run_csvbind(&schema, &["header"]);

    assert_exit_code(&output, 0);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "name,age");
}

#[test]
fn header_accepts_json_schema_and_position_mode() {
    let ws = Workspace::new();
    let schema = ws.file(
        "product.json",
        r#"{"record": {"name": "Product", "fields": [
            {"ident": "sku", "position": 0},
            {"ident": "title", "position": 2}
        ]}}"#,
    );

    let output = run_csvbind(&schema, &["--mode", "position", "header"]);

    assert_exit_code(&output, 0);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "sku,,title");
}

#[test]
fn validate_reports_record_count() {
    let ws = Workspace::new();
    let schema = ws.file("student.yaml", STUDENT_SCHEMA);
    let input = ws.file("students.csv", "name,age\nJohn,30\nAlice,25\n");

    let output = run_csvbind(&schema, &["validate", input.to_string_lossy().as_ref()]);

    assert_exit_code(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Records: 2"));
    assert!(stdout.contains("Validation passed."));
}

#[test]
fn validate_fails_on_header_mismatch() {
    let ws = Workspace::new();
    let schema = ws.file("student.yaml", STUDENT_SCHEMA);
    let input = ws.file("students.csv", "age,name\n30,John\n");

    let output = run_csvbind(&schema, &["validate", input.to_string_lossy().as_ref()]);

    assert_exit_code(&output, 2);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CSV headers do not match"));
}

#[test]
fn validate_lists_skipped_rows_when_not_throwing() {
    let ws = Workspace::new();
    let schema = ws.file(
        "student.yaml",
        &format!("{STUDENT_SCHEMA}  throws_exceptions: false\n"),
    );
    let input = ws.file("students.csv", "name,age\nJohn,30\n,25\nAlice,22\n");

    let output = run_csvbind(&schema, &["validate", input.to_string_lossy().as_ref()]);

    assert_exit_code(&output, 1);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Records: 2"));
    assert!(stdout.contains("Skipped: 1"));
    assert!(stdout.contains("Required field 'name' is empty at row 2"));
}

#[test]
fn convert_rewrites_with_output_overrides() {
    let ws = Workspace::new();
    let schema = ws.file("student.yaml", STUDENT_SCHEMA);
    let input = ws.file("students.csv", "name,age\nJohn,30\nAlice,\n");
    let output_path = ws.path("students-out.csv");

    let output = run_csvbind(
        &schema,
        &[
            "convert",
            input.to_string_lossy().as_ref(),
            output_path.to_string_lossy().as_ref(),
            "--separator",
            ";",
            "--quote",
            "'",
            "--line-end",
            "crlf",
        ],
    );

    assert_exit_code(&output, 0);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Converted 2 records"));
    assert_eq!(
        fs::read_to_string(&output_path).unwrap(),
        "'name';'age'\r\n'John';'30'\r\n'Alice';''\r\n"
    );
}

#[test]
fn missing_schema_file_is_an_error() {
    let ws = Workspace::new();
    let missing = ws.path("does-not-exist.yaml");

    let output = run_csvbind(&missing, &["header"]);

    assert_exit_code(&output, 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load schema"));
}
