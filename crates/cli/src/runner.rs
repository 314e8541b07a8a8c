//! Conformance suite runner.
//!
//! Convention:
//!   roundtrip/  -- *.odb, optionally *.expected.odb (clean read, byte-exact rewrite)
//!   negative/   -- *.odb + *.expected.json (error/warning counts, abort flag, messages)

use crate::tap::Tap;
use odb_core::{read_database, write_database, LineEnding, ReadOptions};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};

pub struct RunResult {
    pub failed: usize,
}

pub fn run_suite(suite_dir: &Path) -> RunResult {
    let mut tap = Tap::new();

    run_roundtrip_tests(suite_dir, &mut tap);
    run_negative_tests(suite_dir, &mut tap);

    let failed = tap.failure_count();
    if let Err(e) = tap.write_to(&mut io::stdout().lock()) {
        tracing::error!(error = %e, "cannot write TAP stream");
    }

    RunResult { failed }
}

fn run_roundtrip_tests(suite_dir: &Path, tap: &mut Tap) {
    let dir = suite_dir.join("roundtrip");
    if !dir.exists() {
        return;
    }
    for input in glob_odb_files(&dir) {
        let stem = stem(&input);
        let expected_path = dir.join(format!("{}.expected.odb", stem));
        let expected_path = if expected_path.exists() {
            expected_path
        } else {
            input.clone()
        };
        run_roundtrip_test(&input, &expected_path, &stem, tap);
    }
}

fn run_roundtrip_test(input: &Path, expected_path: &Path, name: &str, tap: &mut Tap) {
    let source = match read_text(input) {
        Ok(s) => s,
        Err(e) => {
            tap.not_ok(format!("roundtrip/{}", name), e);
            return;
        }
    };
    let expected = match read_text(expected_path) {
        Ok(s) => s,
        Err(e) => {
            tap.not_ok(format!("roundtrip/{}", name), e);
            return;
        }
    };
    let report = match read_database(&source, &ReadOptions::default()) {
        Ok(r) => r,
        Err(e) => {
            tap.not_ok(format!("roundtrip/{}", name), e.to_string());
            return;
        }
    };
    if !report.is_clean() {
        let diags: Vec<String> = report.diagnostics.iter().map(|d| d.to_string()).collect();
        tap.not_ok(
            format!("roundtrip/{}", name),
            format!("read was not clean:\n{}", diags.join("\n")),
        );
        return;
    }

    for (ending, label) in [(LineEnding::Lf, "lf"), (LineEnding::Cr, "cr")] {
        let test_name = format!("roundtrip/{} ({})", name, label);
        let actual = write_database(&report.database, ending);
        let want = ending.convert(&expected);
        if actual == want {
            tap.ok(&test_name);
        } else {
            tap.not_ok(&test_name, text_diff(&want, &actual));
        }
    }
}

fn run_negative_tests(suite_dir: &Path, tap: &mut Tap) {
    let dir = suite_dir.join("negative");
    if !dir.exists() {
        return;
    }
    for input in glob_odb_files(&dir) {
        let stem = stem(&input);
        let expected_path = dir.join(format!("{}.expected.json", stem));
        if !expected_path.exists() {
            tap.not_ok(
                format!("negative/{}", stem),
                format!("missing expected file: {}", expected_path.display()),
            );
            continue;
        }
        run_negative_test(&input, &expected_path, &stem, tap);
    }
}

fn run_negative_test(input: &Path, expected_path: &Path, name: &str, tap: &mut Tap) {
    let test_name = format!("negative/{}", name);

    let expected = match read_json(expected_path) {
        Ok(v) => v,
        Err(e) => {
            tap.not_ok(&test_name, format!("failed to read expected file: {}", e));
            return;
        }
    };
    let options: ReadOptions = match expected.get("options") {
        Some(o) => match serde_json::from_value(o.clone()) {
            Ok(opts) => opts,
            Err(e) => {
                tap.not_ok(&test_name, format!("invalid options in expected file: {}", e));
                return;
            }
        },
        None => ReadOptions::default(),
    };
    let source = match read_text(input) {
        Ok(s) => s,
        Err(e) => {
            tap.not_ok(&test_name, e);
            return;
        }
    };
    let report = match read_database(&source, &options) {
        Ok(r) => r,
        Err(e) => {
            tap.not_ok(&test_name, format!("read failed: {}", e));
            return;
        }
    };

    let got = serde_json::json!({
        "errors": report.error_count,
        "warnings": report.warning_count,
        "aborted": report.aborted,
    });
    let mut problems = Vec::new();
    for key in ["errors", "warnings", "aborted"] {
        if expected.get(key) != got.get(key) {
            problems.push(format!(
                "{} expected {}, got {}",
                key,
                expected.get(key).unwrap_or(&Value::Null),
                got[key]
            ));
        }
    }
    if let Some(messages) = expected.get("messages").and_then(Value::as_array) {
        for wanted in messages.iter().filter_map(Value::as_str) {
            if !report.diagnostics.iter().any(|d| d.message.contains(wanted)) {
                problems.push(format!("no diagnostic mentions {:?}", wanted));
            }
        }
    }

    if problems.is_empty() {
        tap.ok(&test_name);
    } else {
        for d in &report.diagnostics {
            problems.push(format!("got: {}", d));
        }
        tap.not_ok(&test_name, problems.join("\n"));
    }
}

// -- Helpers --

/// `*.odb` inputs in `dir`, sorted, without the `*.expected.odb` companions.
fn glob_odb_files(dir: &Path) -> Vec<PathBuf> {
    let mut results = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let is_odb = path.extension().and_then(|e| e.to_str()) == Some("odb");
            if is_odb && !stem(&path).ends_with(".expected") {
                results.push(path);
            }
        }
    }
    results.sort();
    results
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn read_text(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
}

fn read_json(path: &Path) -> Result<Value, String> {
    let src = read_text(path)?;
    serde_json::from_str(&src).map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))
}

/// First differing line, shown with terminators made visible.
fn text_diff(expected: &str, actual: &str) -> String {
    let split = |s: &str| -> Vec<String> {
        s.split_inclusive(['\n', '\r'])
            .map(|l| l.replace('\n', "\\n").replace('\r', "\\r"))
            .collect()
    };
    let (exp, got) = (split(expected), split(actual));
    let line = exp
        .iter()
        .zip(&got)
        .position(|(a, b)| a != b)
        .unwrap_or(exp.len().min(got.len()));
    format!(
        "output differs at line {}\n--- expected\n{}\n+++ got\n{}",
        line + 1,
        exp.get(line).map_or("<end of file>", String::as_str),
        got.get(line).map_or("<end of file>", String::as_str)
    )
}
