//! Runs every fixture under conformance/ through the core library: round
//! trip files must reproduce byte for byte, negative files must report the
//! counts their expected.json records.

use odb_core::{read_database, write_database, LineEnding, ReadOptions};
use std::path::{Path, PathBuf};

fn conformance_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../conformance")
}

fn collect_inputs(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", dir.display(), e))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().map_or(false, |e| e == "odb")
                && !p.to_string_lossy().ends_with(".expected.odb")
        })
        .collect();
    paths.sort();
    paths
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().unwrap().to_string_lossy();
    path.with_file_name(format!("{}{}", stem, suffix))
}

#[test]
fn roundtrip_fixtures_reproduce_exactly() {
    let inputs = collect_inputs(&conformance_root().join("roundtrip"));
    assert!(!inputs.is_empty(), "no round trip fixtures found");

    let mut failures = Vec::new();
    for input in &inputs {
        let source = std::fs::read_to_string(input).unwrap();
        let expected_path = sibling(input, ".expected.odb");
        let expected = if expected_path.exists() {
            std::fs::read_to_string(&expected_path).unwrap()
        } else {
            source.clone()
        };

        let report = read_database(&source, &ReadOptions::default()).unwrap();
        if !report.is_clean() {
            failures.push(format!("{}: {:?}", input.display(), report.diagnostics));
            continue;
        }
        for ending in [LineEnding::Lf, LineEnding::Cr] {
            let actual = write_database(&report.database, ending);
            if actual != ending.convert(&expected) {
                failures.push(format!(
                    "{} ({:?}): output differs\n--- actual ---\n{}",
                    input.display(),
                    ending,
                    actual
                ));
            }
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n\n"));
}

#[test]
fn roundtrip_output_reads_back_to_an_equal_database() {
    for input in collect_inputs(&conformance_root().join("roundtrip")) {
        let source = std::fs::read_to_string(&input).unwrap();
        let first = read_database(&source, &ReadOptions::default()).unwrap();
        let written = write_database(&first.database, LineEnding::Cr);
        let second = read_database(&written, &ReadOptions::default()).unwrap();
        assert!(second.is_clean(), "{}: {:?}", input.display(), second.diagnostics);
        assert_eq!(first.database, second.database, "{}", input.display());
    }
}

#[test]
fn negative_fixtures_report_expected_counts() {
    let inputs = collect_inputs(&conformance_root().join("negative"));
    assert!(!inputs.is_empty(), "no negative fixtures found");

    let mut failures = Vec::new();
    for input in &inputs {
        let expected_path = sibling(input, ".expected.json");
        let expected: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&expected_path).unwrap_or_else(|e| {
                panic!("missing {}: {}", expected_path.display(), e)
            }))
            .unwrap();
        let options: ReadOptions = match expected.get("options") {
            Some(o) => serde_json::from_value(o.clone()).unwrap(),
            None => ReadOptions::default(),
        };

        let source = std::fs::read_to_string(input).unwrap();
        let report = read_database(&source, &options).unwrap();

        let actual = serde_json::json!({
            "errors": report.error_count,
            "warnings": report.warning_count,
            "aborted": report.aborted,
        });
        for key in ["errors", "warnings", "aborted"] {
            if expected[key] != actual[key] {
                failures.push(format!(
                    "{}: {} expected {}, got {} ({:?})",
                    input.display(),
                    key,
                    expected[key],
                    actual[key],
                    report.diagnostics
                ));
            }
        }
        if let Some(messages) = expected["messages"].as_array() {
            for wanted in messages.iter().filter_map(|m| m.as_str()) {
                if !report.diagnostics.iter().any(|d| d.message.contains(wanted)) {
                    failures.push(format!(
                        "{}: no diagnostic mentions {:?}",
                        input.display(),
                        wanted
                    ));
                }
            }
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}
