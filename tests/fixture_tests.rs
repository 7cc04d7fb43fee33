//! Runs every `.tast` fixture under `tests/fixtures` against its CHECK directives.

use std::fs;
use std::path::{Path, PathBuf};

use c2bc::test_ast::{TestRunner, TestSpec};

/// Discovers all .tast files in a directory recursively
fn discover_tast_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(discover_tast_files(&path));
            } else if path.extension().and_then(|s| s.to_str()) == Some("tast") {
                files.push(path);
            }
        }
    }

    files.sort();
    files
}

fn run_fixture(path: &Path) -> Result<(), String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let spec = TestSpec::parse(&contents)?;
    TestRunner::new(false).run_test(&spec)
}

#[test]
fn test_all_fixtures() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let files = discover_tast_files(&dir);
    assert!(!files.is_empty(), "no fixtures found in {}", dir.display());

    let failures: Vec<String> = files
        .iter()
        .filter_map(|path| {
            run_fixture(path)
                .err()
                .map(|e| format!("{}: {}", path.display(), e))
        })
        .collect();

    assert!(
        failures.is_empty(),
        "{} of {} fixtures failed:\n{}",
        failures.len(),
        files.len(),
        failures.join("\n")
    );
}
