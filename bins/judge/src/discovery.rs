// Test case discovery
// Pairs `input<id>.<ext>` with `output<id>.<ext>` from one flat directory.

use anyhow::{Context, Result};
use judge_common::types::{TestCase, DEFAULT_IDENTIFIER};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions (case-insensitive) a test case file may carry
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["txt", "in", "out"];

const INPUT_PREFIX: &str = "input";
const OUTPUT_PREFIX: &str = "output";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Input,
    Output,
}

/// Normalize raw identifier text: trimmed, lowercased, spaces to underscores
pub fn normalize_identifier(raw: &str) -> String {
    let id = raw.trim().to_lowercase().replace(' ', "_");
    if id.is_empty() {
        DEFAULT_IDENTIFIER.to_string()
    } else {
        id
    }
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        name.get(prefix.len()..)
    } else {
        None
    }
}

/// Split a file name into its side and normalized identifier
///
/// Returns `None` for names that are not test case files.
fn classify(file_name: &str) -> Option<(Side, String)> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() || !ALLOWED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)) {
        return None;
    }

    let (side, rest) = if let Some(rest) = strip_prefix_ignore_case(stem, INPUT_PREFIX) {
        (Side::Input, rest)
    } else if let Some(rest) = strip_prefix_ignore_case(stem, OUTPUT_PREFIX) {
        (Side::Output, rest)
    } else {
        return None;
    };

    Some((side, normalize_identifier(rest)))
}

fn insert(map: &mut BTreeMap<String, PathBuf>, identifier: String, path: PathBuf) {
    if let Some(previous) = map.insert(identifier.clone(), path.clone()) {
        warn!(
            identifier = %identifier,
            kept = %path.display(),
            dropped = %previous.display(),
            "Two files map to the same test case identifier; keeping the later one"
        );
    }
}

/// Run order: numeric identifiers first by value (`2` before `10`), then
/// everything else by name
fn run_order(a: &str, b: &str) -> Ordering {
    let key = |id: &str| match id.parse::<u64>() {
        Ok(n) => (0, n),
        Err(_) => (1, 0),
    };
    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

/// Scan `directory` and return the paired test cases in run order
///
/// Files are visited in sorted name order so the result never depends on
/// how the filesystem enumerates the directory.
pub fn discover(directory: &Path) -> Result<Vec<TestCase>> {
    let entries = fs::read_dir(directory)
        .with_context(|| format!("Failed to read testcase directory: {}", directory.display()))?;

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            files.push((name.to_string(), path));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut inputs = BTreeMap::new();
    let mut outputs = BTreeMap::new();

    for (name, path) in files {
        match classify(&name) {
            Some((Side::Input, id)) => insert(&mut inputs, id, path),
            Some((Side::Output, id)) => insert(&mut outputs, id, path),
            None => debug!(file = %name, "Skipping non-testcase file"),
        }
    }

    let mut cases = Vec::new();
    for (identifier, input_path) in inputs {
        match outputs.remove(&identifier) {
            Some(expected_output_path) => cases.push(TestCase {
                identifier,
                input_path,
                expected_output_path,
            }),
            None => debug!(identifier = %identifier, "Input has no matching output; skipped"),
        }
    }
    for identifier in outputs.keys() {
        debug!(identifier = %identifier, "Output has no matching input; skipped");
    }

    cases.sort_by(|a, b| run_order(&a.identifier, &b.identifier));
    Ok(cases)
}
