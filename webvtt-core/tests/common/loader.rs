//! Fixture loading from YAML files

use std::path::Path;

use serde::Deserialize;

/// A single test case from a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub desc: String,
    pub vtt: String,
    #[serde(default)]
    pub cues: Vec<ExpectedCue>,
    #[serde(default)]
    pub errors: Vec<ExpectedError>,
    /// The document must end in a hard failure.
    #[serde(default)]
    pub fatal: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedCue {
    #[serde(default)]
    pub id: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub text: String,
    /// Normalized payload markup, checked only when present.
    #[serde(default)]
    pub markup: Option<String>,
}

/// `[CodeName, line, column]`
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedError(pub String, pub u32, pub u32);

/// Load all test cases from a YAML fixture file
pub fn load_fixtures(path: &Path) -> Vec<TestCase> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));
    serde_yaml::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

/// Load fixtures from the standard fixtures directory
pub fn load_fixtures_by_name(name: &str) -> Vec<TestCase> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.yaml", name));
    load_fixtures(&path)
}

pub fn load_all_fixtures() -> Vec<TestCase> {
    ["basic", "errors", "markup"]
        .iter()
        .flat_map(|name| load_fixtures_by_name(name))
        .collect()
}
