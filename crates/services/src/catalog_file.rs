use serde::Deserialize;
use std::path::Path;

use study_core::model::{Catalog, Statement, StatementKind};

use crate::error::ConfigError;

/// One statement as written in a catalog file.
#[derive(Debug, Clone, Deserialize)]
struct StatementEntry {
    text: String,
    kind: StatementKind,
    #[serde(default)]
    ground_truth: Option<bool>,
    #[serde(default)]
    feedback: Option<String>,
}

/// Parses a catalog from a JSON array of statement entries.
///
/// ```json
/// [
///   { "text": "AAPL closes lower on 2025-05-13", "kind": "target" },
///   { "text": "Rome is the capital of Italy", "kind": "test", "ground_truth": true }
/// ]
/// ```
///
/// # Errors
///
/// Returns `ConfigError::Json` for malformed input, `ConfigError::Entry` for an
/// invalid statement and `ConfigError::Catalog` for catalog-level problems.
pub fn parse_catalog(json: &str) -> Result<Catalog, ConfigError> {
    let entries: Vec<StatementEntry> = serde_json::from_str(json)?;
    let mut statements = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let statement =
            Statement::from_parts(entry.text, entry.kind, entry.ground_truth, entry.feedback)
                .map_err(|e| ConfigError::Entry {
                    index,
                    source: e.into(),
                })?;
        statements.push(statement);
    }
    Catalog::new(statements).map_err(|e| ConfigError::Catalog(e.into()))
}

/// Reads and parses a catalog file.
///
/// # Errors
///
/// Returns `ConfigError::Io` if the file cannot be read, otherwise as
/// [`parse_catalog`].
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    parse_catalog(&json)
}

const DEMO_TARGETS: [(&str, &str); 3] = [
    (
        "Apple Inc. (AAPL): the share price on 2025-05-13 will be lower than on 2025-04-27.",
        "Apple Inc. (AAPL): the share price on 2025-05-13 will not be lower than on 2025-04-27.",
    ),
    (
        "Microsoft Corp. (MSFT): the share price on 2025-05-11 will be lower than on 2025-05-12.",
        "Microsoft Corp. (MSFT): the share price on 2025-05-11 will not be lower than on 2025-05-12.",
    ),
    (
        "Amazon.com Inc. (AMZN): the share price on 2025-02-01 will be higher than on 2025-01-28.",
        "Amazon.com Inc. (AMZN): the share price on 2025-02-01 will not be higher than on 2025-01-28.",
    ),
];

const DEMO_TESTS: [(&str, bool); 4] = [
    ("Rome is the capital of Italy.", true),
    ("Water boils at 50 degrees Celsius at sea level.", false),
    ("A week has seven days.", true),
    ("The Moon is larger than the Earth.", false),
];

/// Built-in catalog: three stock-price forecasts with their negations, plus
/// four statements of known truth.
///
/// # Errors
///
/// Never fails for the built-in texts; the `Result` mirrors [`parse_catalog`].
pub fn demo_catalog() -> Result<Catalog, ConfigError> {
    let mut statements = Vec::with_capacity(DEMO_TARGETS.len() * 2 + DEMO_TESTS.len());
    for (target, control) in DEMO_TARGETS {
        let target = Statement::target(target).map_err(|e| ConfigError::Catalog(e.into()))?;
        let control =
            Statement::control_of(&target, control).map_err(|e| ConfigError::Catalog(e.into()))?;
        statements.push(target);
        statements.push(control);
    }
    for (text, truth) in DEMO_TESTS {
        statements.push(Statement::test(text, truth).map_err(|e| ConfigError::Catalog(e.into()))?);
    }
    Catalog::new(statements).map_err(|e| ConfigError::Catalog(e.into()))
}
