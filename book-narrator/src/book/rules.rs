//! User-supplied search and replace rules.
//!
//! A rules file holds one `search==replace` pair per line. The search side is
//! a regular expression; the replacement may refer to capture groups as `$1`.

use regex::Regex;
use std::path::Path;

use crate::error::{NarratorError, Result};

const SEPARATOR: &str = "==";

/// A compiled search and replace rule
#[derive(Debug, Clone)]
pub struct SearchReplaceRule {
    pub search: String,
    pub replace: String,
    pattern: Regex,
}

impl SearchReplaceRule {
    pub fn new(search: &str, replace: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            search: search.to_string(),
            replace: replace.to_string(),
            pattern: Regex::new(search)?,
        })
    }

    /// Replace every match of this rule in `text`.
    pub fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, self.replace.as_str())
            .into_owned()
    }
}

/// Apply rules to `text` in file order.
pub fn apply_rules(rules: &[SearchReplaceRule], text: &str) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc))
}

/// Read and compile the rules in `path`.
pub fn load_rules(path: &Path) -> Result<Vec<SearchReplaceRule>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        NarratorError::Configuration(format!(
            "Failed to read search and replace file {}: {}",
            path.display(),
            e
        ))
    })?;
    let rules = parse_rules(&content, path)?;
    log::info!("Loaded {} search and replace rules from {}", rules.len(), path.display());
    Ok(rules)
}

/// Parse rules from file content. `path` is only used in error reports.
///
/// Blank lines are skipped. Any other line must contain exactly one `==` with
/// a non-empty, valid regular expression before it.
pub fn parse_rules(content: &str, path: &Path) -> Result<Vec<SearchReplaceRule>> {
    let mut rules = Vec::new();

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let malformed = |reason: String| NarratorError::MalformedRule {
            path: path.to_path_buf(),
            line: i + 1,
            reason,
        };

        if line.matches(SEPARATOR).count() != 1 {
            return Err(malformed(format!("expected exactly one '{SEPARATOR}'")));
        }
        let Some((search, replace)) = line.split_once(SEPARATOR) else {
            return Err(malformed(format!("expected exactly one '{SEPARATOR}'")));
        };
        if search.is_empty() {
            return Err(malformed("empty search pattern".to_string()));
        }

        let rule = SearchReplaceRule::new(search, replace)
            .map_err(|e| malformed(format!("invalid pattern: {e}")))?;
        log::debug!("Rule {}: {:?} -> {:?}", i + 1, rule.search, rule.replace);
        rules.push(rule);
    }

    Ok(rules)
}
