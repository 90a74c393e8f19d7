//! Asset filter rules.
//!
//! A filter is a matrix of rules: the outer list is joined by OR, each
//! inner list by AND. A rule matches when its regex matches the named
//! field of the candidate room. An empty filter accepts everything.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One filter rule: a field name and the regex it must match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterRule {
    pub parameter: String,
    pub regex: String,
}

/// Evaluates an OR-of-AND rule matrix against a field map.
///
/// Rules referring to fields absent from the map never match.
///
/// # Errors
///
/// Returns the underlying [`regex::Error`] when a rule carries an
/// invalid pattern.
pub fn matches_filter(
    filter: &[Vec<FilterRule>],
    fields: &HashMap<String, String>,
) -> Result<bool, regex::Error> {
    if filter.is_empty() {
        return Ok(true);
    }
    for conjunction in filter {
        let mut all = true;
        for rule in conjunction {
            let re = Regex::new(&rule.regex)?;
            match fields.get(&rule.parameter) {
                Some(value) if re.is_match(value) => {}
                _ => {
                    all = false;
                    break;
                }
            }
        }
        if all {
            return Ok(true);
        }
    }
    Ok(false)
}
