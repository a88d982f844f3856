use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::ordered::OrderedMap;

/// Forces a column's type when `key` occurs in its name or in its
/// current type label. Matching is case sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRule {
    pub key: String,
    pub target: String,
}

impl OverrideRule {
    pub fn new(key: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: target.into(),
        }
    }
}

/// Override rules in the order they are applied, which is the order they
/// appear in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "OrderedMap<String>")]
pub struct OverrideRules {
    rules: Vec<OverrideRule>,
}

impl From<OrderedMap<String>> for OverrideRules {
    fn from(map: OrderedMap<String>) -> Self {
        Self {
            rules: map
                .into_iter()
                .map(|(key, target)| OverrideRule { key, target })
                .collect(),
        }
    }
}

impl FromIterator<OverrideRule> for OverrideRules {
    fn from_iter<I: IntoIterator<Item = OverrideRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl OverrideRules {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Loading column type overrides");
        let content = fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::from_json_str(&content).map_err(|err| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source: Box::new(err),
        })?;

        if rules.iter().any(|rule| rule.key.is_empty()) {
            warn!(path = %path.display(), "Override with an empty key matches every column");
        }
        Ok(rules)
    }

    pub fn from_json_str(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OverrideRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a OverrideRules {
    type Item = &'a OverrideRule;
    type IntoIter = std::slice::Iter<'a, OverrideRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
