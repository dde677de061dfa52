use std::collections::BTreeMap;
use std::path::Path;

use log::warn;

use crate::error::{PipelineError, Result};

/// Read-only lookup from chart-file country code to display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryMapper {
    names: BTreeMap<String, String>,
}

impl CountryMapper {
    pub fn new(names: BTreeMap<String, String>) -> Self {
        CountryMapper { names }
    }

    /// Load a JSON object of `{ "se": "Sweden", ... }`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let names: BTreeMap<String, String> =
            serde_json::from_str(&text).map_err(|source| PipelineError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(CountryMapper::new(names))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.names.contains_key(code)
    }

    /// Display name for `code`, or `code` itself when unmapped.
    pub fn resolve(&self, code: &str) -> String {
        match self.names.get(code) {
            Some(name) => name.clone(),
            None => {
                warn!("Code {code} isn't in the country mapping, using it as-is");
                code.to_string()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
