//! Allowed-extension policy

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::proposal::extension_of;

/// Set of recognized extensions, stored lowercase with a leading dot.
///
/// An empty set admits nothing. `""` in the set admits files without an
/// extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct AllowedExtensions {
    extensions: BTreeSet<String>,
}

impl AllowedExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| normalize(ext.as_ref()))
                .collect(),
        }
    }

    /// Parse a comma-separated list such as `".txt, JPG,pdf"`
    pub fn parse_list(list: &str) -> Self {
        Self::new(list.split(',').filter(|part| !part.trim().is_empty()))
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Whether a file passes the policy
    pub fn permits(&self, path: &Path) -> bool {
        let key = match extension_of(path) {
            Some(ext) => format!(".{}", ext),
            None => String::new(),
        };
        self.extensions.contains(&key)
    }
}

fn normalize(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.').to_lowercase();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{}", trimmed)
    }
}

impl From<Vec<String>> for AllowedExtensions {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<AllowedExtensions> for Vec<String> {
    fn from(value: AllowedExtensions) -> Self {
        value.extensions.into_iter().collect()
    }
}
