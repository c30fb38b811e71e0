//! Environment manifest
//!
//! The toolchain provisioner writes the variables an embedded interpreter
//! needs into `<project>/.deps/runtime/env.txt`, one `KEY=VALUE` per line.
//! They must be in the process environment before
//! [`tether_runtime::Interpreter::initialize`] runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Manifest location relative to the project root
pub const MANIFEST_PATH: &str = ".deps/runtime/env.txt";

/// Manifest loading errors
#[derive(Debug, Error)]
pub enum EnvError {
    /// The manifest could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A line is not `KEY=VALUE`
    #[error("line {line}: expected KEY=VALUE, got '{content}'")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// Offending line
        content: String,
    },
}

/// Parsed `KEY=VALUE` manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvManifest {
    vars: BTreeMap<String, String>,
}

impl EnvManifest {
    /// Parse manifest text. Blank lines and `#` comments are skipped; keys
    /// and values are trimmed and values may contain `=`.
    pub fn parse(text: &str) -> Result<Self, EnvError> {
        let mut vars = BTreeMap::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = || EnvError::Malformed {
                line: idx + 1,
                content: line.to_string(),
            };
            let (key, value) = line.split_once('=').ok_or_else(malformed)?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed());
            }
            vars.insert(key.to_string(), value.trim().to_string());
        }
        Ok(Self { vars })
    }

    /// Read and parse a manifest file
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| EnvError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Read the manifest of a project
    pub fn read(project_root: impl AsRef<Path>) -> Result<Self, EnvError> {
        Self::read_file(project_root.as_ref().join(MANIFEST_PATH))
    }

    /// Value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Entries sorted by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// No variables
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Export every variable into the process environment.
    ///
    /// Must run before other threads read the environment.
    pub fn apply(&self) {
        for (key, value) in &self.vars {
            log::debug!("env {key}={value}");
            std::env::set_var(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let manifest = EnvManifest::parse(
            "# provisioned\n\nRUNTIME_HOME = /opt/rt \nRUNTIME_FLAGS=-X utf8=1\n",
        )
        .unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("RUNTIME_HOME"), Some("/opt/rt"));
        assert_eq!(manifest.get("RUNTIME_FLAGS"), Some("-X utf8=1"));
    }

    #[test]
    fn test_malformed_line_reports_number() {
        let err = EnvManifest::parse("A=1\nnot a pair\n").unwrap_err();
        match err {
            EnvError::Malformed { line, content } => {
                assert_eq!(line, 2);
                assert_eq!(content, "not a pair");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(EnvManifest::parse("=value").is_err());
    }

    #[test]
    fn test_empty_manifest() {
        assert!(EnvManifest::parse("").unwrap().is_empty());
    }
}
