//! Gateway credential resolution
//!
//! The token is looked up in a fixed precedence order, first match wins:
//! each configured environment variable, then each configured JSON config
//! file (`gateway.auth.token`). A read or parse failure at one level falls
//! through to the next; only exhausting every level is an error.

use crate::config::{expand_home, CredentialsConfig};
use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a resolved token came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Environment variable of the given name
    EnvVar(String),
    /// JSON config file at the given path
    ConfigFile(PathBuf),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvVar(name) => write!(f, "env:{}", name),
            Self::ConfigFile(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// A gateway token together with its source
#[derive(Clone)]
pub struct ResolvedToken {
    pub token: String,
    pub source: CredentialSource,
}

impl fmt::Debug for ResolvedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedToken")
            .field("token", &mask_token(&self.token))
            .field("source", &self.source)
            .finish()
    }
}

/// Resolves the gateway token from env vars and config files
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    env_vars: Vec<String>,
    config_files: Vec<PathBuf>,
}

impl CredentialResolver {
    /// Create a resolver with explicit sources, in precedence order
    pub fn new(env_vars: Vec<String>, config_files: Vec<PathBuf>) -> Self {
        Self {
            env_vars,
            config_files,
        }
    }

    /// Create a resolver from configuration, expanding `~` in file paths
    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self::new(
            config.env_vars.clone(),
            config.config_files.iter().map(|p| expand_home(p)).collect(),
        )
    }

    /// Resolve the token from the process environment and config files
    pub fn resolve(&self) -> Result<ResolvedToken> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve the token using `lookup` for environment variables
    pub fn resolve_with<F>(&self, lookup: F) -> Result<ResolvedToken>
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in &self.env_vars {
            if let Some(token) = lookup(name).and_then(non_empty) {
                return Ok(ResolvedToken {
                    token,
                    source: CredentialSource::EnvVar(name.clone()),
                });
            }
        }

        for path in &self.config_files {
            if let Some(token) = read_token_file(path) {
                return Ok(ResolvedToken {
                    token,
                    source: CredentialSource::ConfigFile(path.clone()),
                });
            }
        }

        Err(Error::Credentials(format!(
            "no gateway token found (checked env {:?} and {} config file(s))",
            self.env_vars,
            self.config_files.len()
        )))
    }
}

/// Read `gateway.auth.token` from a JSON config file
fn read_token_file(path: &Path) -> Option<String> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!("Failed to read {}: {}", path.display(), e);
            }
            return None;
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&data) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Failed to parse {}: {}", path.display(), e);
            return None;
        }
    };
    value
        .pointer("/gateway/auth/token")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .and_then(non_empty)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Mask a token for display (first 4 characters visible)
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolver(files: Vec<PathBuf>) -> CredentialResolver {
        CredentialResolver::new(vec!["CURRENT".to_string(), "LEGACY".to_string()], files)
    }

    #[test]
    fn test_current_env_wins() {
        let vars = env(&[("CURRENT", "cur-token"), ("LEGACY", "old-token")]);
        let resolved = resolver(vec![])
            .resolve_with(|name| vars.get(name).cloned())
            .unwrap();
        assert_eq!(resolved.token, "cur-token");
        assert_eq!(resolved.source, CredentialSource::EnvVar("CURRENT".to_string()));
    }

    #[test]
    fn test_legacy_env_before_files() {
        let dir = TempDir::new().unwrap();
        let file = write_config(&dir, "a.json", r#"{"gateway":{"auth":{"token":"file"}}}"#);
        let vars = env(&[("LEGACY", "old-token")]);

        let resolved = resolver(vec![file])
            .resolve_with(|name| vars.get(name).cloned())
            .unwrap();
        assert_eq!(resolved.token, "old-token");
    }

    #[test]
    fn test_empty_env_falls_through() {
        let vars = env(&[("CURRENT", "  "), ("LEGACY", "old-token")]);
        let resolved = resolver(vec![])
            .resolve_with(|name| vars.get(name).cloned())
            .unwrap();
        assert_eq!(resolved.token, "old-token");
    }

    #[test]
    fn test_current_file_before_legacy_file() {
        let dir = TempDir::new().unwrap();
        let current = write_config(&dir, "cur.json", r#"{"gateway":{"auth":{"token":"cur"}}}"#);
        let legacy = write_config(&dir, "old.json", r#"{"gateway":{"auth":{"token":"old"}}}"#);

        let resolved = resolver(vec![current.clone(), legacy])
            .resolve_with(|_| None)
            .unwrap();
        assert_eq!(resolved.token, "cur");
        assert_eq!(resolved.source, CredentialSource::ConfigFile(current));
    }

    #[test]
    fn test_corrupt_file_falls_through_to_legacy() {
        let dir = TempDir::new().unwrap();
        let current = write_config(&dir, "cur.json", "{ not json");
        let legacy = write_config(&dir, "old.json", r#"{"gateway":{"auth":{"token":"old"}}}"#);

        let resolved = resolver(vec![current, legacy])
            .resolve_with(|_| None)
            .unwrap();
        assert_eq!(resolved.token, "old");
    }

    #[test]
    fn test_file_without_token_field_falls_through() {
        let dir = TempDir::new().unwrap();
        let current = write_config(&dir, "cur.json", r#"{"gateway":{"port":18789}}"#);
        let legacy = write_config(&dir, "old.json", r#"{"gateway":{"auth":{"token":"old"}}}"#);

        let resolved = resolver(vec![current, legacy])
            .resolve_with(|_| None)
            .unwrap();
        assert_eq!(resolved.token, "old");
    }

    #[test]
    fn test_all_sources_exhausted() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");

        let err = resolver(vec![missing]).resolve_with(|_| None).unwrap_err();
        assert!(matches!(err, Error::Credentials(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_debug_masks_token() {
        let resolved = ResolvedToken {
            token: "supersecret".to_string(),
            source: CredentialSource::EnvVar("CURRENT".to_string()),
        };
        let debug = format!("{:?}", resolved);
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("supe****"));
        assert_eq!(mask_token("abc"), "****");
    }
}
