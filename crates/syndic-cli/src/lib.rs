//! # syndic-cli — CLI Tool for the Syndicate Stack
//!
//! Offline access to the distribution engine, for operators checking a
//! configuration before uploading it or reproducing a recorded split.
//!
//! ## Subcommands
//!
//! - `syndic validate` — Validate a configuration file and print the report.
//! - `syndic compute` — Compute the distribution of a gross profit.
//! - `syndic migrate` — Convert a legacy (`v1`) configuration to `v2`.
//!
//! ```bash
//! syndic validate desk.yaml --users users.yaml
//! syndic compute desk.json --gross 1000 --as-of 2026-06-30 --settle
//! syndic migrate legacy.yaml --users users.yaml --output desk.json
//! ```
//!
//! Configuration and user files may be JSON or YAML, chosen by extension.
//!
//! ## Exit Codes
//!
//! 0 on success, 1 when the configuration or distribution is rejected,
//! 2 on operational errors (unreadable files, bad arguments).

pub mod compute;
pub mod migrate;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use syndic_core::UserId;
use syndic_distribution::{
    LegacyDistributionConfig, StaticDirectory, StoredDistributionConfig,
};

/// Exit code for a rejected configuration or distribution.
pub const EXIT_REJECTED: u8 = 1;

/// Whether a path names a YAML document.
fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Read a JSON or YAML document, chosen by file extension.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if is_yaml(path) {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

/// Render a value as JSON or YAML, matching the target path's extension.
pub fn render_document<T: Serialize>(value: &T, path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if is_yaml(p) => serde_yaml::to_string(value).context("failed to render YAML"),
        _ => serde_json::to_string_pretty(value).context("failed to render JSON"),
    }
}

/// Load a stored configuration.
///
/// Documents carrying `schema_version` are read as tagged. Untagged
/// documents are read as `v2`, or as `v1` with `assume_legacy`.
pub fn load_config(path: &Path, assume_legacy: bool) -> Result<StoredDistributionConfig> {
    let value: serde_json::Value = load_document(path)?;
    let tagged = value.get("schema_version").is_some();
    let config = if tagged {
        serde_json::from_value(value)
    } else if assume_legacy {
        serde_json::from_value::<LegacyDistributionConfig>(value).map(StoredDistributionConfig::V1)
    } else {
        serde_json::from_value(value).map(StoredDistributionConfig::V2)
    };
    config.with_context(|| format!("{} is not a distribution configuration", path.display()))
}

/// One entry of a users file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: UserId,
    pub display_name: String,
}

/// Load a users file into a directory. No file gives an empty directory.
pub fn load_directory(path: Option<&Path>) -> Result<StaticDirectory> {
    let Some(path) = path else {
        return Ok(StaticDirectory::new());
    };
    let users: Vec<UserEntry> = load_document(path)?;
    tracing::debug!(users = users.len(), path = %path.display(), "loaded user directory");
    Ok(users
        .into_iter()
        .fold(StaticDirectory::new(), |dir, u| dir.with_user(u.id, u.display_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_tagged_yaml_and_untagged_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = write(
            &dir,
            "legacy.yaml",
            "schema_version: v1\nparticipants:\n  - name: Desk\n    percentage: \"100\"\n",
        );
        let config = load_config(&yaml, false).unwrap();
        assert_eq!(config.schema_version(), "v1");

        let json = write(
            &dir,
            "current.json",
            r#"{"participants":[{"recipient":{"kind":"manual","ref":"Desk"},"percentage":"100"}]}"#,
        );
        assert_eq!(load_config(&json, false).unwrap().schema_version(), "v2");
    }

    #[test]
    fn assume_legacy_reads_untagged_as_v1() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "old.json",
            r#"{"participants":[{"name":"Desk","percentage":"100"}]}"#,
        );
        assert_eq!(load_config(&path, true).unwrap().schema_version(), "v1");
        assert!(load_config(&path, false).is_err());
    }

    #[test]
    fn missing_file_is_an_error_with_context() {
        let err = load_config(Path::new("/nonexistent/config.json"), false).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }

    #[test]
    fn directory_from_users_file() {
        let dir = tempfile::tempdir().unwrap();
        let id = UserId::new();
        let path = write(
            &dir,
            "users.yaml",
            &format!("- id: {id}\n  display_name: Alice\n"),
        );
        let directory = load_directory(Some(&path)).unwrap();
        assert_eq!(directory.len(), 1);
        assert!(load_directory(None).unwrap().is_empty());
    }

    #[test]
    fn renders_by_extension() {
        let value = serde_json::json!({ "a": 1 });
        assert!(render_document(&value, None).unwrap().contains("\"a\": 1"));
        assert_eq!(
            render_document(&value, Some(Path::new("out.yml"))).unwrap().trim(),
            "a: 1"
        );
    }
}
