//! The error log file: emptied when a run starts, rewritten on failure.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::path::Path;

/// Truncate (or create) the error log.
pub fn reset(path: &Path) -> Result<()> {
    std::fs::write(path, "")
        .with_context(|| format!("Failed to reset error log {}", path.display()))
}

/// Replace the error log with one timestamped entry for `error`.
pub fn record(path: &Path, error: &dyn std::fmt::Display) -> Result<()> {
    let entry = format!(
        "{}: {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        error
    );
    std::fs::write(path, entry)
        .with_context(|| format!("Failed to write error log {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reset_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("error_log.txt");
        std::fs::write(&path, "old failure").unwrap();

        reset(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_record_writes_timestamped_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("error_log.txt");
        std::fs::write(&path, "old failure\n").unwrap();

        record(&path, &"LLM error: model offline").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("old failure"));
        assert!(contents.ends_with("Z: LLM error: model offline\n"));

        let (timestamp, _) = contents.split_once(": ").unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }
}
