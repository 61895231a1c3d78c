//! The record manifest: a JSON array of `{ "icon_url", "resource_id" }`
//! objects, one per list row, in display order.

use std::path::Path;

use glint_core::ResourceRecord;
use serde_json::Value;

use crate::error::ConfigError;

/// Parse manifest text strictly: the top level must be a JSON array.
///
/// Elements that are not objects, or lack a string `icon_url` or
/// `resource_id`, are skipped.
pub fn parse_manifest(
    raw: &str,
) -> Result<Vec<ResourceRecord>, ConfigError> {
    let entries: Vec<Value> =
        serde_json::from_str(raw).map_err(ConfigError::Manifest)?;

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let url = entry.get("icon_url").and_then(Value::as_str);
        let id = entry.get("resource_id").and_then(Value::as_str);
        match (url, id) {
            (Some(url), Some(id)) => {
                records.push(ResourceRecord::new(url, id))
            }
            _ => tracing::debug!(
                index,
                "skipping manifest entry without icon_url/resource_id"
            ),
        }
    }
    Ok(records)
}

/// Load the manifest at `path`. Never fails: a missing, unreadable or
/// malformed file yields no records and a logged warning.
pub fn load_manifest(path: &Path) -> Vec<ResourceRecord> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "manifest unavailable"
            );
            return Vec::new();
        }
    };

    match parse_manifest(&raw) {
        Ok(records) => {
            tracing::info!(
                path = %path.display(),
                count = records.len(),
                "manifest loaded"
            );
            records
        }
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "manifest ignored"
            );
            Vec::new()
        }
    }
}
