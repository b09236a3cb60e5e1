//! Metadata validation
//!
//! Keys must match `^[a-zA-Z0-9_\-\.:]+$`, stay within 64 characters and avoid
//! the reserved `_system_` / `_internal_` prefixes. Values are limited in size
//! once serialized to JSON.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::AppError;

/// Maximum length for metadata key names
pub const MAX_METADATA_KEY_LENGTH: usize = 64;

/// Maximum length for metadata values when JSON serialized
pub const MAX_METADATA_VALUE_LENGTH: usize = 1024;

/// Maximum number of metadata keys per file
pub const MAX_METADATA_KEYS: usize = 50;

/// Maximum length of a file description
pub const MAX_DESCRIPTION_LENGTH: usize = 4096;

const RESERVED_PREFIXES: &[&str] = &["_system_", "_internal_"];

pub fn validate_metadata_key(key: &str) -> Result<(), AppError> {
    if key.is_empty() {
        return Err(AppError::Validation(
            "Metadata key cannot be empty".to_string(),
        ));
    }

    if key.len() > MAX_METADATA_KEY_LENGTH {
        return Err(AppError::Validation(format!(
            "Metadata key '{}' exceeds maximum length of {} characters",
            key, MAX_METADATA_KEY_LENGTH
        )));
    }

    let pattern = Regex::new(r"^[a-zA-Z0-9_\-\.:]+$").map_err(|e| {
        AppError::Internal(format!("Failed to compile metadata key regex: {}", e))
    })?;

    if !pattern.is_match(key) {
        return Err(AppError::Validation(format!(
            "Metadata key '{}' contains invalid characters. Allowed: letters, digits, '_', '-', '.', ':'",
            key
        )));
    }

    if is_reserved_key(key) {
        return Err(AppError::Validation(format!(
            "Metadata key '{}' uses a reserved prefix. Reserved prefixes: {:?}",
            key, RESERVED_PREFIXES
        )));
    }

    Ok(())
}

/// Check if a key starts with a reserved prefix
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

pub fn validate_metadata_value(value: &JsonValue) -> Result<(), AppError> {
    let serialized = serde_json::to_string(value)?;

    if serialized.len() > MAX_METADATA_VALUE_LENGTH {
        return Err(AppError::Validation(format!(
            "Metadata value exceeds maximum length of {} characters when serialized",
            MAX_METADATA_VALUE_LENGTH
        )));
    }

    Ok(())
}

/// Validate a whole metadata map: key count, every key and every value
pub fn validate_metadata(metadata: &BTreeMap<String, JsonValue>) -> Result<(), AppError> {
    if metadata.len() > MAX_METADATA_KEYS {
        return Err(AppError::Validation(format!(
            "Metadata contains {} keys, but maximum allowed is {}",
            metadata.len(),
            MAX_METADATA_KEYS
        )));
    }

    for (key, value) in metadata {
        validate_metadata_key(key)?;
        validate_metadata_value(value).map_err(|e| match e {
            AppError::Validation(msg) => {
                AppError::Validation(format!("Invalid value for key '{}': {}", key, msg))
            }
            other => other,
        })?;
    }

    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), AppError> {
    if description.len() > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::Validation(format!(
            "Description exceeds maximum length of {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_metadata_key_valid() {
        assert!(validate_metadata_key("alt").is_ok());
        assert!(validate_metadata_key("exif.camera").is_ok());
        assert!(validate_metadata_key("dc:creator").is_ok());
        assert!(validate_metadata_key("page-count").is_ok());
    }

    #[test]
    fn test_validate_metadata_key_invalid() {
        assert!(validate_metadata_key("").is_err());
        assert!(validate_metadata_key("with space").is_err());
        assert!(validate_metadata_key("slash/key").is_err());
        assert!(validate_metadata_key(&"k".repeat(MAX_METADATA_KEY_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_reserved_prefixes() {
        assert!(is_reserved_key("_system_checksum"));
        assert!(is_reserved_key("_internal_state"));
        assert!(!is_reserved_key("system"));
        assert!(validate_metadata_key("_system_checksum").is_err());
    }

    #[test]
    fn test_validate_metadata_value_too_long() {
        let value = json!("a".repeat(MAX_METADATA_VALUE_LENGTH + 1));
        assert!(matches!(
            validate_metadata_value(&value),
            Err(AppError::Validation(_))
        ));
        assert!(validate_metadata_value(&json!({"width": 640})).is_ok());
    }

    #[test]
    fn test_validate_metadata_map() {
        let mut metadata = BTreeMap::new();
        metadata.insert("alt".to_string(), json!("A red bicycle"));
        metadata.insert("width".to_string(), json!(640));
        assert!(validate_metadata(&metadata).is_ok());

        metadata.insert("bad key".to_string(), json!(1));
        assert!(validate_metadata(&metadata).is_err());
    }

    #[test]
    fn test_validate_metadata_too_many_keys() {
        let metadata: BTreeMap<String, JsonValue> = (0..=MAX_METADATA_KEYS)
            .map(|i| (format!("key{}", i), json!(i)))
            .collect();
        assert!(validate_metadata(&metadata).is_err());
    }
}
