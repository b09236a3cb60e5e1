//! Validation of file type machine names, labels and storage locators

use regex::Regex;

use crate::error::AppError;

pub const MAX_FILE_TYPE_ID_LENGTH: usize = 32;
pub const MAX_LABEL_LENGTH: usize = 255;
pub const MAX_LOCATOR_LENGTH: usize = 1024;

/// Machine names are lowercase letters, digits and underscores
pub fn validate_file_type_id(id: &str) -> Result<(), AppError> {
    if id.is_empty() || id.len() > MAX_FILE_TYPE_ID_LENGTH {
        return Err(AppError::Validation(format!(
            "File type machine name must be 1-{} characters",
            MAX_FILE_TYPE_ID_LENGTH
        )));
    }
    let pattern = Regex::new(r"^[a-z0-9_]+$").map_err(|e| {
        AppError::Internal(format!("Failed to compile file type name regex: {}", e))
    })?;
    if !pattern.is_match(id) {
        return Err(AppError::Validation(format!(
            "File type machine name '{}' may only contain lowercase letters, digits and underscores",
            id
        )));
    }
    Ok(())
}

pub fn validate_label(label: &str) -> Result<(), AppError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Label cannot be empty".to_string()));
    }
    if trimmed.len() > MAX_LABEL_LENGTH {
        return Err(AppError::Validation(format!(
            "Label exceeds maximum length of {} characters",
            MAX_LABEL_LENGTH
        )));
    }
    Ok(())
}

/// Locators are relative blob store keys: no leading `/`, no `..` segments
pub fn validate_locator(locator: &str) -> Result<(), AppError> {
    if locator.is_empty() || locator.len() > MAX_LOCATOR_LENGTH {
        return Err(AppError::Validation(format!(
            "Locator must be 1-{} characters",
            MAX_LOCATOR_LENGTH
        )));
    }
    if locator.starts_with('/') || locator.ends_with('/') {
        return Err(AppError::Validation(format!(
            "Locator '{}' must be a relative key naming a file",
            locator
        )));
    }
    if locator.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(AppError::Validation(format!(
            "Locator '{}' contains an invalid path segment",
            locator
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_id() {
        assert!(validate_file_type_id("image").is_ok());
        assert!(validate_file_type_id("untrusted_files").is_ok());
        assert!(validate_file_type_id("Image").is_err());
        assert!(validate_file_type_id("has-dash").is_err());
        assert!(validate_file_type_id("").is_err());
    }

    #[test]
    fn test_label() {
        assert!(validate_label("Image").is_ok());
        assert!(validate_label("   ").is_err());
    }

    #[test]
    fn test_locator() {
        assert!(validate_locator("files/abc/report.pdf").is_ok());
        assert!(validate_locator("/etc/passwd").is_err());
        assert!(validate_locator("files/../secret").is_err());
        assert!(validate_locator("files//x").is_err());
        assert!(validate_locator("files/dir/").is_err());
        assert!(validate_locator("").is_err());
    }
}
