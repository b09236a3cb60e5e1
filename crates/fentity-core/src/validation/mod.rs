//! Validation modules

pub mod metadata;
pub mod names;

pub use metadata::{
    is_reserved_key, validate_description, validate_metadata, validate_metadata_key,
    validate_metadata_value, MAX_DESCRIPTION_LENGTH, MAX_METADATA_KEYS,
    MAX_METADATA_KEY_LENGTH, MAX_METADATA_VALUE_LENGTH,
};
pub use names::{validate_file_type_id, validate_label, validate_locator};
