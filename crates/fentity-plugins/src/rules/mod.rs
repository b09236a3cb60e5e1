//! Built-in classification rules and override stages

mod anonymous;
mod extension;
mod mime;
mod prefer;

pub use anonymous::AnonymousUploadRule;
pub use extension::ExtensionRule;
pub use mime::MimeTypeRule;
pub use prefer::{PickIndexOverride, PreferTypeOverride};
