//! fentity Plugins Library
//!
//! Explicit registries replace hook discovery: classification rules and
//! override stages decide a file's type, index contributors add searchable
//! text, formatters describe how files can be displayed. Everything is
//! registered at startup and iterated in a fixed order.

pub mod classifier;
pub mod formatter;
pub mod index;
pub mod registry;
#[cfg(feature = "builtin-rules")]
pub mod rules;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use classifier::{CandidateOverride, ClassificationRule, OverrideStage, StageInfo, StageKind};
pub use formatter::{
    FileFormatter, FormatterInfo, FormatterRegistry, GenericFileFormatter, ImageFormatter,
};
pub use index::{FileDetailsContributor, IndexContributor, IndexRegistry, MetadataIndexContributor};
pub use registry::ClassifierRegistry;
#[cfg(feature = "builtin-rules")]
pub use rules::{
    AnonymousUploadRule, ExtensionRule, MimeTypeRule, PickIndexOverride, PreferTypeOverride,
};
