mod file;
mod options;
mod stats;

pub use file::{FileStatus, Owner, StoredFile};
pub use options::{
    is_allowed_object, EffectKind, ProcessingOptions, INTENSITY_MAX, INTENSITY_MIN, OBJECT_LABELS,
};
pub use stats::UsageStats;
