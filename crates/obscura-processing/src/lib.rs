//! Upload validation and the emulated processing pipeline.

pub mod pipeline;
pub mod validator;

pub use pipeline::{DerivedArtifact, EmulatedProcessor, FileProcessor, ProcessingError};
pub use validator::{mime_from_extension, UploadValidator, ValidationError, ALLOWED_EXTENSIONS};
