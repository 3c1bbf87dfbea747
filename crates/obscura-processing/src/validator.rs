use obscura_core::models::{
    is_allowed_object, ProcessingOptions, INTENSITY_MAX, INTENSITY_MIN,
};
use obscura_core::{AppError, FieldError};
use std::path::Path;

/// Extensions accepted for upload, without the dot, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif", // images
    "mp4", "avi", "mov", "wmv", "flv", "webm", "mkv", // videos
];

/// How many leading bytes the content sniffer needs.
pub const SNIFF_LEN: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File is empty")]
    EmptyFile,

    #[error("File size {size} exceeds the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File type not allowed: {0:?}")]
    DisallowedExtension(String),

    #[error("File content is not an image or video (detected {0})")]
    DisallowedContent(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            other => AppError::Validation(vec![FieldError::new("file", other.to_string())]),
        }
    }
}

/// Gatekeeper for incoming uploads. Checks run in a fixed order (size, then
/// extension, then content sniff) and the first failure wins; option
/// validation is separate and collects every violation.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: u64,
}

impl UploadValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Validate a complete upload: declared size, filename extension, and
    /// magic bytes of the payload. `head` should hold at least the first
    /// [`SNIFF_LEN`] bytes (shorter is fine for small files).
    pub fn validate_upload(
        &self,
        size: u64,
        filename: &str,
        head: &[u8],
    ) -> Result<(), ValidationError> {
        self.validate_size(size)?;
        Self::validate_extension(filename)?;
        Self::validate_content(head)?;
        Ok(())
    }

    fn validate_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    fn validate_extension(filename: &str) -> Result<(), ValidationError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(())
        } else {
            Err(ValidationError::DisallowedExtension(ext))
        }
    }

    /// The detected type must be image/* or video/*; the extension alone is
    /// never trusted.
    fn validate_content(head: &[u8]) -> Result<(), ValidationError> {
        let mime = infer::get(head)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if mime.starts_with("image/") || mime.starts_with("video/") {
            Ok(())
        } else {
            Err(ValidationError::DisallowedContent(mime))
        }
    }

    /// Validate processing options, collecting all violations rather than
    /// stopping at the first. Out-of-range values are rejected, never clamped.
    pub fn validate_options(options: &ProcessingOptions) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if options.intensity < INTENSITY_MIN || options.intensity > INTENSITY_MAX {
            errors.push(FieldError::new(
                "intensity",
                format!(
                    "must be between {} and {}, got {}",
                    INTENSITY_MIN, INTENSITY_MAX, options.intensity
                ),
            ));
        }

        for object in &options.objects {
            if !is_allowed_object(object) {
                errors.push(FieldError::new(
                    "object_types",
                    format!("unknown object type: {:?}", object),
                ));
            }
        }

        errors
    }
}

/// MIME type inferred from a filename extension, for the stored record when
/// the client declares none. The content sniff has already confirmed the
/// payload is an image or video by the time this runs.
pub fn mime_from_extension(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obscura_core::models::EffectKind;

    const JPEG_HEAD: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
    const PNG_HEAD: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
    ];

    fn validator() -> UploadValidator {
        UploadValidator::new(1024)
    }

    #[test]
    fn test_valid_jpeg_upload() {
        assert!(validator()
            .validate_upload(100, "photo.jpg", JPEG_HEAD)
            .is_ok());
    }

    #[test]
    fn test_valid_png_with_uppercase_extension() {
        assert!(validator()
            .validate_upload(100, "shot.PNG", PNG_HEAD)
            .is_ok());
    }

    #[test]
    fn test_empty_file_rejected() {
        let result = validator().validate_upload(0, "photo.jpg", JPEG_HEAD);
        assert!(matches!(result, Err(ValidationError::EmptyFile)));
    }

    #[test]
    fn test_oversize_rejected_before_extension() {
        // Size check runs first, so even a bad extension reports too-large.
        let result = validator().validate_upload(4096, "notes.txt", b"hello");
        assert!(matches!(
            result,
            Err(ValidationError::FileTooLarge { size: 4096, max: 1024 })
        ));
    }

    #[test]
    fn test_disallowed_extension_rejected() {
        let result = validator().validate_upload(100, "script.exe", JPEG_HEAD);
        assert!(matches!(
            result,
            Err(ValidationError::DisallowedExtension(ext)) if ext == "exe"
        ));
    }

    #[test]
    fn test_missing_extension_rejected() {
        let result = validator().validate_upload(100, "noext", JPEG_HEAD);
        assert!(matches!(
            result,
            Err(ValidationError::DisallowedExtension(ext)) if ext.is_empty()
        ));
    }

    #[test]
    fn test_text_content_with_image_extension_rejected() {
        // Renaming a text file to .jpg must not get past the sniffer.
        let result = validator().validate_upload(100, "fake.jpg", b"just some plain text here");
        assert!(matches!(result, Err(ValidationError::DisallowedContent(_))));
    }

    #[test]
    fn test_too_large_maps_to_payload_error() {
        let err: AppError = ValidationError::FileTooLarge { size: 10, max: 5 }.into();
        assert_eq!(err.http_status_code(), 413);

        let err: AppError = ValidationError::EmptyFile.into();
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_options_valid() {
        let options = ProcessingOptions {
            effect: EffectKind::Pixelate,
            intensity: 10,
            objects: vec!["face".into(), "car".into()],
        };
        assert!(UploadValidator::validate_options(&options).is_empty());
    }

    #[test]
    fn test_options_collect_all_violations() {
        let options = ProcessingOptions {
            effect: EffectKind::Gaussian,
            intensity: 11,
            objects: vec!["face".into(), "dragon".into(), "unicorn".into()],
        };
        let errors = UploadValidator::validate_options(&options);

        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "intensity");
        assert_eq!(errors[1].field, "object_types");
        assert_eq!(errors[2].field, "object_types");
    }

    #[test]
    fn test_intensity_bounds() {
        for intensity in [INTENSITY_MIN, INTENSITY_MAX] {
            let options = ProcessingOptions {
                intensity,
                ..Default::default()
            };
            assert!(UploadValidator::validate_options(&options).is_empty());
        }
        for intensity in [0, -3, 11] {
            let options = ProcessingOptions {
                intensity,
                ..Default::default()
            };
            assert_eq!(UploadValidator::validate_options(&options).len(), 1);
        }
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension("a.JPG"), "image/jpeg");
        assert_eq!(mime_from_extension("clip.mkv"), "video/x-matroska");
        assert_eq!(mime_from_extension("mystery"), "application/octet-stream");
    }
}
