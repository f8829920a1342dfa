// Upload intake checks, all of which run before any pixel work.

use crate::core::errors::ValidationError;

/// Hard cap on uploaded payloads (16 MiB)
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Validate an upload before decoding.
///
/// Checks run in a fixed order (filename, extension, size) so a nameless
/// oversized upload reports the filename problem, not the size.
pub fn validate_upload(
    filename: &str,
    byte_len: usize,
    allowed_extensions: &[&str],
) -> Result<(), ValidationError> {
    if filename.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    // The extension is everything after the last dot; no dot, no extension
    let valid_extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| allowed_extensions.contains(&ext.as_str()));
    if !valid_extension {
        return Err(ValidationError::InvalidFileType);
    }

    if byte_len > MAX_UPLOAD_BYTES {
        return Err(ValidationError::PayloadTooLarge);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProfileKind;
    use crate::services::prompt::AnalysisProfile;

    const BASE: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

    #[test]
    fn accepts_every_base_extension() {
        for name in ["a.png", "a.jpg", "a.jpeg", "a.gif", "a.bmp"] {
            assert_eq!(validate_upload(name, 100, BASE), Ok(()), "{name}");
        }
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert_eq!(validate_upload("PHOTO.PNG", 100, BASE), Ok(()));
        assert_eq!(validate_upload("photo.Jpeg", 100, BASE), Ok(()));
    }

    #[test]
    fn rejects_unsupported_extension() {
        assert_eq!(
            validate_upload("notes.txt", 100, BASE),
            Err(ValidationError::InvalidFileType)
        );
        assert_eq!(
            validate_upload("archive.png.zip", 100, BASE),
            Err(ValidationError::InvalidFileType)
        );
    }

    #[test]
    fn rejects_filename_without_extension() {
        assert_eq!(
            validate_upload("no_extension", 100, BASE),
            Err(ValidationError::InvalidFileType)
        );
        assert_eq!(
            validate_upload("trailing_dot.", 100, BASE),
            Err(ValidationError::InvalidFileType)
        );
    }

    #[test]
    fn rejects_empty_filename_before_anything_else() {
        // Even an oversized nameless upload reports the filename problem
        assert_eq!(
            validate_upload("", MAX_UPLOAD_BYTES + 1, BASE),
            Err(ValidationError::EmptyFilename)
        );
    }

    #[test]
    fn size_cap_is_inclusive() {
        assert_eq!(validate_upload("a.png", MAX_UPLOAD_BYTES, BASE), Ok(()));
        assert_eq!(
            validate_upload("a.png", MAX_UPLOAD_BYTES + 1, BASE),
            Err(ValidationError::PayloadTooLarge)
        );
    }

    #[test]
    fn extension_outranks_size() {
        assert_eq!(
            validate_upload("notes.txt", MAX_UPLOAD_BYTES + 1, BASE),
            Err(ValidationError::InvalidFileType)
        );
    }

    #[test]
    fn medical_profile_accepts_extended_formats() {
        let medical = AnalysisProfile::new(ProfileKind::Medical);
        assert_eq!(
            validate_upload("scan.webp", 100, medical.allowed_extensions()),
            Ok(())
        );
        assert_eq!(
            validate_upload("scan.tiff", 100, medical.allowed_extensions()),
            Ok(())
        );

        let general = AnalysisProfile::new(ProfileKind::General);
        assert_eq!(
            validate_upload("scan.webp", 100, general.allowed_extensions()),
            Err(ValidationError::InvalidFileType)
        );
    }
}
