//! Upload validation rules for document and image files.
//!
//! These checks run before any bytes leave for object storage. They are
//! independent of the order state machine: a file can be rejected for size
//! or extension regardless of what the order looks like.

/// Maximum accepted upload size in bytes (50 MB).
pub const MAX_FILE_SIZE: u64 = 52_428_800;

/// Extensions accepted for upload, dot included.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".png", ".jpg", ".doc", ".docx", ".pdf"];

/// How an uploaded file is slotted into an order payload.
///
/// Images append to an ordered `images` list; documents overwrite the single
/// `file` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Document,
}

/// Why an upload was rejected before reaching storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilePolicyError {
    #[error("file extension {0} is not allowed")]
    ExtensionNotAllowed(String),

    #[error("file size {0} exceeds the {MAX_FILE_SIZE} byte limit")]
    TooLarge(u64),
}

/// Guess a dot-prefixed extension from the declared content type, falling
/// back to the file name suffix.
///
/// Mirrors upload clients that send a reliable `Content-Type` but an
/// arbitrary file name. Returns `None` when neither source yields anything.
pub fn guess_extension(content_type: Option<&str>, file_name: &str) -> Option<String> {
    if let Some(ext) = content_type.and_then(extension_for_content_type) {
        return Some(ext.to_string());
    }
    let suffix = file_name.rsplit('.').next()?;
    if suffix.is_empty() || suffix == file_name {
        return None;
    }
    Some(format!(".{}", suffix.to_ascii_lowercase()))
}

/// Map the content types this service accepts to canonical extensions.
fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some(".png"),
        "image/jpeg" => Some(".jpg"),
        "application/pdf" => Some(".pdf"),
        "application/msword" => Some(".doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some(".docx")
        }
        _ => None,
    }
}

/// Validate an upload against the extension allow-list and size ceiling.
pub fn check_file(extension: &str, size: u64) -> Result<(), FilePolicyError> {
    if !ALLOWED_EXTENSIONS.contains(&extension) {
        return Err(FilePolicyError::ExtensionNotAllowed(extension.to_string()));
    }
    if size > MAX_FILE_SIZE {
        return Err(FilePolicyError::TooLarge(size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_content_type_wins() {
        // Content type takes priority over a misleading file name.
        assert_eq!(
            guess_extension(Some("image/png"), "scan.jpeg"),
            Some(".png".to_string())
        );
        assert_eq!(
            guess_extension(Some("application/pdf"), "contract"),
            Some(".pdf".to_string())
        );
    }

    #[test]
    fn test_extension_falls_back_to_file_name() {
        assert_eq!(
            guess_extension(Some("application/octet-stream"), "contract.PDF"),
            Some(".pdf".to_string())
        );
        assert_eq!(guess_extension(None, "notes.docx"), Some(".docx".to_string()));
    }

    #[test]
    fn test_extension_unresolvable() {
        assert_eq!(guess_extension(None, "README"), None);
        assert_eq!(guess_extension(None, "trailing."), None);
    }

    #[test]
    fn test_check_file_allows_listed_extensions() {
        for ext in ALLOWED_EXTENSIONS {
            assert_eq!(check_file(ext, 1024), Ok(()));
        }
    }

    #[test]
    fn test_check_file_rejects_extension() {
        assert_eq!(
            check_file(".exe", 10),
            Err(FilePolicyError::ExtensionNotAllowed(".exe".to_string()))
        );
    }

    #[test]
    fn test_check_file_size_boundary() {
        assert_eq!(check_file(".pdf", MAX_FILE_SIZE), Ok(()));
        assert_eq!(
            check_file(".pdf", MAX_FILE_SIZE + 1),
            Err(FilePolicyError::TooLarge(MAX_FILE_SIZE + 1))
        );
    }

    #[test]
    fn test_extension_checked_before_size() {
        // Both invalid: the extension failure is reported.
        assert_eq!(
            check_file(".exe", MAX_FILE_SIZE + 1),
            Err(FilePolicyError::ExtensionNotAllowed(".exe".to_string()))
        );
    }
}
