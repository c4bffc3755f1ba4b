//! Input validation for access codes and catalog uploads.
//!
//! Every check here runs at the request boundary, before any store call.
//!
//! ## Character Whitelists
//!
//! - Access codes: `[A-Za-z0-9_-]`, surrounding whitespace trimmed.
//! - Catalog names: `[A-Za-z0-9 !'()._-]`. Object store backends keep these
//!   verbatim, so a listed name is exactly the name that was uploaded. `*`
//!   is left out because object stores percent-encode it in keys.

use std::fmt;

use crate::{
    config::{CatalogConfig, ValidationConfig},
    error::{Classify, ErrorKind},
};

/// Validation error with structured context.
///
/// Carries the classification so callers can map missing fields and
/// disallowed extensions differently from general malformed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
    /// External classification of the failure.
    pub kind: ErrorKind,
}

impl ValidationError {
    fn missing(field: &str) -> Self {
        Self {
            field: field.to_string(),
            constraint: "must not be empty".to_string(),
            kind: ErrorKind::MissingInput,
        }
    }

    fn invalid(field: &str, constraint: impl Into<String>) -> Self {
        Self { field: field.to_string(), constraint: constraint.into(), kind: ErrorKind::Invalid }
    }

    fn extension(constraint: impl Into<String>) -> Self {
        Self {
            field: "name".to_string(),
            constraint: constraint.into(),
            kind: ErrorKind::InvalidExtension,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

impl Classify for ValidationError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Trims and validates an access code, returning the lookup key.
///
/// Codes must:
/// - Be non-empty after trimming
/// - Not exceed `config.max_code_bytes`
/// - Contain only `[A-Za-z0-9_-]`
///
/// # Errors
///
/// Returns [`ValidationError`] with kind [`ErrorKind::MissingInput`] for a
/// blank code and [`ErrorKind::Invalid`] otherwise.
pub fn normalize_code<'a>(
    raw: &'a str,
    config: &ValidationConfig,
) -> Result<&'a str, ValidationError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(ValidationError::missing("code"));
    }
    if code.len() > config.max_code_bytes {
        return Err(ValidationError::invalid(
            "code",
            format!(
                "length {} bytes exceeds maximum {} bytes",
                code.len(),
                config.max_code_bytes
            ),
        ));
    }
    if let Some(pos) = code.find(|c: char| !is_code_char(c)) {
        return Err(ValidationError::invalid(
            "code",
            format!(
                "contains invalid character {:?} at byte offset {}; allowed: [A-Za-z0-9_-]",
                code[pos..].chars().next().unwrap_or('\0'),
                pos
            ),
        ));
    }
    Ok(code)
}

/// Resolves the final entry name from the desired name and the client's
/// original file name.
///
/// A desired name without any `.` inherits the original file's extension,
/// so `"lostcat"` uploaded from `photo.JPG` becomes `"lostcat.JPG"`. Names
/// that already contain a dot are kept as typed.
#[must_use]
pub fn resolve_item_name(name: &str, original_name: Option<&str>) -> String {
    let name = name.trim();
    if name.is_empty() || name.contains('.') {
        return name.to_string();
    }
    match original_name.and_then(extension_of) {
        Some(ext) => format!("{name}.{ext}"),
        None => name.to_string(),
    }
}

/// Validates a catalog entry name.
///
/// Names must:
/// - Be non-empty
/// - Not exceed `config.max_name_bytes`
/// - Contain only `[A-Za-z0-9 !'()._-]`
/// - Not be `.` or `..`
///
/// # Errors
///
/// Returns [`ValidationError`] with kind [`ErrorKind::MissingInput`] for an
/// empty name and [`ErrorKind::Invalid`] otherwise.
pub fn validate_item_name(name: &str, config: &ValidationConfig) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::missing("name"));
    }
    if name.len() > config.max_name_bytes {
        return Err(ValidationError::invalid(
            "name",
            format!(
                "length {} bytes exceeds maximum {} bytes",
                name.len(),
                config.max_name_bytes
            ),
        ));
    }
    if name == "." || name == ".." {
        return Err(ValidationError::invalid("name", "must not be a relative path segment"));
    }
    if let Some(pos) = name.find(|c: char| !is_name_char(c)) {
        return Err(ValidationError::invalid(
            "name",
            format!(
                "contains invalid character {:?} at byte offset {}; allowed: [A-Za-z0-9 !'()._-]",
                name[pos..].chars().next().unwrap_or('\0'),
                pos
            ),
        ));
    }
    Ok(())
}

/// Checks the name's extension against the allow-list.
///
/// Returns the extension as written in the name.
///
/// # Errors
///
/// Returns [`ValidationError`] with kind [`ErrorKind::InvalidExtension`] if
/// the name has no extension or it is not allowed.
pub fn validate_extension<'a>(
    name: &'a str,
    config: &CatalogConfig,
) -> Result<&'a str, ValidationError> {
    let Some(ext) = extension_of(name) else {
        return Err(ValidationError::extension(format!(
            "has no file extension; allowed: {}",
            config.allowed_extensions.join(", ")
        )));
    };
    if !config.allows_extension(ext) {
        return Err(ValidationError::extension(format!(
            "extension '{}' is not allowed; allowed: {}",
            ext,
            config.allowed_extensions.join(", ")
        )));
    }
    Ok(ext)
}

/// Checks that a declared media type matches what the extension implies.
///
/// Parameters such as `; charset=binary` are ignored, as is ASCII case.
///
/// # Errors
///
/// Returns [`ValidationError`] with kind [`ErrorKind::InvalidExtension`] on
/// a mismatch.
pub fn validate_media_type(declared: &str, extension: &str) -> Result<(), ValidationError> {
    let essence = declared.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    let consistent =
        mime_guess::from_ext(extension).iter().any(|mime| mime.essence_str() == essence);
    if !consistent {
        return Err(ValidationError {
            field: "media_type".to_string(),
            constraint: format!(
                "'{}' does not match extension '{}' (expected {})",
                declared,
                extension,
                media_type_for_extension(extension)
            ),
            kind: ErrorKind::InvalidExtension,
        });
    }
    Ok(())
}

/// Checks that an upload carries a payload.
///
/// # Errors
///
/// Returns [`ValidationError`] with kind [`ErrorKind::MissingInput`] for an
/// empty payload.
pub fn require_content(content: &[u8]) -> Result<(), ValidationError> {
    if content.is_empty() {
        return Err(ValidationError::missing("content"));
    }
    Ok(())
}

/// Checks the payload size against `config.max_upload_bytes`.
///
/// # Errors
///
/// Returns [`ValidationError`] with kind [`ErrorKind::Invalid`] if the
/// payload is too large.
pub fn validate_upload_size(len: usize, config: &CatalogConfig) -> Result<(), ValidationError> {
    if len > config.max_upload_bytes {
        return Err(ValidationError::invalid(
            "content",
            format!("length {} bytes exceeds maximum {} bytes", len, config.max_upload_bytes),
        ));
    }
    Ok(())
}

/// Media type for a stored entry, derived from its name.
#[must_use]
pub fn media_type_for(name: &str) -> String {
    extension_of(name).map_or_else(
        || mime_guess::mime::APPLICATION_OCTET_STREAM.to_string(),
        media_type_for_extension,
    )
}

fn media_type_for_extension(extension: &str) -> String {
    mime_guess::from_ext(extension).first_or_octet_stream().essence_str().to_string()
}

/// Extension after the last `.`, if non-empty.
fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext).filter(|ext| !ext.is_empty())
}

#[inline]
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '!' | '\'' | '(' | ')' | '.' | '_' | '-')
}

#[inline]
fn is_code_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn limits() -> ValidationConfig {
        ValidationConfig::default()
    }

    // =========================================================================
    // normalize_code
    // =========================================================================

    #[test]
    fn test_normalize_code_trims_whitespace() {
        assert_eq!(normalize_code("  XYZ789\n", &limits()).unwrap(), "XYZ789");
    }

    #[test]
    fn test_normalize_code_blank_is_missing() {
        for raw in ["", "   ", "\t"] {
            let err = normalize_code(raw, &limits()).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MissingInput);
            assert_eq!(err.field, "code");
        }
    }

    #[test]
    fn test_normalize_code_exactly_at_limit() {
        let code = "a".repeat(64);
        assert!(normalize_code(&code, &limits()).is_ok());
    }

    #[test]
    fn test_normalize_code_one_byte_over_limit() {
        let code = "a".repeat(65);
        let err = normalize_code(&code, &limits()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Invalid);
        assert!(err.constraint.contains("exceeds maximum"));
    }

    #[test]
    fn test_normalize_code_rejects_inner_space() {
        let err = normalize_code("ABC 123", &limits()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Invalid);
        assert!(err.constraint.contains("invalid character"));
    }

    #[test]
    fn test_normalize_code_allows_dash_and_underscore() {
        assert!(normalize_code("spring-2024_A", &limits()).is_ok());
    }

    // =========================================================================
    // Names
    // =========================================================================

    #[test]
    fn test_resolve_name_appends_original_extension() {
        assert_eq!(resolve_item_name("lostcat", Some("photo.jpg")), "lostcat.jpg");
        assert_eq!(resolve_item_name("lostcat", Some("IMG.1.PNG")), "lostcat.PNG");
    }

    #[test]
    fn test_resolve_name_keeps_dotted_names() {
        assert_eq!(resolve_item_name("lostcat.jpeg", Some("photo.jpg")), "lostcat.jpeg");
    }

    #[test]
    fn test_resolve_name_without_original_extension() {
        assert_eq!(resolve_item_name("lostcat", None), "lostcat");
        assert_eq!(resolve_item_name("lostcat", Some("photo")), "lostcat");
        assert_eq!(resolve_item_name("  ", Some("photo.jpg")), "");
    }

    #[test]
    fn test_validate_item_name_rejects_separators() {
        let bad_names = [
            "a/b.jpg",
            "a\\b.jpg",
            "x\u{7}.png",
            "..",
            ".",
            "50%.jpg",
            "café.jpg",
            "lost*cat.jpg",
        ];
        for bad in bad_names {
            let err = validate_item_name(bad, &limits()).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Invalid, "name {bad:?}");
        }
    }

    #[test]
    fn test_validate_item_name_empty_is_missing() {
        let err = validate_item_name("", &limits()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingInput);
    }

    #[test]
    fn test_validate_item_name_allows_spaces_and_punctuation() {
        assert!(validate_item_name("blue umbrella (red) - Sam's!.jpg", &limits()).is_ok());
    }

    #[test]
    fn test_validate_item_name_over_limit() {
        let config = ValidationConfig { max_name_bytes: 8, ..ValidationConfig::default() };
        let err = validate_item_name("toolong.jpg", &config).unwrap_err();
        assert!(err.constraint.contains("exceeds maximum"));
    }

    // =========================================================================
    // Extensions and media types
    // =========================================================================

    #[test]
    fn test_validate_extension_case_insensitive() {
        let config = CatalogConfig::default();
        assert_eq!(validate_extension("lostcat.JPG", &config).unwrap(), "JPG");
        assert_eq!(validate_extension("scarf.jpeg", &config).unwrap(), "jpeg");
    }

    #[test]
    fn test_validate_extension_rejects_disallowed() {
        let config = CatalogConfig::default();
        for bad in ["notes.txt", "anim.gif", "noext", "trailing."] {
            let err = validate_extension(bad, &config).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidExtension, "name {bad:?}");
        }
    }

    #[test]
    fn test_validate_media_type_matches_extension() {
        assert!(validate_media_type("image/jpeg", "jpg").is_ok());
        assert!(validate_media_type("IMAGE/JPEG", "JPEG").is_ok());
        assert!(validate_media_type("image/png; charset=binary", "png").is_ok());
    }

    #[test]
    fn test_validate_media_type_mismatch() {
        let err = validate_media_type("image/png", "jpg").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidExtension);
        assert_eq!(err.field, "media_type");
        assert!(err.constraint.contains("image/jpeg"));
    }

    #[test]
    fn test_media_type_for_name() {
        assert_eq!(media_type_for("lostcat.jpg"), "image/jpeg");
        assert_eq!(media_type_for("lostcat.PNG"), "image/png");
        assert_eq!(media_type_for("lostcat"), "application/octet-stream");
    }

    #[test]
    fn test_validate_upload_size() {
        let config = CatalogConfig { max_upload_bytes: 4, ..CatalogConfig::default() };
        assert!(validate_upload_size(4, &config).is_ok());
        let err = validate_upload_size(5, &config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Invalid);
        assert_eq!(err.field, "content");
    }

    #[test]
    fn test_require_content() {
        assert!(require_content(b"\xff\xd8").is_ok());
        let err = require_content(&[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingInput);
        assert_eq!(err.field, "content");
    }

    #[test]
    fn test_validation_error_display() {
        let err = validate_item_name("", &limits()).unwrap_err();
        assert_eq!(err.to_string(), "name: must not be empty");
    }

    proptest! {
        #[test]
        fn prop_whitelisted_codes_are_accepted(code in "[A-Za-z0-9_-]{1,64}") {
            prop_assert_eq!(normalize_code(&code, &limits()).unwrap(), code.as_str());
        }

        #[test]
        fn prop_resolved_name_keeps_user_prefix(
            name in "[a-z]{1,20}",
            ext in "(jpg|jpeg|png)",
        ) {
            let original = format!("upload.{ext}");
            let resolved = resolve_item_name(&name, Some(&original));
            prop_assert!(resolved.starts_with(&name));
            prop_assert!(validate_extension(&resolved, &CatalogConfig::default()).is_ok());
        }
    }
}
