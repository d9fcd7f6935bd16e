use crate::services::keys::Region;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use validator::ValidationErrors;

static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));

/// Extension to MIME type table used when a client omits `contentType`.
const MIME_TYPES: &[(&str, &str)] = &[
    // Images
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("bmp", "image/bmp"),
    // Documents
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    // Text
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("xml", "text/xml"),
    // Code
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("ts", "application/typescript"),
    // Archives
    ("zip", "application/zip"),
    ("rar", "application/x-rar-compressed"),
    ("7z", "application/x-7z-compressed"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
    // Audio
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("m4a", "audio/mp4"),
    // Video
    ("mp4", "video/mp4"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("webm", "video/webm"),
];

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Looks up the MIME type for a file name's extension.
pub fn detect_content_type(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

fn normalize_mime(content_type: &str) -> Option<String> {
    content_type
        .trim()
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_lowercase())
}

/// Picks the upload content type: detected from the extension when not
/// declared, otherwise the declared one, which must agree with the extension.
pub fn resolve_content_type(
    file_name: &str,
    declared: Option<&str>,
) -> Result<String, ValidationError> {
    let expected = detect_content_type(file_name);

    match declared.map(str::trim).filter(|d| !d.is_empty()) {
        None => expected.map(str::to_string).ok_or_else(|| {
            ValidationError::new(
                "UNKNOWN_CONTENT_TYPE",
                "Unable to determine content type from file extension. Please provide contentType.",
            )
        }),
        Some(declared) => {
            let matches = matches!(
                (normalize_mime(declared), expected),
                (Some(ref d), Some(e)) if d == e
            );
            if matches {
                Ok(declared.to_string())
            } else {
                Err(ValidationError::new(
                    "CONTENT_TYPE_MISMATCH",
                    format!(
                        "Content type '{}' does not match file extension. Expected '{}'.",
                        declared,
                        expected.unwrap_or("unknown")
                    ),
                ))
            }
        }
    }
}

/// Checks a content type against the configured allowlist. An empty list
/// accepts everything.
pub fn validate_allowed_type(content_type: &str, allowed: &[String]) -> Result<(), ValidationError> {
    if allowed.is_empty() {
        return Ok(());
    }

    let normalized = normalize_mime(content_type).unwrap_or_default();
    if allowed
        .iter()
        .any(|a| normalize_mime(a).is_some_and(|a| a == normalized))
    {
        return Ok(());
    }

    Err(ValidationError::new(
        "INVALID_MIME_TYPE",
        format!("File type {} is not allowed", content_type),
    ))
}

/// Validates a declared size against the maximum limit
pub fn validate_file_size(size: u64, max_size: u64) -> Result<(), ValidationError> {
    if size > max_size {
        return Err(ValidationError::new(
            "FILE_TOO_LARGE",
            format!(
                "File size exceeds maximum allowed size of {} bytes",
                max_size
            ),
        ));
    }
    Ok(())
}

/// Rejects empty ids and anything that could escape the partition.
pub fn validate_file_id(file_id: &str) -> Result<(), ValidationError> {
    if file_id.is_empty() {
        return Err(ValidationError::new("MISSING_FILE_ID", "File ID is required"));
    }

    if file_id.contains("..") || file_id.contains('/') || file_id.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", file_id);
        return Err(ValidationError::new("INVALID_FILE_ID", "Invalid file ID"));
    }

    Ok(())
}

pub fn parse_region(raw: Option<&str>) -> Result<Region, ValidationError> {
    raw.and_then(|r| r.parse().ok()).ok_or_else(|| {
        ValidationError::new("INVALID_REGION", "Invalid region. Must be UK or IRE")
    })
}

/// Listing filter: a single region, or every region for `all` / absent.
pub fn parse_region_filter(raw: Option<&str>) -> Result<Vec<Region>, ValidationError> {
    match raw.unwrap_or("all") {
        "all" => Ok(Region::ALL.to_vec()),
        other => other.parse().map(|r| vec![r]).map_err(|_| {
            ValidationError::new("INVALID_REGION", "Invalid region. Must be UK, IRE, or all")
        }),
    }
}

/// `local@domain.tld` with no whitespace and a single `@`. Used as a
/// `validator` custom rule.
pub fn validate_email_format(email: &str) -> Result<(), validator::ValidationError> {
    let valid = match &*EMAIL_PATTERN {
        Ok(pattern) => pattern.is_match(email),
        Err(e) => {
            tracing::error!("Email pattern failed to compile: {}", e);
            false
        }
    };

    if valid {
        Ok(())
    } else {
        Err(validator::ValidationError::new("email")
            .with_message(Cow::Borrowed("Invalid email format")))
    }
}

/// First message among `fields`, in the given order, from a derive-based
/// validation run.
pub fn first_message(errors: &ValidationErrors, fields: &[&str]) -> String {
    let field_errors = errors.field_errors();
    fields
        .iter()
        .filter_map(|field| field_errors.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid request".to_string())
}
