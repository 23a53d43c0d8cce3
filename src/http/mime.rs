use std::path::Path;

/// Infers a Content-type from the filename suffix.
pub fn content_type(filename: &Path) -> &'static str {
    match filename.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("gif") => "image/gif",
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        _ => "text/plain",
    }
}
