//! Extension to MIME type table used by `send_file` and `render`
//!
//! The table is fixed. Extensions outside it have no content type.

use std::path::Path;

/// Every supported extension with its MIME type
pub const MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("jpeg", "image/jpeg"),
    ("tiff", "image/tiff"),
    ("csv", "text/csv"),
    ("xml", "text/xml"),
    ("md", "text/markdown"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("txt", "text/plain"),
    ("ts", "text/typescript"),
    ("tsx", "text/tsx"),
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("jsx", "text/jsx"),
    ("gz", "application/gzip"),
    ("css", "text/css"),
    ("wasm", "application/wasm"),
    ("svg", "image/svg+xml"),
];

/// Look up the MIME type for an extension (without the dot)
pub fn from_extension(ext: &str) -> Option<&'static str> {
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Look up the MIME type for a file path by its final extension
pub fn from_path(path: impl AsRef<Path>) -> Option<&'static str> {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .and_then(from_extension)
}
