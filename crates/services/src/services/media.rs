//! Resolution of media reference strings into displayable URLs.
//!
//! A media reference inside a section payload is one of: empty, an absolute
//! URL, a root-relative path, or a bare storage object name. Only the last
//! kind is resolved against a storage bucket.

/// Shown whenever a section has no media reference at all.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.svg";

/// Preview reference for a file selected but not yet uploaded. The storage
/// name does not exist until save time, so the preview carries its own
/// scheme instead of pretending to be a bucket URL.
pub fn pending_preview(file_name: &str) -> String {
    format!("pending:{file_name}")
}

/// True for references that name an object in one of our buckets, as
/// opposed to absolute URLs or root-relative paths.
pub fn is_bare_object_name(value: &str) -> bool {
    !value.is_empty() && !value.starts_with("http") && !value.starts_with('/')
}

/// Resolve a media reference, turning bare object names into public URLs
/// through `to_public_url`. Recognized URLs are passed through untouched.
pub fn resolve_media_with<F>(value: Option<&str>, to_public_url: F) -> String
where
    F: FnOnce(&str) -> String,
{
    match value {
        None => PLACEHOLDER_IMAGE.to_string(),
        Some(v) if v.is_empty() => PLACEHOLDER_IMAGE.to_string(),
        Some(v) if v.starts_with("http") || v.starts_with('/') => v.to_string(),
        Some(v) => to_public_url(v),
    }
}

/// Resolve against a bucket under a fixed public base path.
pub fn resolve_media_reference(value: Option<&str>, bucket: &str, public_base: &str) -> String {
    resolve_media_with(value, |name| {
        format!("{}/{bucket}/{name}", public_base.trim_end_matches('/'))
    })
}
