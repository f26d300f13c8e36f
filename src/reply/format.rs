//! Text rendering for replies and user-facing notices.

use crate::magnet::LocalMetadata;
use crate::resolver::{FileType, RemoteMetadata};

const BYTE_UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

const DEFAULT_TYPE_ICON: &str = "📦";

/// Formats a byte count with binary prefixes and at most two decimals.
///
/// # Examples
///
/// ```
/// use magnet_resolver_core::reply::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1024), "1 KB");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", BYTE_UNITS[unit])
}

/// Returns the pictogram and label for a content category.
#[must_use]
pub fn type_badge(file_type: Option<&FileType>) -> (&'static str, String) {
    let Some(file_type) = file_type else {
        return (DEFAULT_TYPE_ICON, "Unknown".to_string());
    };
    let (icon, label) = match file_type {
        FileType::Video => ("🎬", "Video"),
        FileType::Audio => ("🎵", "Audio"),
        FileType::Image => ("🖼️", "Image"),
        FileType::Document => ("📄", "Document"),
        FileType::Archive => ("🗜️", "Archive"),
        FileType::Font => ("🔤", "Font"),
        FileType::Text => ("📝", "Text"),
        FileType::Folder => ("📁", "Folder"),
        FileType::Other(tag) => return (DEFAULT_TYPE_ICON, tag.clone()),
    };
    (icon, label.to_string())
}

/// Renders the full reply text for remote metadata.
#[must_use]
pub fn remote_text(meta: &RemoteMetadata, with_screenshot_marker: bool) -> String {
    let (icon, label) = type_badge(meta.file_type.as_ref());
    let mut text = format!(
        "{icon} {label}\nName: {}\nSize: {}\nFiles: {}",
        meta.name,
        format_bytes(meta.size),
        meta.count
    );
    if with_screenshot_marker {
        text.push_str("\n📸 Screenshots preview:");
    }
    text
}

/// Renders the reduced reply text for locally decoded metadata.
#[must_use]
pub fn local_text(meta: &LocalMetadata) -> String {
    let size = meta
        .size
        .map_or_else(|| "unknown".to_string(), format_bytes);
    let mut text = format!(
        "⚠️ Metadata service unavailable, showing details parsed from the link itself\n\
         Name: {}\nHash: {}\nSize: {size}\nTrackers: {}\n",
        meta.name,
        meta.hash,
        meta.trackers.len()
    );
    if meta.is_sparse() {
        text.push_str("💡 This magnet link carries only a hash; the source link may be incomplete.");
    } else {
        text.push_str("💡 Local parsing cannot show screenshots or file listings.");
    }
    text
}

/// Placeholder sent while a lookup is in flight.
pub const RESOLVING_NOTICE: &str = "🔍 Resolving magnet link, please wait...";

/// Notice for a trigger rejected by the throttle.
#[must_use]
pub fn throttled_notice(retry_after_secs: u64) -> String {
    format!("⏳ Too many requests, please try again in {retry_after_secs}s.")
}

/// Notice for a quota refusal or unreachable service when local parsing is off.
#[must_use]
pub fn unavailable_notice(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!(
            "❌ The metadata service is busy or unavailable ({reason}). Please try again later."
        ),
        None => "❌ The metadata service is busy or unavailable. Please try again later.".to_string(),
    }
}

/// Notice for a service-reported error that is not a quota refusal.
#[must_use]
pub fn service_error_notice(reason: &str) -> String {
    let reason = reason.trim();
    if reason.is_empty() {
        "❌ Resolution failed: the service reported an error.".to_string()
    } else {
        format!("❌ Resolution failed: {reason}")
    }
}

/// Notice for a response missing required fields.
pub const INCOMPLETE_DATA_NOTICE: &str = "❌ Resolution failed: the returned data was incomplete.";

/// Notice when neither the service nor local decoding produced anything.
pub const UNRESOLVABLE_NOTICE: &str = "❌ Could not resolve this magnet link.";
