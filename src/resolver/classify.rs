//! Classification of untrusted lookup responses.
//!
//! The metadata service answers with a loosely shaped JSON object. This module
//! is the single place that inspects raw fields: [`Classifier::classify`] turns
//! the body into a [`ResolutionOutcome`], and everything downstream works on
//! that variant only.

use serde_json::Value;
use tracing::debug;

/// Default substrings that mark an error message as a quota/rate refusal.
pub const DEFAULT_QUOTA_KEYWORDS: [&str; 4] = ["quota", "limit", "frequent", "rate"];

/// Default substrings that mark a resource name as a disguised throttle notice.
pub const DEFAULT_THROTTLE_NAME_KEYWORDS: [&str; 1] = ["frequent"];

/// Content category reported by the metadata service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    Video,
    Audio,
    Image,
    Document,
    Archive,
    Font,
    Text,
    Folder,
    /// Unrecognized tag, kept verbatim.
    Other(String),
}

impl FileType {
    /// Maps a service type tag (case-insensitive) to a category.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "video" => Self::Video,
            "audio" => Self::Audio,
            "image" => Self::Image,
            "document" => Self::Document,
            "archive" => Self::Archive,
            "font" => Self::Font,
            "text" => Self::Text,
            "folder" => Self::Folder,
            _ => Self::Other(tag.trim().to_string()),
        }
    }
}

/// Validated metadata from a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// Resource display name.
    pub name: String,
    /// Total size in bytes.
    pub size: u64,
    /// Number of files in the resource.
    pub count: u64,
    /// Content category, when the service reported one.
    pub file_type: Option<FileType>,
    /// Screenshot URLs in service order; malformed entries already dropped.
    pub screenshots: Vec<String>,
}

/// Outcome of a remote lookup, after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Usable metadata.
    Success(RemoteMetadata),
    /// The service refused because of quota or request frequency.
    QuotaError(String),
    /// The service reported some other problem.
    OtherError(String),
    /// The body was empty or missing required fields.
    Malformed,
}

impl ResolutionOutcome {
    /// Short label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::QuotaError(_) => "quota_error",
            Self::OtherError(_) => "other_error",
            Self::Malformed => "malformed",
        }
    }
}

/// Keyword rules used to recognize refusals in service wording.
///
/// The upstream service does not document its error conventions, so the
/// keywords are configuration rather than constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    /// Substrings (case-insensitive) of an error message that mean "quota".
    pub quota_keywords: Vec<String>,
    /// Substrings (case-insensitive) of a resource name that mean "throttled".
    pub throttle_name_keywords: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            quota_keywords: DEFAULT_QUOTA_KEYWORDS.map(String::from).to_vec(),
            throttle_name_keywords: DEFAULT_THROTTLE_NAME_KEYWORDS.map(String::from).to_vec(),
        }
    }
}

/// Turns raw lookup bodies into [`ResolutionOutcome`] values.
#[derive(Debug, Clone)]
pub struct Classifier {
    quota_keywords: Vec<String>,
    throttle_name_keywords: Vec<String>,
}

impl Classifier {
    /// Creates a classifier from keyword rules.
    #[must_use]
    pub fn new(rules: &ClassifierRules) -> Self {
        Self {
            quota_keywords: lowercase_all(&rules.quota_keywords),
            throttle_name_keywords: lowercase_all(&rules.throttle_name_keywords),
        }
    }

    /// Classifies a response body. First matching rule wins:
    ///
    /// 1. empty or non-object body: `Malformed`
    /// 2. `error`/`message` present: `QuotaError` if it mentions a quota
    ///    keyword, otherwise `OtherError`
    /// 3. `name` or `size` missing: `Malformed`
    /// 4. `name` mentions a throttle keyword: `OtherError`
    /// 5. otherwise `Success`
    #[must_use]
    pub fn classify(&self, body: &Value) -> ResolutionOutcome {
        let Some(object) = body.as_object().filter(|object| !object.is_empty()) else {
            debug!("lookup body empty or not an object");
            return ResolutionOutcome::Malformed;
        };

        if let Some(reason) = error_text(object.get("error"), object.get("message")) {
            let lowered = reason.to_lowercase();
            if contains_any(&lowered, &self.quota_keywords) {
                return ResolutionOutcome::QuotaError(reason);
            }
            return ResolutionOutcome::OtherError(reason);
        }

        let (Some(name), Some(size)) = (
            object.get("name").and_then(text_value),
            object.get("size").and_then(byte_count),
        ) else {
            debug!("lookup body lacks name or size");
            return ResolutionOutcome::Malformed;
        };

        if contains_any(&name.to_lowercase(), &self.throttle_name_keywords) {
            return ResolutionOutcome::OtherError(name);
        }

        ResolutionOutcome::Success(RemoteMetadata {
            name,
            size,
            count: object.get("count").and_then(byte_count).unwrap_or(0),
            file_type: object
                .get("file_type")
                .and_then(Value::as_str)
                .filter(|tag| !tag.trim().is_empty())
                .map(FileType::from_tag),
            screenshots: object
                .get("screenshots")
                .and_then(Value::as_array)
                .map(|entries| entries.iter().filter_map(screenshot_url).collect())
                .unwrap_or_default(),
        })
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierRules::default())
    }
}

fn lowercase_all(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword.as_str()))
}

/// Picks the reported error text. A non-empty string wins over other truthy
/// values so that `{"error": true, "message": "..."}` reports the message.
fn error_text(error: Option<&Value>, message: Option<&Value>) -> Option<String> {
    let candidates = [error, message];
    candidates
        .iter()
        .flatten()
        .find_map(|value| value.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .or_else(|| {
            candidates
                .iter()
                .flatten()
                .find(|value| is_truthy(value))
                .map(|value| value.to_string())
        })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Reads a field as plain text; non-string scalars are rendered.
fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Reads a non-negative integer from a number or numeric string.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn byte_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts either a bare URL string or an object carrying a `screenshot` URL.
fn screenshot_url(entry: &Value) -> Option<String> {
    let url = match entry {
        Value::String(url) => url.as_str(),
        Value::Object(object) => object.get("screenshot")?.as_str()?,
        _ => return None,
    };
    let url = url.trim();
    (!url.is_empty()).then(|| url.to_string())
}
