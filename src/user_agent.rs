//! Default User-Agent for lookup and screenshot requests.
//!
//! The public lookup service rejects obvious bot identities, so the default
//! mimics a desktop browser. Deployments can override it with
//! `custom_user_agent`.

/// Browser-like User-Agent used when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Returns `custom` when it is non-blank, otherwise [`DEFAULT_USER_AGENT`].
#[must_use]
pub fn effective_user_agent(custom: &str) -> &str {
    let trimmed = custom.trim();
    if trimmed.is_empty() {
        DEFAULT_USER_AGENT
    } else {
        trimmed
    }
}
