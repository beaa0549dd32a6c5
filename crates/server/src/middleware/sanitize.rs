//! Free-text input sanitizing.
//!
//! Names and notes end up in HTML emails and the admin dashboard, so markup
//! is stripped before they are stored or rendered.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>").expect("script pattern is valid")
});

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Remove `<script>` blocks and any other HTML tags, then trim.
#[must_use]
pub fn sanitize_text(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    HTML_TAG.replace_all(&without_scripts, "").trim().to_string()
}

/// [`sanitize_text`] for optional fields; blank results become `None`.
#[must_use]
pub fn sanitize_optional(input: Option<&str>) -> Option<String> {
    input.map(sanitize_text).filter(|s| !s.is_empty())
}
