use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("valid markup regex"));

/// Form submissions that drive the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Persist the access token and repository identifier.
    Authenticate { access_token: String, repo: String },
    /// Download, unpack and build the selected branch.
    ApplyBranch { branch: String },
    /// Render the branch picker.
    ListBranches,
    ShowSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Updated,
    Error,
}

/// A message shown to the administrator after handling a `Msg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub code: &'static str,
    pub message: String,
}

impl Notice {
    pub fn updated(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Updated,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Strips markup, control characters and surrounding whitespace from a
/// submitted text field.
pub fn sanitize_field(raw: &str) -> String {
    let without_tags = MARKUP_TAG.replace_all(raw, "");
    without_tags
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_trims_and_strips_markup() {
        assert_eq!(sanitize_field("  feature/x \n"), "feature/x");
        assert_eq!(sanitize_field("<b>main</b>"), "main");
        assert_eq!(sanitize_field("a\tb\u{7}c"), "a b c");
        assert_eq!(sanitize_field("<script"), "");
    }

    #[test]
    fn notices_display_their_message() {
        assert_eq!(Notice::error("x", "Error: boom").to_string(), "Error: boom");
        assert_eq!(Notice::updated("y", "ok").to_string(), "ok");
        assert!(Notice::error("x", "boom").is_error());
    }
}
