use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::event::{attr, Attribute};

pub const FIDELITY_PRESS_SOURCE_ID: &str = "fidelity_press";

const FIDELITY_PRESS_HREF: &str = r#"^https://newsroom\.fidelity\.com/pressreleases/[^"'\s<>]+$"#;

static FIDELITY_PRESS_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_href_pattern(FIDELITY_PRESS_HREF).expect("built-in href pattern compiles")
});

/// Decides which start tags carry listing fields for one source.
pub trait FieldMatchers: Send + Sync {
    /// Returns the trimmed href when the tag is an in-scope reference link.
    fn reference_link(&self, tag_name: &str, attrs: &[Attribute]) -> Option<String>;

    fn is_date_container(&self, tag_name: &str, attrs: &[Attribute]) -> bool;

    fn is_reference_link(&self, tag_name: &str, attrs: &[Attribute]) -> bool {
        self.reference_link(tag_name, attrs).is_some()
    }
}

/// Markup conventions of one listing source.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub link_tag: String,
    pub href_pattern: Regex,
    pub date_tag: String,
    pub marker_attribute: String,
    pub date_marker: String,
}

impl SourceProfile {
    /// `<a href="https://newsroom.fidelity.com/pressreleases/...">` titles and
    /// `<div class="news-log">` dates.
    pub fn fidelity_press() -> Self {
        Self {
            link_tag: "a".to_string(),
            href_pattern: FIDELITY_PRESS_HREF_RE.clone(),
            date_tag: "div".to_string(),
            marker_attribute: "class".to_string(),
            date_marker: "news-log".to_string(),
        }
    }

    /// Built-in profile for a known source id.
    pub fn for_source(source_id: &str) -> Option<Self> {
        match source_id {
            FIDELITY_PRESS_SOURCE_ID => Some(Self::fidelity_press()),
            _ => None,
        }
    }

    /// Replace the href pattern; compiled case-insensitively.
    pub fn with_href_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.href_pattern = build_href_pattern(pattern)?;
        Ok(self)
    }

    pub fn with_date_marker(mut self, marker: impl Into<String>) -> Self {
        self.date_marker = marker.into();
        self
    }
}

impl Default for SourceProfile {
    fn default() -> Self {
        Self::fidelity_press()
    }
}

impl FieldMatchers for SourceProfile {
    fn reference_link(&self, tag_name: &str, attrs: &[Attribute]) -> Option<String> {
        if tag_name != self.link_tag {
            return None;
        }
        let href = attr(attrs, "href")?.trim();
        if href.is_empty() || !self.href_pattern.is_match(href) {
            return None;
        }
        Some(href.to_string())
    }

    fn is_date_container(&self, tag_name: &str, attrs: &[Attribute]) -> bool {
        tag_name == self.date_tag
            && attr(attrs, &self.marker_attribute)
                .is_some_and(|tokens| tokens.split_whitespace().any(|t| t == self.date_marker))
    }
}

fn build_href_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
