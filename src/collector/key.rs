use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one collected element within a single collection pass
///
/// The variant records which rule produced the key, so locator inference
/// never has to guess from the string shape. [`fmt::Display`] gives the
/// flat string form (`q`, `name_email`, `btn_button`, `input_2`,
/// `iframe0_q`) and [`ElementKey::parse`] reads it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKey {
    /// DOM `id`
    Id(String),
    /// `name` attribute
    Name(String),
    /// First class token plus tag name
    Class { class: String, tag: String },
    /// Tag name plus document-order position among elements of that tag
    TagPosition { tag: String, index: usize },
    /// Key of an element inside the `index`-th iframe (0-based)
    Frame { index: usize, inner: Box<ElementKey> },
}

const NAME_PREFIX: &str = "name_";
const FRAME_PREFIX: &str = "iframe";

impl ElementKey {
    pub fn id(id: impl Into<String>) -> Self {
        ElementKey::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        ElementKey::Name(name.into())
    }

    pub fn class(class: impl Into<String>, tag: impl Into<String>) -> Self {
        ElementKey::Class { class: class.into(), tag: tag.into() }
    }

    pub fn tag_position(tag: impl Into<String>, index: usize) -> Self {
        ElementKey::TagPosition { tag: tag.into(), index }
    }

    /// Qualify this key as living inside the `index`-th iframe
    pub fn in_frame(self, index: usize) -> Self {
        ElementKey::Frame { index, inner: Box::new(self) }
    }

    /// Read a key back from its string form
    ///
    /// Rules, first match wins: `name_` prefix; `iframe<N>_<rest>`;
    /// `<lowercase-tag>_<integer>`; anything else with an underscore is
    /// `<class>_<tag>` split at the last underscore; otherwise an id.
    /// Ids that themselves contain underscores cannot be told apart from
    /// class keys in this form; keep the typed key where that matters.
    pub fn parse(key: &str) -> Self {
        if let Some(name) = key.strip_prefix(NAME_PREFIX) {
            return ElementKey::Name(name.to_string());
        }

        if let Some((index, rest)) = split_frame(key) {
            return ElementKey::parse(rest).in_frame(index);
        }

        if let Some((tag, index)) = key.rsplit_once('_') {
            if is_tag_name(tag) && !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(index) = index.parse() {
                    return ElementKey::tag_position(tag, index);
                }
            }
            if !tag.is_empty() && !index.is_empty() {
                return ElementKey::class(tag, index);
            }
        }

        ElementKey::Id(key.to_string())
    }

    /// Innermost key, with any frame qualification removed
    pub fn innermost(&self) -> &ElementKey {
        match self {
            ElementKey::Frame { inner, .. } => inner.innermost(),
            other => other,
        }
    }
}

fn split_frame(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix(FRAME_PREFIX)?;
    let (digits, inner) = rest.split_once('_')?;
    if digits.is_empty() || inner.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, inner))
}

fn is_tag_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKey::Id(id) => f.write_str(id),
            ElementKey::Name(name) => write!(f, "{}{}", NAME_PREFIX, name),
            ElementKey::Class { class, tag } => write!(f, "{}_{}", class, tag),
            ElementKey::TagPosition { tag, index } => write!(f, "{}_{}", tag, index),
            ElementKey::Frame { index, inner } => write!(f, "{}{}_{}", FRAME_PREFIX, index, inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(ElementKey::id("q").to_string(), "q");
        assert_eq!(ElementKey::name("email").to_string(), "name_email");
        assert_eq!(ElementKey::class("go", "button").to_string(), "go_button");
        assert_eq!(ElementKey::tag_position("input", 2).to_string(), "input_2");
        assert_eq!(ElementKey::id("q").in_frame(0).to_string(), "iframe0_q");
    }

    #[test]
    fn test_name_prefix_round_trip() {
        for name in ["email", "first_name", "user[address]", ""] {
            let key = ElementKey::name(name);
            assert_eq!(ElementKey::parse(&key.to_string()), key);
        }
    }

    #[test]
    fn test_parse_each_tier() {
        assert_eq!(ElementKey::parse("q"), ElementKey::id("q"));
        assert_eq!(ElementKey::parse("go_button"), ElementKey::class("go", "button"));
        assert_eq!(ElementKey::parse("nav_item_li"), ElementKey::class("nav_item", "li"));
        assert_eq!(ElementKey::parse("input_3"), ElementKey::tag_position("input", 3));
        assert_eq!(ElementKey::parse("title_h1"), ElementKey::class("title", "h1"));
        assert_eq!(ElementKey::parse("iframe2_name_q"), ElementKey::name("q").in_frame(2));
    }

    #[test]
    fn test_iframe_lookalike_is_not_a_frame() {
        assert_eq!(ElementKey::parse("iframeWrapper"), ElementKey::id("iframeWrapper"));
        assert_eq!(ElementKey::parse("iframe_div"), ElementKey::class("iframe", "div"));
    }

    #[test]
    fn test_innermost() {
        let key = ElementKey::class("go", "button").in_frame(1);
        assert_eq!(key.innermost(), &ElementKey::class("go", "button"));
    }

    #[test]
    fn test_serde_keeps_tier() {
        let key = ElementKey::id("user_name");
        let json = serde_json::to_string(&key).unwrap();
        let back: ElementKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
