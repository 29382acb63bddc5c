use crate::collector::ElementKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a generated page object finds its element again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    Id,
    Name,
    Class,
    Tag,
    Xpath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSpec {
    pub kind: LocatorKind,
    pub value: String,
}

impl LocatorSpec {
    pub fn new(kind: LocatorKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }
}

impl fmt::Display for LocatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            LocatorKind::Id => "id",
            LocatorKind::Name => "name",
            LocatorKind::Class => "class",
            LocatorKind::Tag => "tag",
            LocatorKind::Xpath => "xpath",
        };
        write!(f, "{} `{}`", kind, self.value)
    }
}

/// Locator for a collected key
///
/// Frame keys become XPath expressions, since a frame-relative lookup
/// cannot be written as a single attribute match. A positional key only
/// names its tag here; the position stays on the key itself.
pub fn infer_locator(key: &ElementKey) -> LocatorSpec {
    match key {
        ElementKey::Id(id) => LocatorSpec::new(LocatorKind::Id, id.as_str()),
        ElementKey::Name(name) => LocatorSpec::new(LocatorKind::Name, name.as_str()),
        ElementKey::Class { class, .. } => LocatorSpec::new(LocatorKind::Class, class.as_str()),
        ElementKey::TagPosition { tag, .. } => LocatorSpec::new(LocatorKind::Tag, tag.as_str()),
        ElementKey::Frame { .. } => LocatorSpec::new(LocatorKind::Xpath, format!("//{}", xpath_step(key))),
    }
}

/// Locator for a key given in its string form
pub fn infer_locator_str(key: &str) -> LocatorSpec {
    infer_locator(&ElementKey::parse(key))
}

fn xpath_step(key: &ElementKey) -> String {
    match key {
        ElementKey::Id(id) => format!("*[@id={}]", xpath_literal(id)),
        ElementKey::Name(name) => format!("*[@name={}]", xpath_literal(name)),
        ElementKey::Class { class, tag } => format!(
            "{}[contains(concat(' ', normalize-space(@class), ' '), {})]",
            tag,
            xpath_literal(&format!(" {} ", class))
        ),
        ElementKey::TagPosition { tag, index } => format!("{}[{}]", tag, index + 1),
        ElementKey::Frame { index, inner } => format!("iframe[{}]//{}", index + 1, xpath_step(inner)),
    }
}

/// Quote a string as an XPath 1.0 literal
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// What kind of control an element is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    TextInput,
    Password,
    TextArea,
    Checkbox,
    Radio,
    Button,
    Link,
    Select,
    Generic,
}

impl ElementRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementRole::TextInput => "text input",
            ElementRole::Password => "password",
            ElementRole::TextArea => "text area",
            ElementRole::Checkbox => "checkbox",
            ElementRole::Radio => "radio",
            ElementRole::Button => "button",
            ElementRole::Link => "link",
            ElementRole::Select => "select",
            ElementRole::Generic => "element",
        }
    }
}

/// Role from tag name and, for `<input>`, its type
///
/// An input without a type is a text input. Input types with no dedicated
/// role (file, date, range, ...) are generic.
pub fn infer_role(tag_name: &str, input_type: Option<&str>) -> ElementRole {
    match tag_name.to_ascii_lowercase().as_str() {
        "input" => {
            let input_type = input_type.map(|t| t.trim().to_ascii_lowercase()).unwrap_or_default();
            match input_type.as_str() {
                "" | "text" | "email" | "search" | "tel" | "url" => ElementRole::TextInput,
                "password" => ElementRole::Password,
                "checkbox" => ElementRole::Checkbox,
                "radio" => ElementRole::Radio,
                "submit" | "button" => ElementRole::Button,
                _ => ElementRole::Generic,
            }
        }
        "button" => ElementRole::Button,
        "a" => ElementRole::Link,
        "select" => ElementRole::Select,
        "textarea" => ElementRole::TextArea,
        _ => ElementRole::Generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_locators() {
        assert_eq!(infer_locator_str("q"), LocatorSpec::new(LocatorKind::Id, "q"));
        assert_eq!(infer_locator_str("name_email"), LocatorSpec::new(LocatorKind::Name, "email"));
        assert_eq!(infer_locator_str("go_button"), LocatorSpec::new(LocatorKind::Class, "go"));
    }

    #[test]
    fn test_positional_locator_names_tag() {
        assert_eq!(infer_locator_str("input_0"), LocatorSpec::new(LocatorKind::Tag, "input"));
        assert_eq!(
            infer_locator(&ElementKey::tag_position("input", 0).in_frame(0)).value,
            "//iframe[1]//input[1]"
        );
    }

    #[test]
    fn test_frame_locator() {
        assert_eq!(
            infer_locator_str("iframe0_q"),
            LocatorSpec::new(LocatorKind::Xpath, "//iframe[1]//*[@id='q']")
        );
        assert_eq!(
            infer_locator(&ElementKey::class("go", "button").in_frame(2)).value,
            "//iframe[3]//button[contains(concat(' ', normalize-space(@class), ' '), ' go ')]"
        );
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }

    #[test]
    fn test_roles() {
        assert_eq!(infer_role("input", Some("text")), ElementRole::TextInput);
        assert_eq!(infer_role("input", None), ElementRole::TextInput);
        assert_eq!(infer_role("input", Some("EMAIL")), ElementRole::TextInput);
        assert_eq!(infer_role("input", Some("password")), ElementRole::Password);
        assert_eq!(infer_role("input", Some("checkbox")), ElementRole::Checkbox);
        assert_eq!(infer_role("input", Some("radio")), ElementRole::Radio);
        assert_eq!(infer_role("input", Some("submit")), ElementRole::Button);
        assert_eq!(infer_role("input", Some("file")), ElementRole::Generic);
        assert_eq!(infer_role("BUTTON", None), ElementRole::Button);
        assert_eq!(infer_role("a", None), ElementRole::Link);
        assert_eq!(infer_role("select", None), ElementRole::Select);
        assert_eq!(infer_role("textarea", None), ElementRole::TextArea);
        assert_eq!(infer_role("div", None), ElementRole::Generic);
    }
}
