use crate::{cookies::CookieRecord, error::Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to an element in the live document
///
/// Handles are only meaningful to the driver that issued them and go stale
/// as soon as the page navigates or the node is removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Element query understood by every driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    /// Elements whose `id` equals the value
    Id(String),
    /// Elements whose `name` equals the value
    Name(String),
    /// Elements carrying the class token
    ClassName(String),
    /// Elements with the tag name (case-insensitive)
    TagName(String),
    /// Elements that carry the attribute at all, e.g. `[id]`
    HasAttribute(String),
    /// Every element
    Any,
    Css(String),
    XPath(String),
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            By::Id(v) => write!(f, "id={}", v),
            By::Name(v) => write!(f, "name={}", v),
            By::ClassName(v) => write!(f, "class={}", v),
            By::TagName(v) => write!(f, "tag={}", v),
            By::HasAttribute(v) => write!(f, "[{}]", v),
            By::Any => f.write_str("*"),
            By::Css(v) => write!(f, "css={}", v),
            By::XPath(v) => write!(f, "xpath={}", v),
        }
    }
}

/// The browser-session capability the generator consumes
///
/// Every method takes `&self`: sessions use interior mutability so that a
/// [`FrameGuard`](crate::browser::FrameGuard) can hold the driver while the
/// caller keeps issuing queries inside the frame.
pub trait Driver {
    fn navigate(&self, url: &str) -> Result<()>;

    fn current_url(&self) -> Result<String>;

    fn title(&self) -> Result<String>;

    /// Find elements in the current frame, in document order
    fn find_elements(&self, by: &By) -> Result<Vec<ElementHandle>>;

    /// Find descendants of `parent`, in document order
    fn find_within(&self, parent: &ElementHandle, by: &By) -> Result<Vec<ElementHandle>>;

    fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    fn tag_name(&self, element: &ElementHandle) -> Result<String>;

    fn text(&self, element: &ElementHandle) -> Result<String>;

    fn click(&self, element: &ElementHandle) -> Result<()>;

    fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()>;

    fn clear(&self, element: &ElementHandle) -> Result<()>;

    fn is_displayed(&self, element: &ElementHandle) -> Result<bool>;

    fn is_enabled(&self, element: &ElementHandle) -> Result<bool>;

    fn is_selected(&self, element: &ElementHandle) -> Result<bool>;

    fn execute_script(&self, script: &str, args: &[serde_json::Value]) -> Result<serde_json::Value>;

    fn switch_to_frame(&self, frame: &ElementHandle) -> Result<()>;

    fn switch_to_parent_frame(&self) -> Result<()>;

    fn switch_to_default_content(&self) -> Result<()>;

    fn cookies(&self) -> Result<Vec<CookieRecord>>;

    fn add_cookie(&self, cookie: &CookieRecord) -> Result<()>;

    /// Whether `document.readyState` has reached `complete`
    fn document_ready(&self) -> Result<bool> {
        let value = self.execute_script("return document.readyState === 'complete';", &[])?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

impl<D: Driver + ?Sized> Driver for &D {
    fn navigate(&self, url: &str) -> Result<()> {
        (**self).navigate(url)
    }

    fn current_url(&self) -> Result<String> {
        (**self).current_url()
    }

    fn title(&self) -> Result<String> {
        (**self).title()
    }

    fn find_elements(&self, by: &By) -> Result<Vec<ElementHandle>> {
        (**self).find_elements(by)
    }

    fn find_within(&self, parent: &ElementHandle, by: &By) -> Result<Vec<ElementHandle>> {
        (**self).find_within(parent, by)
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        (**self).attribute(element, name)
    }

    fn tag_name(&self, element: &ElementHandle) -> Result<String> {
        (**self).tag_name(element)
    }

    fn text(&self, element: &ElementHandle) -> Result<String> {
        (**self).text(element)
    }

    fn click(&self, element: &ElementHandle) -> Result<()> {
        (**self).click(element)
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        (**self).send_keys(element, text)
    }

    fn clear(&self, element: &ElementHandle) -> Result<()> {
        (**self).clear(element)
    }

    fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        (**self).is_displayed(element)
    }

    fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        (**self).is_enabled(element)
    }

    fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        (**self).is_selected(element)
    }

    fn execute_script(&self, script: &str, args: &[serde_json::Value]) -> Result<serde_json::Value> {
        (**self).execute_script(script, args)
    }

    fn switch_to_frame(&self, frame: &ElementHandle) -> Result<()> {
        (**self).switch_to_frame(frame)
    }

    fn switch_to_parent_frame(&self) -> Result<()> {
        (**self).switch_to_parent_frame()
    }

    fn switch_to_default_content(&self) -> Result<()> {
        (**self).switch_to_default_content()
    }

    fn cookies(&self) -> Result<Vec<CookieRecord>> {
        (**self).cookies()
    }

    fn add_cookie(&self, cookie: &CookieRecord) -> Result<()> {
        (**self).add_cookie(cookie)
    }

    fn document_ready(&self) -> Result<bool> {
        (**self).document_ready()
    }
}
