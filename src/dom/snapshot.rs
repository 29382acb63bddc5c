use crate::{
    browser::driver::{By, Driver, ElementHandle},
    cookies::CookieRecord,
    dom::element::ElementNode,
    error::{PomError, Result},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::{Mutex, MutexGuard, PoisonError}};
use url::Url;

/// One stored page: where it lives, its title and its DOM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotPage {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub root: ElementNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Child(usize),
    /// Descend from an iframe element into its document
    Frame,
}

type NodeAddr = Vec<Step>;

#[derive(Debug, Default)]
struct State {
    /// Pristine pages keyed by fragment-less URL
    pages: HashMap<String, SnapshotPage>,
    current: Option<String>,
    /// Working copy of the current page; interactions mutate it
    live: Option<ElementNode>,
    generation: u64,
    registry: Vec<NodeAddr>,
    /// Addresses of the iframe elements entered, outermost first
    frames: Vec<NodeAddr>,
    cookies: Vec<CookieRecord>,
    history: Vec<String>,
}

/// A [`Driver`] over in-memory [`ElementNode`] pages
///
/// Navigation reloads a fresh copy of the stored page, so typed values and
/// checked boxes reset the way a reload would. Handles are tied to the
/// navigation that produced them and report stale afterwards.
#[derive(Debug, Default)]
pub struct SnapshotDriver {
    state: Mutex<State>,
}

impl SnapshotDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: register a page
    pub fn with_page(self, url: impl Into<String>, title: impl Into<String>, root: ElementNode) -> Self {
        self.add_page(SnapshotPage { url: url.into(), title: title.into(), root });
        self
    }

    /// Build a driver from a list of stored pages
    pub fn from_pages(pages: impl IntoIterator<Item = SnapshotPage>) -> Self {
        let driver = Self::new();
        for page in pages {
            driver.add_page(page);
        }
        driver
    }

    /// Load pages from JSON: either one page object or an array of them
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let pages: Vec<SnapshotPage> = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            vec![serde_json::from_value(value)?]
        };

        let driver = Self::from_pages(pages.into_iter().map(|mut page| {
            page.root.simplify();
            page
        }));
        Ok(driver)
    }

    pub fn add_page(&self, page: SnapshotPage) {
        let key = page_key(&page.url).unwrap_or_else(|| page.url.clone());
        self.lock().pages.insert(key, page);
    }

    /// Number of frames currently entered
    pub fn frame_depth(&self) -> usize {
        self.lock().frames.len()
    }

    /// URLs navigated to, in order
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cookie domain rule: empty means the current host, a leading dot is ignored
fn domain_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    domain.is_empty() || host.eq_ignore_ascii_case(domain) || host.ends_with(&format!(".{}", domain))
}

fn page_key(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

fn resolve<'a>(root: &'a ElementNode, addr: &[Step]) -> Option<&'a ElementNode> {
    let mut node = root;
    for step in addr {
        node = match step {
            Step::Child(i) => node.children.get(*i)?,
            Step::Frame => node.frame_document.as_deref()?,
        };
    }
    Some(node)
}

fn resolve_mut<'a>(root: &'a mut ElementNode, addr: &[Step]) -> Option<&'a mut ElementNode> {
    let mut node = root;
    for step in addr {
        node = match step {
            Step::Child(i) => node.children.get_mut(*i)?,
            Step::Frame => node.frame_document.as_deref_mut()?,
        };
    }
    Some(node)
}

fn matches(node: &ElementNode, by: &By) -> Result<bool> {
    Ok(match by {
        By::Id(id) => node.id().is_some_and(|v| v == id),
        By::Name(name) => node.get_attribute("name").is_some_and(|v| v == name),
        By::ClassName(class) => node.has_class(class),
        By::TagName(tag) => node.is_tag(tag),
        By::HasAttribute(attr) => node.has_attribute(attr),
        By::Any => true,
        By::Css(_) | By::XPath(_) => {
            return Err(PomError::Unsupported(format!("snapshot driver cannot evaluate {}", by)));
        }
    })
}

/// Pre-order search of one document; never crosses into iframe documents
fn collect_matches(node: &ElementNode, addr: &mut NodeAddr, by: &By, include_self: bool, out: &mut Vec<NodeAddr>) -> Result<()> {
    if include_self && matches(node, by)? {
        out.push(addr.clone());
    }
    for (i, child) in node.children.iter().enumerate() {
        addr.push(Step::Child(i));
        collect_matches(child, addr, by, true, out)?;
        addr.pop();
    }
    Ok(())
}

fn for_each_mut(node: &mut ElementNode, f: &mut dyn FnMut(&mut ElementNode)) {
    f(node);
    for child in &mut node.children {
        for_each_mut(child, f);
    }
}

impl State {
    fn live(&self) -> Result<&ElementNode> {
        self.live
            .as_ref()
            .ok_or_else(|| PomError::NavigationFailed("no page loaded".to_string()))
    }

    fn live_mut(&mut self) -> Result<&mut ElementNode> {
        self.live
            .as_mut()
            .ok_or_else(|| PomError::NavigationFailed("no page loaded".to_string()))
    }

    fn context_root(&self) -> NodeAddr {
        match self.frames.last() {
            Some(frame) => {
                let mut addr = frame.clone();
                addr.push(Step::Frame);
                addr
            }
            None => Vec::new(),
        }
    }

    fn handle_for(&mut self, addr: NodeAddr) -> ElementHandle {
        let index = match self.registry.iter().position(|a| *a == addr) {
            Some(index) => index,
            None => {
                self.registry.push(addr);
                self.registry.len() - 1
            }
        };
        ElementHandle::new(format!("{}:{}", self.generation, index))
    }

    fn addr_of(&self, handle: &ElementHandle) -> Result<NodeAddr> {
        let stale = || PomError::StaleElement(handle.to_string());
        let (generation, index) = handle.as_str().split_once(':').ok_or_else(stale)?;
        let generation: u64 = generation.parse().map_err(|_| stale())?;
        let index: usize = index.parse().map_err(|_| stale())?;
        if generation != self.generation {
            return Err(stale());
        }
        let addr = self.registry.get(index).cloned().ok_or_else(stale)?;
        resolve(self.live()?, &addr).ok_or_else(stale)?;
        Ok(addr)
    }

    fn node(&self, handle: &ElementHandle) -> Result<&ElementNode> {
        let addr = self.addr_of(handle)?;
        resolve(self.live()?, &addr).ok_or_else(|| PomError::StaleElement(handle.to_string()))
    }

    fn node_mut(&mut self, handle: &ElementHandle) -> Result<&mut ElementNode> {
        let addr = self.addr_of(handle)?;
        resolve_mut(self.live_mut()?, &addr).ok_or_else(|| PomError::StaleElement(handle.to_string()))
    }

    fn search(&mut self, base: NodeAddr, by: &By, include_self: bool) -> Result<Vec<ElementHandle>> {
        let root = resolve(self.live()?, &base)
            .ok_or_else(|| PomError::FrameSwitchFailed("current frame is gone".to_string()))?;
        let mut found = Vec::new();
        let mut addr = base.clone();
        collect_matches(root, &mut addr, by, include_self, &mut found)?;
        Ok(found.into_iter().map(|addr| self.handle_for(addr)).collect())
    }
}

/// What a click turned into, resolved while the state lock is held
enum ClickEffect {
    None,
    Navigate(String),
}

impl Driver for SnapshotDriver {
    fn navigate(&self, url: &str) -> Result<()> {
        let key = page_key(url).ok_or_else(|| PomError::NavigationFailed(format!("Invalid URL: {}", url)))?;
        let mut state = self.lock();
        let page = state
            .pages
            .get(&key)
            .ok_or_else(|| PomError::NavigationFailed(format!("No snapshot stored for {}", url)))?;
        let live = page.root.clone();

        state.live = Some(live);
        state.current = Some(key);
        state.generation += 1;
        state.registry.clear();
        state.frames.clear();
        state.history.push(url.to_string());
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        self.lock()
            .current
            .clone()
            .ok_or_else(|| PomError::NavigationFailed("no page loaded".to_string()))
    }

    fn title(&self) -> Result<String> {
        let state = self.lock();
        let key = state
            .current
            .as_ref()
            .ok_or_else(|| PomError::NavigationFailed("no page loaded".to_string()))?;
        Ok(state.pages.get(key).map(|p| p.title.clone()).unwrap_or_default())
    }

    fn find_elements(&self, by: &By) -> Result<Vec<ElementHandle>> {
        let mut state = self.lock();
        let base = state.context_root();
        state.search(base, by, true)
    }

    fn find_within(&self, parent: &ElementHandle, by: &By) -> Result<Vec<ElementHandle>> {
        let mut state = self.lock();
        let base = state.addr_of(parent)?;
        state.search(base, by, false)
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        Ok(self.lock().node(element)?.get_attribute(name).cloned())
    }

    fn tag_name(&self, element: &ElementHandle) -> Result<String> {
        Ok(self.lock().node(element)?.tag_name.to_ascii_lowercase())
    }

    fn text(&self, element: &ElementHandle) -> Result<String> {
        Ok(self.lock().node(element)?.inner_text())
    }

    fn click(&self, element: &ElementHandle) -> Result<()> {
        let effect = {
            let mut state = self.lock();
            let addr = state.addr_of(element)?;
            let current = state.current.clone().unwrap_or_default();
            let node = state.node(element)?;

            if !node.is_visible {
                return Err(PomError::ElementNotFound(format!("{} is not interactable", element)));
            }
            if node.has_attribute("disabled") {
                return Ok(());
            }

            let tag = node.tag_name.to_ascii_lowercase();
            let input_type = node.get_attribute("type").map(|t| t.to_ascii_lowercase());
            let href = node.get_attribute("href").cloned();
            let name = node.get_attribute("name").cloned();

            match (tag.as_str(), input_type.as_deref()) {
                ("a", _) => match href {
                    Some(href) if !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:") => {
                        let target = Url::parse(&current)
                            .and_then(|base| base.join(&href))
                            .map_err(|e| PomError::NavigationFailed(format!("Cannot resolve {}: {}", href, e)))?;
                        ClickEffect::Navigate(target.to_string())
                    }
                    _ => ClickEffect::None,
                },
                ("input", Some("checkbox")) => {
                    let node = state.node_mut(element)?;
                    if node.remove_attribute("checked").is_none() {
                        node.add_attribute("checked", "checked");
                    }
                    ClickEffect::None
                }
                ("input", Some("radio")) => {
                    if let Some(group) = name {
                        let root = state.live_mut()?;
                        for_each_mut(root, &mut |n| {
                            if n.is_tag("input") && n.get_attribute("name") == Some(&group) {
                                n.remove_attribute("checked");
                            }
                        });
                    }
                    state.node_mut(element)?.add_attribute("checked", "checked");
                    ClickEffect::None
                }
                ("option", _) => {
                    let parent_addr = &addr[..addr.len().saturating_sub(1)];
                    let parent = resolve_mut(state.live_mut()?, parent_addr)
                        .ok_or_else(|| PomError::StaleElement(element.to_string()))?;
                    for sibling in parent.children.iter_mut().filter(|c| c.is_tag("option")) {
                        sibling.remove_attribute("selected");
                    }
                    state.node_mut(element)?.add_attribute("selected", "selected");
                    ClickEffect::None
                }
                _ => ClickEffect::None,
            }
        };

        match effect {
            ClickEffect::Navigate(url) => self.navigate(&url),
            ClickEffect::None => Ok(()),
        }
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let mut state = self.lock();
        let node = state.node_mut(element)?;
        let value = format!("{}{}", node.get_attribute("value").map(String::as_str).unwrap_or(""), text);
        node.add_attribute("value", value);
        if node.is_tag("textarea") {
            node.text_content = node.get_attribute("value").cloned();
        }
        Ok(())
    }

    fn clear(&self, element: &ElementHandle) -> Result<()> {
        let mut state = self.lock();
        let node = state.node_mut(element)?;
        node.add_attribute("value", "");
        if node.is_tag("textarea") {
            node.text_content = None;
        }
        Ok(())
    }

    fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        Ok(self.lock().node(element)?.is_visible)
    }

    fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        Ok(!self.lock().node(element)?.has_attribute("disabled"))
    }

    fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        let state = self.lock();
        let node = state.node(element)?;
        Ok(node.has_attribute("checked") || node.has_attribute("selected"))
    }

    fn execute_script(&self, script: &str, _args: &[serde_json::Value]) -> Result<serde_json::Value> {
        Err(PomError::Unsupported(format!("snapshot driver cannot run scripts: {}", script)))
    }

    fn switch_to_frame(&self, frame: &ElementHandle) -> Result<()> {
        let mut state = self.lock();
        let addr = state.addr_of(frame)?;
        let node = resolve(state.live()?, &addr).ok_or_else(|| PomError::StaleElement(frame.to_string()))?;
        if !node.is_tag("iframe") && !node.is_tag("frame") {
            return Err(PomError::FrameSwitchFailed(format!("<{}> is not a frame", node.tag_name)));
        }
        if node.frame_document.is_none() {
            return Err(PomError::FrameSwitchFailed("frame has no document".to_string()));
        }
        state.frames.push(addr);
        Ok(())
    }

    fn switch_to_parent_frame(&self) -> Result<()> {
        self.lock().frames.pop();
        Ok(())
    }

    fn switch_to_default_content(&self) -> Result<()> {
        self.lock().frames.clear();
        Ok(())
    }

    fn cookies(&self) -> Result<Vec<CookieRecord>> {
        Ok(self.lock().cookies.clone())
    }

    fn add_cookie(&self, cookie: &CookieRecord) -> Result<()> {
        let mut state = self.lock();
        let host = state.current.as_deref().and_then(|url| Url::parse(url).ok()?.host_str().map(str::to_string));
        if let Some(host) = host {
            if !domain_matches(&host, &cookie.domain) {
                return Err(PomError::CookieRejected {
                    name: cookie.name.clone(),
                    reason: format!("domain '{}' does not match {}", cookie.domain, host),
                });
            }
        }
        state
            .cookies
            .retain(|c| !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path));
        state.cookies.push(cookie.clone());
        Ok(())
    }

    fn document_ready(&self) -> Result<bool> {
        Ok(self.lock().live.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_page() -> ElementNode {
        ElementNode::new("body").with_children(vec![
            ElementNode::new("input").with_attribute("id", "user").with_attribute("type", "text"),
            ElementNode::new("input").with_attribute("id", "remember").with_attribute("type", "checkbox"),
            ElementNode::new("select").with_attribute("id", "lang").with_children(vec![
                ElementNode::new("option").with_attribute("value", "en").with_text("English"),
                ElementNode::new("option").with_attribute("value", "de").with_text("Deutsch"),
            ]),
            ElementNode::new("a").with_attribute("id", "about").with_attribute("href", "/about"),
            ElementNode::new("a").with_attribute("id", "top").with_attribute("href", "#top"),
        ])
    }

    fn driver() -> SnapshotDriver {
        let driver = SnapshotDriver::new()
            .with_page("https://example.com/", "Login", login_page())
            .with_page("https://example.com/about", "About us", ElementNode::new("body"));
        driver.navigate("https://example.com/").unwrap();
        driver
    }

    fn by_id(driver: &SnapshotDriver, id: &str) -> ElementHandle {
        driver.find_elements(&By::Id(id.into())).unwrap().remove(0)
    }

    #[test]
    fn test_find_in_document_order() {
        let driver = driver();
        let inputs = driver.find_elements(&By::TagName("input".into())).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(driver.attribute(&inputs[0], "id").unwrap().as_deref(), Some("user"));
        assert_eq!(driver.attribute(&inputs[1], "id").unwrap().as_deref(), Some("remember"));
    }

    #[test]
    fn test_same_element_same_handle() {
        let driver = driver();
        let first = by_id(&driver, "user");
        let again = driver.find_elements(&By::HasAttribute("id".into())).unwrap();
        assert!(again.contains(&first));
    }

    #[test]
    fn test_typing_and_clearing() {
        let driver = driver();
        let user = by_id(&driver, "user");
        driver.send_keys(&user, "ada").unwrap();
        driver.send_keys(&user, "!").unwrap();
        assert_eq!(driver.attribute(&user, "value").unwrap().as_deref(), Some("ada!"));

        driver.clear(&user).unwrap();
        assert_eq!(driver.attribute(&user, "value").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_checkbox_toggles() {
        let driver = driver();
        let remember = by_id(&driver, "remember");
        assert!(!driver.is_selected(&remember).unwrap());
        driver.click(&remember).unwrap();
        assert!(driver.is_selected(&remember).unwrap());
        driver.click(&remember).unwrap();
        assert!(!driver.is_selected(&remember).unwrap());
    }

    #[test]
    fn test_option_click_selects() {
        let driver = driver();
        let lang = by_id(&driver, "lang");
        let options = driver.find_within(&lang, &By::TagName("option".into())).unwrap();
        driver.click(&options[1]).unwrap();
        assert!(driver.is_selected(&options[1]).unwrap());
        driver.click(&options[0]).unwrap();
        assert!(!driver.is_selected(&options[1]).unwrap());
    }

    #[test]
    fn test_link_click_navigates_and_stales_handles() {
        let driver = driver();
        let user = by_id(&driver, "user");
        let about = by_id(&driver, "about");

        driver.click(&about).unwrap();

        assert_eq!(driver.current_url().unwrap(), "https://example.com/about");
        assert_eq!(driver.title().unwrap(), "About us");
        assert!(driver.attribute(&user, "id").unwrap_err().is_stale());
    }

    #[test]
    fn test_fragment_link_stays() {
        let driver = driver();
        let top = by_id(&driver, "top");
        driver.click(&top).unwrap();
        assert_eq!(driver.current_url().unwrap(), "https://example.com/");
    }

    #[test]
    fn test_navigation_resets_state() {
        let driver = driver();
        let user = by_id(&driver, "user");
        driver.send_keys(&user, "ada").unwrap();

        driver.navigate("https://example.com/").unwrap();

        let user = by_id(&driver, "user");
        assert_eq!(driver.attribute(&user, "value").unwrap(), None);
    }

    #[test]
    fn test_unknown_page_fails() {
        let driver = driver();
        let err = driver.navigate("https://example.com/missing").unwrap_err();
        assert!(matches!(err, PomError::NavigationFailed(_)));
    }

    #[test]
    fn test_xpath_unsupported() {
        let driver = driver();
        let err = driver.find_elements(&By::XPath("//*".into())).unwrap_err();
        assert!(matches!(err, PomError::Unsupported(_)));
    }

    #[test]
    fn test_from_json_array() {
        let json = r#"[
            {"url": "https://a.test/", "title": "A", "root": {"tag_name": "body", "children": [{"tag_name": "script"}, {"tag_name": "p"}]}},
            {"url": "https://a.test/b", "title": "B", "root": {"tag_name": "body"}}
        ]"#;
        let driver = SnapshotDriver::from_json(json).unwrap();
        driver.navigate("https://a.test/").unwrap();
        assert!(driver.find_elements(&By::TagName("script".into())).unwrap().is_empty());
        driver.navigate("https://a.test/b#section").unwrap();
        assert_eq!(driver.title().unwrap(), "B");
    }

    #[test]
    fn test_cookie_domain_rule() {
        assert!(domain_matches("shop.test", ""));
        assert!(domain_matches("shop.test", "shop.test"));
        assert!(domain_matches("www.shop.test", ".shop.test"));
        assert!(!domain_matches("shop.test", "www.shop.test"));
        assert!(!domain_matches("evilshop.test", "shop.test"));
    }
}
