use crate::{
    collector::{CollectedElement, ElementKey, ElementMap},
    generator::{
        artifact::{ElementField, Operation, PageArtifact},
        locator::{ElementRole, infer_locator, infer_role},
        naming::{self, NameAllocator},
    },
};
use url::Url;

/// Turns collected elements into a [`PageArtifact`]
///
/// Stateless: every emission gets fresh name tables, so nothing leaks
/// between pages or threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageObjectEmitter;

impl PageObjectEmitter {
    pub fn new() -> Self {
        Self
    }

    /// Emit with class and package derived from the source URL
    pub fn emit(&self, page_title: &str, source_url: &str, elements: &ElementMap) -> PageArtifact {
        let class_name = naming::page_class_name(source_url);
        let package = naming::package_from_url(source_url);
        self.emit_named(&class_name, &package, page_title, source_url, elements)
    }

    /// Emit under an explicit class and package
    pub fn emit_named(
        &self,
        class_name: &str,
        package: &str,
        page_title: &str,
        source_url: &str,
        elements: &ElementMap,
    ) -> PageArtifact {
        let mut field_names = NameAllocator::new();
        let mut method_names = NameAllocator::new();

        let fields: Vec<ElementField> = elements
            .iter()
            .map(|(key, element)| {
                self.field_for(key, element, source_url, &mut field_names, &mut method_names)
            })
            .collect();

        log::info!("Generated {} with {} fields from {}", class_name, fields.len(), source_url);

        let title = page_title.trim();
        let title_check = (!title.is_empty()).then(|| title.to_string());
        PageArtifact::new(class_name, package, source_url, title_check, fields)
    }

    fn field_for(
        &self,
        key: &ElementKey,
        element: &CollectedElement,
        source_url: &str,
        field_names: &mut NameAllocator,
        method_names: &mut NameAllocator,
    ) -> ElementField {
        let locator = infer_locator(key);
        let role = infer_role(&element.tag_name, element.input_type.as_deref());
        let name = field_names.allocate(&key.to_string());
        let mut operations = role.operations();

        if role == ElementRole::Link {
            match element.href.as_deref().and_then(|href| navigation_target(href, source_url)) {
                Some(target) => {
                    let method = method_names.reserve(format!("navigateTo{}", target));
                    operations.push(Operation::NavigateTo { target, method });
                }
                None => log::debug!("Link '{}' has no navigable target", key),
            }
        }

        ElementField { name, key: key.clone(), locator, role, operations }
    }
}

/// Class name a link leads to, or `None` when it stays on this document
///
/// Empty hrefs, `javascript:` URLs and anchors into this same document
/// (`#faq`, `index.html#faq` on `index.html`) do not navigate. A plain link
/// to the current page still does.
pub fn navigation_target(href: &str, page_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }

    if let Ok(page) = Url::parse(page_url) {
        if let Ok(target) = page.join(href) {
            if target.fragment().is_some() && same_document(&target, &page) {
                return None;
            }
        }
    }

    Some(naming::target_class_name(href, page_url))
}

fn same_document(a: &Url, b: &Url) -> bool {
    a[..url::Position::AfterQuery] == b[..url::Position::AfterQuery]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{browser::driver::ElementHandle, generator::locator::LocatorKind};

    fn element(tag: &str, input_type: Option<&str>, href: Option<&str>) -> CollectedElement {
        CollectedElement {
            handle: ElementHandle::new(format!("h-{}", tag)),
            tag_name: tag.to_string(),
            input_type: input_type.map(str::to_string),
            href: href.map(str::to_string),
        }
    }

    #[test]
    fn test_navigation_target() {
        let page = "https://example.com/index.html";
        assert_eq!(navigation_target("/about", page), Some("AboutPage".to_string()));
        assert_eq!(navigation_target("#", page), None);
        assert_eq!(navigation_target("#top", page), None);
        assert_eq!(navigation_target("", page), None);
        assert_eq!(navigation_target("JavaScript:void(0)", page), None);
        assert_eq!(navigation_target("index.html#faq", page), None);
        assert_eq!(navigation_target("/", page), Some("HomePage".to_string()));
    }

    #[test]
    fn test_link_to_current_page_navigates() {
        assert_eq!(navigation_target("/about", "https://example.com/about"), Some("AboutPage".to_string()));
        assert_eq!(navigation_target("/", "https://example.com/"), Some("HomePage".to_string()));
        assert_eq!(navigation_target("/about#team", "https://example.com/about"), None);
        assert_eq!(navigation_target("/about?tab=2#team", "https://example.com/about"), Some("AboutPage".to_string()));
    }

    #[test]
    fn test_emit_basic_page() {
        let mut elements = ElementMap::new();
        elements.insert(ElementKey::id("q"), element("input", None, None));
        elements.insert(ElementKey::class("go", "button"), element("button", None, None));
        elements.insert(ElementKey::tag_position("a", 0), element("a", None, Some("/about")));

        let artifact = PageObjectEmitter::new().emit("Search", "https://example.com/", &elements);

        assert_eq!(artifact.class_name(), "HomePage");
        assert_eq!(artifact.package(), "pages.com.example");
        assert_eq!(artifact.title_check(), Some("Search"));
        let names: Vec<&str> = artifact.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["q", "goButton", "a0"]);

        let link = artifact.field("a0").unwrap();
        assert_eq!(link.locator.kind, LocatorKind::Tag);
        assert!(link.supports(&Operation::Click));
        assert_eq!(link.navigation(), Some(("AboutPage", "navigateToAboutPage")));
    }

    #[test]
    fn test_duplicate_targets_get_distinct_methods() {
        let mut elements = ElementMap::new();
        elements.insert(ElementKey::id("nav-about"), element("a", None, Some("/about")));
        elements.insert(ElementKey::id("footer-about"), element("a", None, Some("/about/")));

        let artifact = PageObjectEmitter::new().emit("", "https://example.com/", &elements);

        assert_eq!(artifact.title_check(), None);
        assert_eq!(artifact.fields()[0].navigation().map(|n| n.1), Some("navigateToAboutPage"));
        assert_eq!(artifact.fields()[1].navigation().map(|n| n.1), Some("navigateToAboutPage2"));
    }

    #[test]
    fn test_emit_named_for_popup() {
        let mut elements = ElementMap::new();
        elements.insert(ElementKey::id("ok"), element("button", None, None));

        let artifact = PageObjectEmitter::new().emit_named(
            "PopupLogin",
            "pages.com.example.popups",
            "",
            "https://example.com/",
            &elements,
        );

        assert_eq!(artifact.class_name(), "PopupLogin");
        assert_eq!(artifact.package(), "pages.com.example.popups");
    }
}
