use crate::{
    browser::driver::{By, Driver, ElementHandle},
    collector::{CollectedElement, key::ElementKey},
    error::Result,
};

/// Tags the positional fallback considers interactive
pub const INTERACTIVE_TAGS: [&str; 6] = ["a", "button", "input", "select", "textarea", "form"];

/// One tier of the collection chain
///
/// A strategy reports every element it can key, in document order. The
/// collector decides which of them are still unclaimed.
pub trait CollectionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn collect(&self, driver: &dyn Driver) -> Result<Vec<Keyed>>;
}

/// A key paired with the element it names
pub type Keyed = (ElementKey, CollectedElement);

/// Key each element in turn; element-local failures skip the element
fn collect_keyed<F>(strategy: &str, elements: Vec<ElementHandle>, mut key_for: F) -> Result<Vec<Keyed>>
where
    F: FnMut(usize, &ElementHandle) -> Result<Option<Keyed>>,
{
    let mut found = Vec::new();
    for (index, element) in elements.iter().enumerate() {
        match key_for(index, element) {
            Ok(Some(entry)) => found.push(entry),
            Ok(None) => {}
            Err(e) if e.is_element_local() => {
                log::debug!("{} strategy skipped an element: {}", strategy, e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(found)
}

/// Non-empty, trimmed attribute value
fn non_empty_attribute(driver: &dyn Driver, element: &ElementHandle, name: &str) -> Result<Option<String>> {
    Ok(driver
        .attribute(element, name)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

/// Read the metadata emission needs while the element is reachable
pub fn describe(driver: &dyn Driver, element: &ElementHandle) -> Result<CollectedElement> {
    let tag_name = driver.tag_name(element)?.to_ascii_lowercase();
    let input_type = if tag_name == "input" {
        driver.attribute(element, "type")?.map(|t| t.trim().to_ascii_lowercase())
    } else {
        None
    };
    let href = if tag_name == "a" { driver.attribute(element, "href")? } else { None };

    Ok(CollectedElement { handle: element.clone(), tag_name, input_type, href })
}

/// Elements keyed by their `id`
#[derive(Debug, Default, Clone, Copy)]
pub struct IdStrategy;

impl CollectionStrategy for IdStrategy {
    fn name(&self) -> &str {
        "id"
    }

    fn collect(&self, driver: &dyn Driver) -> Result<Vec<Keyed>> {
        let elements = driver.find_elements(&By::HasAttribute("id".to_string()))?;
        collect_keyed(self.name(), elements, |_, element| {
            let Some(id) = non_empty_attribute(driver, element, "id")? else {
                return Ok(None);
            };
            Ok(Some((ElementKey::Id(id), describe(driver, element)?)))
        })
    }
}

/// Elements keyed by their `name` attribute
#[derive(Debug, Default, Clone, Copy)]
pub struct NameStrategy;

impl CollectionStrategy for NameStrategy {
    fn name(&self) -> &str {
        "name"
    }

    fn collect(&self, driver: &dyn Driver) -> Result<Vec<Keyed>> {
        let elements = driver.find_elements(&By::HasAttribute("name".to_string()))?;
        collect_keyed(self.name(), elements, |_, element| {
            let Some(name) = non_empty_attribute(driver, element, "name")? else {
                return Ok(None);
            };
            Ok(Some((ElementKey::Name(name), describe(driver, element)?)))
        })
    }
}

/// Elements keyed by their first class token and tag
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassStrategy;

impl CollectionStrategy for ClassStrategy {
    fn name(&self) -> &str {
        "class"
    }

    fn collect(&self, driver: &dyn Driver) -> Result<Vec<Keyed>> {
        let elements = driver.find_elements(&By::HasAttribute("class".to_string()))?;
        collect_keyed(self.name(), elements, |_, element| {
            let class = non_empty_attribute(driver, element, "class")?
                .and_then(|classes| classes.split_whitespace().next().map(str::to_string));
            let Some(class) = class else {
                return Ok(None);
            };
            let described = describe(driver, element)?;
            Ok(Some((ElementKey::class(class, described.tag_name.clone()), described)))
        })
    }
}

/// Interactive elements with neither id nor class, keyed by position
///
/// The index counts every element of the tag in document order, so it
/// stays a stable way back to the element even when some of those
/// elements were keyed by an earlier tier.
#[derive(Debug, Clone)]
pub struct TagStrategy {
    tags: Vec<String>,
}

impl TagStrategy {
    pub fn new(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { tags: tags.into_iter().map(Into::into).collect() }
    }
}

impl Default for TagStrategy {
    fn default() -> Self {
        Self::new(INTERACTIVE_TAGS)
    }
}

impl CollectionStrategy for TagStrategy {
    fn name(&self) -> &str {
        "tag"
    }

    fn collect(&self, driver: &dyn Driver) -> Result<Vec<Keyed>> {
        let mut found = Vec::new();
        for tag in &self.tags {
            let elements = driver.find_elements(&By::TagName(tag.clone()))?;
            found.extend(collect_keyed(self.name(), elements, |index, element| {
                if non_empty_attribute(driver, element, "id")?.is_some()
                    || non_empty_attribute(driver, element, "class")?.is_some()
                {
                    return Ok(None);
                }
                Ok(Some((ElementKey::tag_position(tag.as_str(), index), describe(driver, element)?)))
            })?);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, SnapshotDriver};

    fn driver(root: ElementNode) -> SnapshotDriver {
        let driver = SnapshotDriver::new().with_page("https://example.com/", "Test", root);
        driver.navigate("https://example.com/").unwrap();
        driver
    }

    fn keys(found: &[Keyed]) -> Vec<String> {
        found.iter().map(|(k, _)| k.to_string()).collect()
    }

    #[test]
    fn test_id_strategy_skips_blank_ids() {
        let driver = driver(ElementNode::new("body").with_children(vec![
            ElementNode::new("input").with_attribute("id", "q"),
            ElementNode::new("div").with_attribute("id", "  "),
        ]));

        let found = IdStrategy.collect(&driver).unwrap();
        assert_eq!(keys(&found), vec!["q"]);
        assert_eq!(found[0].1.tag_name, "input");
    }

    #[test]
    fn test_class_strategy_uses_first_token() {
        let driver = driver(ElementNode::new("body").with_children(vec![
            ElementNode::new("button").with_attribute("class", "go primary"),
        ]));

        let found = ClassStrategy.collect(&driver).unwrap();
        assert_eq!(keys(&found), vec!["go_button"]);
    }

    #[test]
    fn test_tag_strategy_indexes_by_document_order() {
        let driver = driver(ElementNode::new("body").with_children(vec![
            ElementNode::new("input").with_attribute("id", "first"),
            ElementNode::new("input").with_attribute("type", "checkbox"),
            ElementNode::new("p"),
        ]));

        let found = TagStrategy::default().collect(&driver).unwrap();
        assert_eq!(keys(&found), vec!["input_1"]);
        assert_eq!(found[0].1.input_type.as_deref(), Some("checkbox"));
    }

    #[test]
    fn test_describe_reads_link_target() {
        let driver = driver(ElementNode::new("body").with_children(vec![
            ElementNode::new("a").with_attribute("href", "/about"),
        ]));

        let link = driver.find_elements(&By::TagName("a".into())).unwrap().remove(0);
        let described = describe(&driver, &link).unwrap();
        assert_eq!(described.href.as_deref(), Some("/about"));
        assert_eq!(described.input_type, None);
    }
}
