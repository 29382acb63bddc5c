//! Element collection
//!
//! Collection walks the current page with a fixed chain of strategies
//! (id, name, class, positional tag) and then repeats the chain inside each
//! top-level iframe. An element is keyed by the first strategy that can key
//! it; later strategies never re-key a claimed element.

pub mod key;
pub mod strategy;

use crate::{
    browser::{driver::{By, Driver, ElementHandle}, frame::FrameGuard},
    error::{PomError, Result},
};
use indexmap::IndexMap;
use std::collections::HashSet;

pub use key::ElementKey;
pub use strategy::{ClassStrategy, CollectionStrategy, IdStrategy, NameStrategy, TagStrategy};

/// A live element together with the metadata read when it was collected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedElement {
    pub handle: ElementHandle,
    /// Lowercase tag name
    pub tag_name: String,
    /// Lowercase `type` attribute, read for `<input>` only
    pub input_type: Option<String>,
    /// Raw `href` attribute, read for `<a>` only
    pub href: Option<String>,
}

/// Keyed elements of one collection pass, in insertion order
///
/// Inserting an existing key replaces the element but keeps the key's
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementMap {
    entries: IndexMap<ElementKey, CollectedElement>,
}

impl ElementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an element, returning the one it replaced
    pub fn insert(&mut self, key: ElementKey, element: CollectedElement) -> Option<CollectedElement> {
        self.entries.insert(key, element)
    }

    pub fn get(&self, key: &ElementKey) -> Option<&CollectedElement> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &ElementKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ElementKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ElementKey, &CollectedElement)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Insert, logging when an earlier element loses its key
    fn insert_logged(&mut self, key: ElementKey, element: CollectedElement) {
        if let Some(previous) = self.entries.insert(key.clone(), element) {
            log::debug!("Key '{}' collided; {} replaced by a later element", key, previous.handle);
        }
    }
}

impl IntoIterator for ElementMap {
    type Item = (ElementKey, CollectedElement);
    type IntoIter = indexmap::map::IntoIter<ElementKey, CollectedElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ElementMap {
    type Item = (&'a ElementKey, &'a CollectedElement);
    type IntoIter = indexmap::map::Iter<'a, ElementKey, CollectedElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Runs the strategy chain over a page and its iframes
pub struct ElementCollector {
    strategies: Vec<Box<dyn CollectionStrategy>>,
}

impl Default for ElementCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementCollector {
    /// The standard chain: id, name, class, then positional tag
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Box::new(IdStrategy),
            Box::new(NameStrategy),
            Box::new(ClassStrategy),
            Box::new(TagStrategy::default()),
        ])
    }

    /// A collector with a custom chain, tried in order
    pub fn with_strategies(strategies: Vec<Box<dyn CollectionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Collect the current page, then each top-level iframe
    ///
    /// A failing iframe is logged and skipped. Any other failure aborts the
    /// pass with [`PomError::ParsingFailed`] carrying the cause.
    pub fn collect<D: Driver>(&self, driver: &D) -> Result<ElementMap> {
        let url = driver.current_url().map_err(|e| PomError::parsing("<no page>", e))?;
        log::debug!("Collecting elements on {}", url);

        let elements = self.collect_page(driver).map_err(|e| PomError::parsing(url.as_str(), e))?;
        log::info!("Collected {} elements on {}", elements.len(), url);
        Ok(elements)
    }

    fn collect_page(&self, driver: &dyn Driver) -> Result<ElementMap> {
        driver.switch_to_default_content()?;

        let mut elements = ElementMap::new();
        self.collect_document(driver, &mut elements)?;

        let frames = driver.find_elements(&By::TagName("iframe".to_string()))?;
        for (index, frame) in frames.iter().enumerate() {
            driver.switch_to_default_content()?;
            match self.collect_frame(driver, frame) {
                Ok(inner) => {
                    log::debug!("Iframe {} yielded {} elements", index, inner.len());
                    for (key, element) in inner {
                        elements.insert_logged(key.in_frame(index), element);
                    }
                }
                Err(e) => log::warn!("Skipping iframe {}: {}", index, e),
            }
        }

        driver.switch_to_default_content()?;
        Ok(elements)
    }

    fn collect_frame(&self, driver: &dyn Driver, frame: &ElementHandle) -> Result<ElementMap> {
        let guard = FrameGuard::enter(driver, frame)?;
        let mut inner = ElementMap::new();
        self.collect_document(guard.driver(), &mut inner)?;
        guard.exit()?;
        Ok(inner)
    }

    fn collect_document(&self, driver: &dyn Driver, elements: &mut ElementMap) -> Result<()> {
        let mut claimed: HashSet<ElementHandle> = HashSet::new();

        for strategy in &self.strategies {
            let found = strategy.collect(driver)?;
            let mut kept = 0;
            for (key, element) in found {
                if !claimed.insert(element.handle.clone()) {
                    continue;
                }
                elements.insert_logged(key, element);
                kept += 1;
            }
            log::debug!("{} strategy keyed {} elements", strategy.name(), kept);
        }
        Ok(())
    }

    /// Collect the descendants of `root` that carry an id or a class
    ///
    /// Used for popups and dialogs, where positional keys would not survive
    /// the dialog being re-rendered.
    pub fn collect_within<D: Driver>(&self, driver: &D, root: &ElementHandle) -> Result<ElementMap> {
        let driver: &dyn Driver = driver;
        let mut elements = ElementMap::new();

        for element in driver.find_within(root, &By::Any)? {
            match Self::subtree_key(driver, &element) {
                Ok(Some((key, collected))) => elements.insert_logged(key, collected),
                Ok(None) => {}
                Err(e) if e.is_element_local() => log::debug!("Skipping popup element: {}", e),
                Err(e) => return Err(e),
            }
        }
        Ok(elements)
    }

    fn subtree_key(driver: &dyn Driver, element: &ElementHandle) -> Result<Option<strategy::Keyed>> {
        let described = strategy::describe(driver, element)?;
        let id = driver.attribute(element, "id")?.filter(|v| !v.trim().is_empty());
        if let Some(id) = id {
            return Ok(Some((ElementKey::Id(id.trim().to_string()), described)));
        }

        let class = driver
            .attribute(element, "class")?
            .and_then(|c| c.split_whitespace().next().map(str::to_string));
        Ok(class.map(|class| (ElementKey::class(class, described.tag_name.clone()), described)))
    }
}
