//! One-stop facade over collection, emission, crawling and cookies

use crate::{
    browser::driver::{By, Driver},
    collector::{ElementCollector, ElementMap},
    config::GeneratorOptions,
    cookies::{CookieStore, LoadReport, SaveReport},
    crawler::{SiteCrawler, SiteMap},
    error::{PomError, Result},
    generator::{
        PageArtifact, PageObjectEmitter,
        naming::{capitalize, normalize_field_name, package_from_url},
        write_source,
    },
};
use std::{collections::HashSet, path::{Path, PathBuf}, sync::{Mutex, MutexGuard, PoisonError}};

/// Generates page objects from whatever page `driver` is showing
///
/// The parser keeps the elements of the last [`parse_page`](Self::parse_page)
/// call; [`generate`](Self::generate) reuses them and only parses when
/// nothing has been collected yet.
pub struct PageParser<'d, D: Driver> {
    driver: &'d D,
    options: GeneratorOptions,
    collector: ElementCollector,
    emitter: PageObjectEmitter,
    cookies: CookieStore,
    elements: Mutex<ElementMap>,
}

impl<'d, D: Driver> PageParser<'d, D> {
    pub fn new(driver: &'d D) -> Self {
        Self::with_options(driver, GeneratorOptions::default())
    }

    pub fn with_options(driver: &'d D, options: GeneratorOptions) -> Self {
        Self {
            driver,
            options,
            collector: ElementCollector::new(),
            emitter: PageObjectEmitter::new(),
            cookies: CookieStore::new(),
            elements: Mutex::new(ElementMap::new()),
        }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn driver(&self) -> &'d D {
        self.driver
    }

    fn stored(&self) -> MutexGuard<'_, ElementMap> {
        self.elements.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Collect the current page, replacing any earlier result
    ///
    /// Returns the number of elements collected.
    pub fn parse_page(&self) -> Result<usize> {
        let collected = self.collector.collect(self.driver)?;
        let count = collected.len();
        *self.stored() = collected;
        Ok(count)
    }

    /// Elements from the last parse
    pub fn elements(&self) -> ElementMap {
        self.stored().clone()
    }

    /// Build the artifact for the current page
    pub fn generate(&self) -> Result<PageArtifact> {
        if self.stored().is_empty() {
            self.parse_page()?;
        }

        let url = self.driver.current_url()?;
        let title = if self.options.verify_title {
            self.driver.title().map_err(|e| PomError::generation(url.as_str(), e))?
        } else {
            String::new()
        };

        Ok(self.emitter.emit(&title, &url, &self.stored()))
    }

    fn crawler(&self) -> SiteCrawler {
        SiteCrawler::new(self.options.wait()).title_check(self.options.verify_title)
    }

    /// Crawl from `base_url` and build one artifact per same-origin page
    ///
    /// Pages are generated at depths `0..max_depth`.
    pub fn generate_for_all_paths(&self, base_url: &str, max_depth: usize) -> Result<SiteMap> {
        self.crawler().crawl(self.driver, base_url, max_depth)
    }

    /// Crawl from `base_url` and write every artifact as Rust source under `dir`
    ///
    /// Two pages mapping to the same file keep the later page.
    pub fn save_all(&self, dir: impl AsRef<Path>, base_url: &str, max_depth: usize) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let site = self.generate_for_all_paths(base_url, max_depth)?;

        let mut written = Vec::with_capacity(site.artifacts.len());
        let mut seen = HashSet::new();
        for (path, artifact) in &site.artifacts {
            let file = write_source(dir, artifact)?;
            if !seen.insert(file.clone()) {
                log::warn!("Page {} overwrote {}", path, file.display());
                continue;
            }
            written.push(file);
        }

        log::info!("Saved {} page objects under {}", written.len(), dir.display());
        Ok(written)
    }

    /// Build an artifact for the popup or dialog with id `popup_id`
    ///
    /// Waits for the popup to become visible, then keys every descendant that
    /// has an id or a class.
    pub fn handle_popup(&self, popup_id: &str) -> Result<PageArtifact> {
        let by = By::Id(popup_id.to_string());
        let popup = self.options.wait().until_some(&format!("popup '{}' visible", popup_id), || {
            for element in self.driver.find_elements(&by)? {
                if self.driver.is_displayed(&element)? {
                    return Ok(Some(element));
                }
            }
            Ok(None)
        })?;

        let url = self.driver.current_url()?;
        let elements = self
            .collector
            .collect_within(self.driver, &popup)
            .map_err(|e| PomError::parsing(url.as_str(), e))?;

        let class_name = format!("Popup{}", capitalize(&normalize_field_name(popup_id)));
        let package = format!("{}.popups", package_from_url(&url));
        Ok(self.emitter.emit_named(&class_name, &package, "", &url, &elements))
    }

    pub fn save_cookies(&self, destination: impl AsRef<Path>) -> Result<SaveReport> {
        self.cookies.save(self.driver, destination)
    }

    pub fn load_cookies(&self, source: impl AsRef<Path>) -> Result<LoadReport> {
        self.cookies.load(self.driver, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, SnapshotDriver};
    use std::time::Duration;

    fn login_page() -> ElementNode {
        ElementNode::new("body").with_children(vec![
            ElementNode::new("input").with_attribute("id", "user"),
            ElementNode::new("button").with_attribute("class", "primary").with_text("Sign in"),
            ElementNode::new("div").with_attribute("id", "terms-dialog").with_children(vec![
                ElementNode::new("input").with_attribute("type", "checkbox").with_attribute("id", "agree"),
                ElementNode::new("button").with_attribute("class", "ok wide").with_text("OK"),
                ElementNode::new("span").with_text("unkeyed"),
            ]),
            ElementNode::new("div")
                .with_attribute("id", "hidden-dialog")
                .with_visibility(false),
        ])
    }

    fn driver() -> SnapshotDriver {
        let driver = SnapshotDriver::new().with_page("https://shop.test/login", "Sign in", login_page());
        driver.navigate("https://shop.test/login").unwrap();
        driver
    }

    fn quick() -> GeneratorOptions {
        GeneratorOptions::new().timeout(Duration::from_millis(200)).poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn test_generate_parses_on_demand() {
        let driver = driver();
        let parser = PageParser::new(&driver);
        assert!(parser.elements().is_empty());

        let artifact = parser.generate().unwrap();

        assert!(!parser.elements().is_empty());
        assert_eq!(artifact.class_name(), "LoginPage");
        assert_eq!(artifact.title_check(), Some("Sign in"));
        assert!(artifact.field("user").is_some());
        assert!(artifact.field("primaryButton").is_some());
    }

    #[test]
    fn test_generate_without_title_check() {
        let driver = driver();
        let parser = PageParser::with_options(&driver, quick().verify_title(false));

        let artifact = parser.generate().unwrap();

        assert_eq!(artifact.title_check(), None);
    }

    #[test]
    fn test_parse_page_replaces_elements() {
        let driver = driver();
        let parser = PageParser::new(&driver);

        let first = parser.parse_page().unwrap();
        let second = parser.parse_page().unwrap();

        assert_eq!(first, second);
        assert_eq!(parser.elements().len(), second);
    }

    #[test]
    fn test_parse_page_from_threads() {
        let driver = driver();
        let parser = PageParser::new(&driver);
        let expected = PageParser::new(&driver).parse_page().unwrap();

        let counts: Vec<usize> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..4).map(|_| s.spawn(|| parser.parse_page().unwrap())).collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert!(counts.iter().all(|&n| n == expected));
        let elements = parser.elements();
        assert_eq!(elements.len(), expected);
        let keys: Vec<String> = elements.iter().map(|(key, _)| key.to_string()).collect();
        assert!(keys.contains(&"user".to_string()));
        assert_eq!(parser.generate().unwrap().len(), expected);
    }

    #[test]
    fn test_handle_popup() {
        let driver = driver();
        let parser = PageParser::with_options(&driver, quick());

        let popup = parser.handle_popup("terms-dialog").unwrap();

        assert_eq!(popup.class_name(), "PopupTermsDialog");
        assert!(popup.package().ends_with(".popups"));
        assert!(popup.package().starts_with(&package_from_url("https://shop.test/login")));
        assert_eq!(popup.title_check(), None);
        let names: Vec<&str> = popup.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["agree", "okButton"]);
    }

    #[test]
    fn test_handle_popup_times_out_when_hidden() {
        let driver = driver();
        let parser = PageParser::with_options(&driver, quick());

        let err = parser.handle_popup("hidden-dialog").unwrap_err();

        assert!(err.is_timeout());
    }

    #[test]
    fn test_handle_popup_missing() {
        let driver = driver();
        let parser = PageParser::with_options(&driver, quick());

        assert!(parser.handle_popup("nope").unwrap_err().is_timeout());
    }
}
