use crate::{
    browser::{driver::{By, Driver}, wait::Wait},
    collector::ElementCollector,
    error::{PomError, Result},
    generator::{PageArtifact, PageObjectEmitter},
};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use url::Url;

/// Traversal bookkeeping for one crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    /// URLs that were enqueued, fragment stripped; never enqueued twice
    pub visited: IndexSet<String>,
    /// Every same-origin path seen in a link, including past the depth bound
    pub discovered_paths: IndexSet<String>,
    pub frontier: VecDeque<(String, usize)>,
}

impl CrawlState {
    /// Start a crawl at `base`; nothing is queued when `max_depth` is 0
    pub fn new(base: &Url, max_depth: usize) -> Self {
        let mut state = Self::default();
        state.discovered_paths.insert(base.path().to_string());
        if max_depth > 0 {
            state.enqueue(base.to_string(), 0);
        }
        state
    }

    /// Queue `url` unless it was already visited
    pub fn enqueue(&mut self, url: String, depth: usize) -> bool {
        if !self.visited.insert(url.clone()) {
            return false;
        }
        self.frontier.push_back((url, depth));
        true
    }
}

/// A page the crawl gave up on
#[derive(Debug)]
pub struct SkippedPage {
    pub url: String,
    pub depth: usize,
    pub error: PomError,
}

/// Result of a crawl: artifacts by path plus the traversal state
#[derive(Debug)]
pub struct SiteMap {
    pub artifacts: IndexMap<String, PageArtifact>,
    pub state: CrawlState,
    pub skipped: Vec<SkippedPage>,
}

impl SiteMap {
    pub fn visited(&self) -> &IndexSet<String> {
        &self.state.visited
    }

    pub fn discovered_paths(&self) -> &IndexSet<String> {
        &self.state.discovered_paths
    }
}

/// Breadth-first, same-origin crawl that emits one artifact per page
pub struct SiteCrawler {
    collector: ElementCollector,
    emitter: PageObjectEmitter,
    wait: Wait,
    /// Record page titles for the identity check
    title_check: bool,
}

impl Default for SiteCrawler {
    fn default() -> Self {
        Self::new(Wait::default())
    }
}

impl SiteCrawler {
    pub fn new(wait: Wait) -> Self {
        Self { collector: ElementCollector::new(), emitter: PageObjectEmitter::new(), wait, title_check: true }
    }

    /// Builder method: turn the page-title check in emitted artifacts on or off
    pub fn title_check(mut self, enabled: bool) -> Self {
        self.title_check = enabled;
        self
    }

    /// Crawl from `base_url`, generating pages at depth `< max_depth`
    ///
    /// Only an unparsable base URL fails the call; a page that cannot be
    /// loaded or parsed is logged and recorded in [`SiteMap::skipped`].
    pub fn crawl<D: Driver>(&self, driver: &D, base_url: &str, max_depth: usize) -> Result<SiteMap> {
        let mut base = Url::parse(base_url)
            .map_err(|e| PomError::InvalidUrl { url: base_url.to_string(), reason: e.to_string() })?;
        base.set_fragment(None);

        log::info!("Crawling {} to depth {}", base, max_depth);
        let mut state = CrawlState::new(&base, max_depth);
        let mut artifacts = IndexMap::new();
        let mut skipped = Vec::new();

        while let Some((url, depth)) = state.frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }

            match self.visit(driver, &url) {
                Ok((artifact, links)) => {
                    let path = Url::parse(&url).map(|u| u.path().to_string()).unwrap_or_else(|_| url.clone());
                    artifacts.insert(path, artifact);
                    for href in links {
                        self.record_link(&mut state, &base, &url, &href, depth, max_depth);
                    }
                }
                Err(e) => {
                    log::warn!("Skipping {} at depth {}: {}", url, depth, e);
                    skipped.push(SkippedPage { url, depth, error: e });
                }
            }
        }

        log::info!(
            "Crawl finished: {} pages generated, {} paths discovered, {} skipped",
            artifacts.len(),
            state.discovered_paths.len(),
            skipped.len()
        );
        Ok(SiteMap { artifacts, state, skipped })
    }

    fn visit<D: Driver>(&self, driver: &D, url: &str) -> Result<(PageArtifact, Vec<String>)> {
        log::debug!("Visiting {}", url);
        driver.navigate(url)?;
        self.wait.until("document ready", || driver.document_ready())?;

        let elements = self.collector.collect(driver)?;
        let title = if self.title_check { driver.title()? } else { String::new() };
        let source_url = driver.current_url()?;
        let artifact = self.emitter.emit(&title, &source_url, &elements);

        Ok((artifact, page_links(driver)?))
    }

    fn record_link(&self, state: &mut CrawlState, base: &Url, page_url: &str, href: &str, depth: usize, max_depth: usize) {
        let Some(target) = resolve_link(base, page_url, href) else {
            return;
        };

        state.discovered_paths.insert(target.path().to_string());
        if depth + 1 < max_depth && state.enqueue(target.to_string(), depth + 1) {
            log::debug!("Queued {} at depth {}", target, depth + 1);
        }
    }
}

/// Raw `href` of every anchor in the main document
pub fn page_links<D: Driver + ?Sized>(driver: &D) -> Result<Vec<String>> {
    driver.switch_to_default_content()?;
    let mut links = Vec::new();
    for anchor in driver.find_elements(&By::TagName("a".to_string()))? {
        match driver.attribute(&anchor, "href") {
            Ok(Some(href)) => links.push(href),
            Ok(None) => {}
            Err(e) if e.is_element_local() => log::debug!("Skipping anchor: {}", e),
            Err(e) => return Err(e),
        }
    }
    Ok(links)
}

/// Resolve a link for crawling; `None` when it is not a same-origin page
pub fn resolve_link(base: &Url, page_url: &str, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }

    let page = Url::parse(page_url).unwrap_or_else(|_| base.clone());
    let mut target = page.join(href).ok()?;
    if target.origin() != base.origin() {
        return None;
    }
    target.set_fragment(None);
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_resolve_link_filters() {
        let page = "https://example.com/docs/";
        assert_eq!(resolve_link(&base(), page, "intro").unwrap().as_str(), "https://example.com/docs/intro");
        assert_eq!(resolve_link(&base(), page, "/a#b").unwrap().as_str(), "https://example.com/a");
        assert!(resolve_link(&base(), page, "").is_none());
        assert!(resolve_link(&base(), page, "#top").is_none());
        assert!(resolve_link(&base(), page, "javascript:void(0)").is_none());
        assert!(resolve_link(&base(), page, "https://other.org/").is_none());
        assert!(resolve_link(&base(), page, "http://example.com/").is_none());
        assert!(resolve_link(&base(), page, "mailto:hi@example.com").is_none());
    }

    #[test]
    fn test_enqueue_once() {
        let mut state = CrawlState::new(&base(), 2);
        assert!(!state.enqueue("https://example.com/".to_string(), 1));
        assert!(state.enqueue("https://example.com/b".to_string(), 1));
        assert_eq!(state.frontier.len(), 2);
        assert_eq!(state.discovered_paths.len(), 1);
    }

    #[test]
    fn test_zero_depth_visits_nothing() {
        let driver = crate::dom::SnapshotDriver::new()
            .with_page("https://example.com/", "Home", crate::dom::ElementNode::new("body"));

        let site = SiteCrawler::default().crawl(&driver, "https://example.com/", 0).unwrap();

        assert!(site.visited().is_empty());
        assert!(site.state.frontier.is_empty());
        assert!(site.artifacts.is_empty());
        assert!(driver.history().is_empty());
        let paths: Vec<&str> = site.discovered_paths().iter().map(String::as_str).collect();
        assert_eq!(paths, vec!["/"]);
    }

    #[test]
    fn test_bad_base_url() {
        let driver = crate::dom::SnapshotDriver::new();
        let err = SiteCrawler::default().crawl(&driver, "not a url", 2).unwrap_err();
        assert!(matches!(err, PomError::InvalidUrl { .. }));
    }
}
