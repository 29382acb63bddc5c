//! # pom-gen
//!
//! A Rust library that generates page objects from live web pages, driving Chrome/Chromium
//! via the Chrome DevTools Protocol (CDP).
//!
//! ## Features
//!
//! - **Element Collection**: Key every interactive element by id, name, class or position, iframes included
//! - **Page Objects**: Named fields with role-specific operations (set value, check, select, navigate, ...)
//! - **Site Crawling**: Breadth-first, same-origin crawl that generates one page object per page
//! - **Rust Output**: Render page objects to Rust modules that run against any [`Driver`]
//! - **Cookie Persistence**: Save and restore a session's cookies in a flat line format
//! - **Offline Mode**: Replay stored DOM snapshots through [`SnapshotDriver`] with no browser at all
//!
//! ## Command Line
//!
//! ```bash
//! # Generate the page object for one page
//! cargo run --bin pom-gen -- page https://example.com/login --out generated
//!
//! # Crawl two levels deep and write every page object
//! cargo run --bin pom-gen -- crawl https://example.com --depth 2 --out generated
//! ```
//!
//! ## Library Usage
//!
//! ### Generating a Page Object
//!
//! ```rust,no_run
//! use pom_gen::{BrowserSession, Driver, LaunchOptions, PageParser};
//!
//! # fn main() -> pom_gen::Result<()> {
//! let session = BrowserSession::launch(LaunchOptions::default())?;
//! session.navigate("https://example.com/login")?;
//!
//! let parser = PageParser::new(&session);
//! let artifact = parser.generate()?;
//! println!("{} has {} fields", artifact.class_name(), artifact.len());
//!
//! // Rust source for the page object
//! println!("{}", pom_gen::render_rust(&artifact)?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Crawling a Site
//!
//! ```rust,no_run
//! # use pom_gen::{BrowserSession, LaunchOptions, PageParser};
//! # fn main() -> pom_gen::Result<()> {
//! # let session = BrowserSession::launch(LaunchOptions::default())?;
//! let parser = PageParser::new(&session);
//! let written = parser.save_all("generated", "https://example.com", 2)?;
//! println!("Wrote {} files", written.len());
//! # Ok(())
//! # }
//! ```
//!
//! ### Using a Page Object
//!
//! ```rust,no_run
//! # use pom_gen::{BrowserSession, Driver, LaunchOptions, LivePage, PageParser};
//! # fn main() -> pom_gen::Result<()> {
//! # let session = BrowserSession::launch(LaunchOptions::default())?;
//! # session.navigate("https://example.com/login")?;
//! # let artifact = PageParser::new(&session).generate()?;
//! // Fails fast when the browser is not on the page the artifact describes
//! let page = LivePage::bind(&session, artifact)?;
//! page.set_value("username", "alice")?;
//! page.click("submitButton")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: The [`Driver`] seam, the Chrome session, frames and waits
//! - [`dom`]: Stored DOM snapshots and the offline driver
//! - [`collector`]: Element keys and the collection strategy chain
//! - [`generator`]: Locators, roles, naming, artifacts and Rust rendering
//! - [`page`]: Executing artifact operations against a live page
//! - [`crawler`]: Breadth-first site crawl
//! - [`cookies`]: Cookie persistence
//! - [`parser`]: The [`PageParser`] facade - **Start here**
//! - [`error`]: Error types and result aliases

pub mod browser;
pub mod collector;
pub mod config;
pub mod cookies;
pub mod crawler;
pub mod dom;
pub mod error;
pub mod generator;
pub mod page;
pub mod parser;

pub use browser::{BrowserSession, By, ConnectionOptions, Driver, ElementHandle, FrameGuard, LaunchOptions, Wait};
pub use collector::{CollectedElement, ElementCollector, ElementKey, ElementMap};
pub use config::GeneratorOptions;
pub use cookies::{CookieRecord, CookieStore};
pub use crawler::{SiteCrawler, SiteMap};
pub use dom::{ElementNode, SnapshotDriver, SnapshotPage};
pub use error::{PomError, Result};
pub use generator::{
    ElementField, ElementRole, LocatorKind, LocatorSpec, Operation, PageArtifact, PageObjectEmitter, render_rust,
    write_source,
};
pub use page::LivePage;
pub use parser::PageParser;
