//! Browser drivers and the plumbing shared by every driver
//!
//! [`Driver`] is the seam between page-object generation and a real browser.
//! [`BrowserSession`] drives Chrome/Chromium over the DevTools protocol;
//! [`SnapshotDriver`](crate::dom::SnapshotDriver) replays stored pages.

pub mod config;
pub mod driver;
pub mod frame;
pub mod session;
pub mod wait;

pub use config::{ConnectionOptions, LaunchOptions};
pub use driver::{By, Driver, ElementHandle};
pub use frame::FrameGuard;
pub use session::{BrowserSession, normalize_url};
pub use wait::Wait;
