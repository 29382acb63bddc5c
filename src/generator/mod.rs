//! Turning collected elements into page objects
//!
//! The [`PageObjectEmitter`] names fields and assigns operations, producing a
//! [`PageArtifact`]. Artifacts serialize to JSON, bind at runtime through
//! [`LivePage`](crate::page::LivePage), and render to Rust source with
//! [`render_rust`].

pub mod artifact;
pub mod emitter;
pub mod locator;
pub mod naming;
pub mod render;

pub use artifact::{ElementField, Operation, PageArtifact, Readiness};
pub use emitter::{PageObjectEmitter, navigation_target};
pub use locator::{ElementRole, LocatorKind, LocatorSpec, infer_locator, infer_role};
pub use naming::NameAllocator;
pub use render::{render_rust, write_source};
