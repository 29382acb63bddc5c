//! Stored DOM snapshots
//!
//! - ElementNode: one element of a captured page
//! - SnapshotPage: a captured page with its URL and title
//! - SnapshotDriver: a [`Driver`](crate::browser::Driver) that replays snapshots offline

pub mod element;
pub mod snapshot;

pub use element::ElementNode;
pub use snapshot::{SnapshotDriver, SnapshotPage};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_page_from_json() {
        let page: SnapshotPage = serde_json::from_str(
            r#"{"url": "https://a.test/", "root": {"tag_name": "body", "children": [{"tag_name": "input", "attributes": {"id": "q"}}]}}"#,
        )
        .unwrap();

        assert_eq!(page.title, "");
        assert_eq!(page.root.children[0].id(), Some(&"q".to_string()));
        assert!(page.root.children[0].is_visible);
    }
}
