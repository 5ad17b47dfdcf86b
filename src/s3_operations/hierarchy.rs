// hierarchy.rs
//
// Folder-tree synthesis over a flat key namespace. Folders exist in two
// forms: explicit zero-byte marker objects (key ends with '/') and folders
// implied by the path of a file. Both are collected as separate path sets
// and merged once, so the dedup invariant stays auditable.

use crate::s3_operations::store::{list_all, ObjectStoreClient, StorageEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
}

/// One entry of the synthesized listing. Folder keys always end with '/';
/// `parent_folder` is empty at the root.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Item {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub key: String,
    pub path: String,
    pub parent_folder: String,
    pub size: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_folder: bool,
    pub depth: usize,
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub explicit_folders: usize,
    pub files: usize,
    pub folders_from_markers: usize,
    pub folders_from_files: usize,
}

/// Result shape for a listing request. A store failure still produces a
/// `Listing` (success=false, error set, empty items) so the browsing UI
/// never receives an unparseable response.
#[derive(Serialize, Debug)]
pub struct Listing {
    pub success: bool,
    pub items: Vec<Item>,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Listing {
    fn failed(error: String) -> Self {
        Self {
            success: false,
            items: Vec::new(),
            total_count: 0,
            diagnostics: None,
            error: Some(error),
        }
    }
}

/// Path segments with any trailing slash removed.
fn segments(path: &str) -> Vec<&str> {
    path.trim_end_matches('/').split('/').collect()
}

/// Folder paths formed by the first 1..=upto segments, each with a trailing
/// slash: ["a","b"] with upto=2 yields "a/" and "a/b/".
fn prefix_folders(segs: &[&str], upto: usize) -> Vec<String> {
    (1..=upto).map(|i| segs[..i].join("/") + "/").collect()
}

fn parent_of(segs: &[&str]) -> String {
    if segs.len() > 1 {
        segs[..segs.len() - 1].join("/") + "/"
    } else {
        String::new()
    }
}

/// Pure tree synthesis over one complete listing. No store calls; `name`,
/// `parent_folder` and `depth` are path arithmetic only. Output order is
/// fully deterministic for a given entry set, whatever order the pages
/// arrived in.
pub fn build_items(entries: &[StorageEntry]) -> (Vec<Item>, Diagnostics) {
    let (markers, files): (Vec<&StorageEntry>, Vec<&StorageEntry>) =
        entries.iter().partition(|e| e.key.ends_with('/'));

    // Set 1: explicit markers, plus every ancestor of each marker.
    let mut folders_from_markers: BTreeSet<String> = BTreeSet::new();
    let mut marker_times: HashMap<&str, Option<DateTime<Utc>>> = HashMap::new();
    for m in &markers {
        let segs = segments(&m.key);
        folders_from_markers.extend(prefix_folders(&segs, segs.len()));
        marker_times.insert(m.key.as_str(), m.last_modified);
    }

    // Set 2: every proper '/'-prefix of each file key.
    let mut folders_from_files: BTreeSet<String> = BTreeSet::new();
    for f in &files {
        let segs: Vec<&str> = f.key.split('/').collect();
        folders_from_files.extend(prefix_folders(&segs, segs.len() - 1));
    }

    let diagnostics = Diagnostics {
        explicit_folders: markers.len(),
        files: files.len(),
        folders_from_markers: folders_from_markers.len(),
        folders_from_files: folders_from_files.len(),
    };

    let mut items = Vec::new();

    for f in &files {
        let segs: Vec<&str> = f.key.split('/').collect();
        let name = segs[segs.len() - 1];
        if name.is_empty() {
            continue;
        }
        items.push(Item {
            name: name.to_string(),
            kind: ItemKind::File,
            key: f.key.clone(),
            path: f.key.clone(),
            parent_folder: parent_of(&segs),
            size: f.size,
            last_modified: f.last_modified,
            is_folder: false,
            depth: segs.len() - 1,
        });
    }

    for folder_path in folders_from_markers.union(&folders_from_files) {
        let segs = segments(folder_path);
        let name = segs[segs.len() - 1];
        if name.is_empty() {
            continue;
        }
        items.push(Item {
            name: name.to_string(),
            kind: ItemKind::Folder,
            key: folder_path.clone(),
            path: folder_path.clone(),
            parent_folder: parent_of(&segs),
            size: None,
            // Marker-backed folders carry the marker's timestamp; folders
            // inferred purely from file paths have none.
            last_modified: marker_times
                .get(folder_path.as_str())
                .copied()
                .flatten(),
            is_folder: true,
            depth: segs.len() - 1,
        });
    }

    sort_items(&mut items);
    (items, diagnostics)
}

/// Total order: depth ascending, folders before files, case-insensitive
/// name. The raw key is the final tie-break: case-insensitive names alone
/// can collide, and the order must not depend on listing page boundaries.
pub fn sort_items(items: &mut [Item]) {
    items.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then_with(|| b.is_folder.cmp(&a.is_folder))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.key.cmp(&b.key))
    });
}

// ──────────────────────────────────────────────────────
// HierarchyBuilder
// ──────────────────────────────────────────────────────
pub struct HierarchyBuilder {
    store: Arc<dyn ObjectStoreClient>,
}

impl HierarchyBuilder {
    pub fn new(store: Arc<dyn ObjectStoreClient>) -> Self {
        Self { store }
    }

    /// Pages through every key under `prefix` and synthesizes the tree.
    /// An empty prefix lists the whole bucket.
    pub async fn build(&self, bucket: &str, prefix: &str) -> Listing {
        match list_all(self.store.as_ref(), bucket, prefix).await {
            Ok(entries) => {
                let (items, diagnostics) = build_items(&entries);
                info!(
                    "LIST Bucket='{}', Prefix='{}': {} items",
                    bucket,
                    prefix,
                    items.len()
                );
                Listing {
                    success: true,
                    total_count: items.len(),
                    items,
                    diagnostics: Some(diagnostics),
                    error: None,
                }
            }
            Err(e) => {
                error!("LIST Bucket='{}', Prefix='{}' failed: {}", bucket, prefix, e);
                Listing::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3_operations::store::MemoryStore;
    use bytes::Bytes;

    fn file(key: &str, size: i64) -> StorageEntry {
        StorageEntry {
            key: key.to_string(),
            size: Some(size),
            last_modified: Some(Utc::now()),
        }
    }

    fn marker(key: &str) -> StorageEntry {
        StorageEntry {
            key: key.to_string(),
            size: Some(0),
            last_modified: Some(Utc::now()),
        }
    }

    fn folder_keys(items: &[Item]) -> Vec<&str> {
        items
            .iter()
            .filter(|i| i.is_folder)
            .map(|i| i.key.as_str())
            .collect()
    }

    #[test]
    fn folders_are_union_of_file_prefixes_and_marker_ancestors() {
        let entries = vec![
            file("a/b/c.txt", 3),
            file("a/d.txt", 1),
            marker("x/y/"),
        ];
        let (items, _) = build_items(&entries);
        assert_eq!(folder_keys(&items), vec!["a/", "x/", "a/b/", "x/y/"]);
    }

    #[test]
    fn one_folder_item_per_distinct_path() {
        // "a/" is implied by two files and backed by a marker: still one item.
        let entries = vec![file("a/one.txt", 1), file("a/two.txt", 2), marker("a/")];
        let (items, diagnostics) = build_items(&entries);
        assert_eq!(folder_keys(&items), vec!["a/"]);
        assert_eq!(diagnostics.folders_from_markers, 1);
        assert_eq!(diagnostics.folders_from_files, 1);
    }

    #[test]
    fn sort_is_depth_then_folders_then_name_case_insensitive() {
        let entries = vec![
            file("a.txt", 1),
            file("b/deep.txt", 1),
            file("Zed.txt", 1),
            marker("b/"),
            marker("Alpha/"),
        ];
        let (items, _) = build_items(&entries);
        let order: Vec<(&str, bool, usize)> = items
            .iter()
            .map(|i| (i.name.as_str(), i.is_folder, i.depth))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Alpha", true, 0),
                ("b", true, 0),
                ("a.txt", false, 0),
                ("Zed.txt", false, 0),
                ("deep.txt", false, 1),
            ]
        );
    }

    #[test]
    fn output_is_identical_for_any_input_order() {
        let mut entries = vec![
            file("docs/reports/q1.txt", 10),
            file("docs/readme.md", 2),
            marker("media/"),
            file("docs/reports/q2.txt", 11),
        ];
        let (forward, _) = build_items(&entries);
        entries.reverse();
        let (reversed, _) = build_items(&entries);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn degenerate_names_are_skipped() {
        // A bare "/" marker and an empty segment produce no items of their own.
        let entries = vec![marker("/"), file("a//b.txt", 1)];
        let (items, _) = build_items(&entries);
        assert!(items.iter().all(|i| !i.name.is_empty()));
        assert!(items.iter().any(|i| i.key == "a/" && i.is_folder));
        assert!(items.iter().any(|i| i.key == "a//b.txt" && !i.is_folder));
    }

    #[test]
    fn marker_backed_folder_carries_timestamp() {
        let stamped = StorageEntry {
            key: "backed/".to_string(),
            size: Some(0),
            last_modified: Some(Utc::now()),
        };
        let entries = vec![stamped.clone(), file("implied/file.txt", 1)];
        let (items, _) = build_items(&entries);

        let backed = items.iter().find(|i| i.key == "backed/").unwrap();
        assert_eq!(backed.last_modified, stamped.last_modified);

        let implied = items.iter().find(|i| i.key == "implied/").unwrap();
        assert!(implied.last_modified.is_none());
    }

    #[test]
    fn parent_and_depth_from_path_arithmetic() {
        let entries = vec![file("a/b/c/deep.bin", 4)];
        let (items, _) = build_items(&entries);

        let deep = items.iter().find(|i| i.key == "a/b/c/deep.bin").unwrap();
        assert_eq!(deep.parent_folder, "a/b/c/");
        assert_eq!(deep.depth, 3);

        let root = items.iter().find(|i| i.key == "a/").unwrap();
        assert_eq!(root.parent_folder, "");
        assert_eq!(root.depth, 0);

        let mid = items.iter().find(|i| i.key == "a/b/").unwrap();
        assert_eq!(mid.parent_folder, "a/");
        assert_eq!(mid.depth, 1);
    }

    #[test]
    fn diagnostics_count_both_sources() {
        let entries = vec![
            file("a/x.txt", 1),
            file("b/y.txt", 1),
            marker("a/"),
            marker("m/n/"),
        ];
        let (_, diagnostics) = build_items(&entries);
        assert_eq!(diagnostics.files, 2);
        assert_eq!(diagnostics.explicit_folders, 2);
        // markers: a/, m/, m/n/ — files: a/, b/
        assert_eq!(diagnostics.folders_from_markers, 3);
        assert_eq!(diagnostics.folders_from_files, 2);
    }

    #[tokio::test]
    async fn upload_then_list_round_trip() {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket("media").await.unwrap();
        store
            .put_object("media", "docs/reports/q1.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let listing = HierarchyBuilder::new(store).build("media", "").await;
        assert!(listing.success);
        assert_eq!(listing.total_count, 3);

        let f = listing.items.iter().find(|i| !i.is_folder).unwrap();
        assert_eq!(f.key, "docs/reports/q1.txt");
        assert_eq!(f.size, Some(5));
        assert_eq!(folder_keys(&listing.items), vec!["docs/", "docs/reports/"]);
    }

    #[tokio::test]
    async fn store_failure_still_returns_a_shape() {
        let store = Arc::new(MemoryStore::new());
        let listing = HierarchyBuilder::new(store).build("no-such-bucket", "").await;
        assert!(!listing.success);
        assert!(listing.error.is_some());
        assert!(listing.items.is_empty());
        assert_eq!(listing.total_count, 0);
    }
}
