use scangraph_core::model::{FolderRow, Interpretation, Label, ResearchObject, ScanMeta};
use scangraph_core::schema::{REL_CONTAINS, REL_SCANNED_IN};
use scangraph_core::{identity, Dataset, Error, GraphStore, LocalGraphStore};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn store_with(datasets: &[(&str, &str, u64)]) -> LocalGraphStore {
    let store = LocalGraphStore::new();
    for (checksum, path, size) in datasets {
        store
            .upsert_dataset(Dataset::new(checksum, path, *size))
            .unwrap();
    }
    store
}

#[test]
fn test_upsert_same_checksum_updates_in_place() {
    let store = LocalGraphStore::new();
    let first = store
        .upsert_dataset(Dataset::new("abc", "/x/f1.txt", 10))
        .unwrap();
    let second = store
        .upsert_dataset(Dataset::new("abc", "/y/renamed.csv", 20))
        .unwrap();

    assert_eq!(store.dataset_count(), 1);
    assert_eq!(first.id, second.id);
    assert_eq!(first.id, identity::dataset_id("abc"));

    let stored = store.dataset("abc").unwrap();
    assert_eq!(stored.path, "/y/renamed.csv");
    assert_eq!(stored.filename, "renamed.csv");
    assert_eq!(stored.extension, ".csv");
    assert_eq!(stored.size, 20);
}

#[test]
fn test_upsert_keeps_interpretations() {
    let store = store_with(&[("abc", "/x/f1.txt", 10)]);
    assert!(store
        .add_interpretation("abc", "text-stats", Interpretation::success(json!({"lines": 1}), "1"))
        .unwrap());
    store
        .upsert_dataset(Dataset::new("abc", "/x/f1.txt", 11))
        .unwrap();
    let stored = store.dataset("abc").unwrap();
    assert!(stored.interpretations.contains_key("text-stats"));
}

#[test]
fn test_interpretation_overwrites_per_interpreter() {
    let store = store_with(&[("abc", "/x/f1.txt", 10)]);
    store
        .add_interpretation("abc", "text-stats", Interpretation::error("boom", "1"))
        .unwrap();
    store
        .add_interpretation("abc", "text-stats", Interpretation::success(json!({"lines": 3}), "2"))
        .unwrap();
    let stored = store.dataset("abc").unwrap();
    assert_eq!(stored.interpretations.len(), 1);
    assert_eq!(stored.interpretations["text-stats"].version, "2");
}

#[test]
fn test_interpretation_for_unknown_checksum_is_ignored() {
    let store = LocalGraphStore::new();
    let attached = store
        .add_interpretation("missing", "text-stats", Interpretation::success(json!({}), "1"))
        .unwrap();
    assert!(!attached);
    assert_eq!(store.dataset_count(), 0);
}

#[test]
fn test_concrete_single_file_scan() {
    let store = store_with(&[("abc", "/x/f1.txt", 10)]);
    let scan = ScanMeta::new("s1", "/x").with_checksums(["abc"]);

    let verification = store.commit_scan(&scan, &[], &[]).unwrap();
    assert!(verification.scan_exists);
    assert_eq!(verification.files_linked, 1);
    assert!(verification.verified);

    let summary = store.schema_summary().unwrap();
    assert_eq!(summary.nodes["Dataset"], 1);
    assert_eq!(summary.relations[REL_SCANNED_IN], 1);
}

#[test]
fn test_recommit_unions_membership() {
    let store = store_with(&[
        ("a", "/x/a.txt", 1),
        ("b", "/x/b.txt", 1),
        ("c", "/x/c.txt", 1),
    ]);
    store
        .commit_scan(&ScanMeta::new("s1", "/x").with_checksums(["a", "b"]), &[], &[])
        .unwrap();
    let verification = store
        .commit_scan(&ScanMeta::new("s1", "/x").with_checksums(["b", "c"]), &[], &[])
        .unwrap();
    assert_eq!(verification.files_linked, 3);

    let scans = store.list_instances(Label::Scan).unwrap();
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0]["fileCount"], 3);
}

#[test]
fn test_unknown_checksums_are_not_linked() {
    let store = store_with(&[("a", "/x/a.txt", 1)]);
    let verification = store
        .commit_scan(&ScanMeta::new("s1", "/x").with_checksums(["a", "ghost"]), &[], &[])
        .unwrap();
    assert_eq!(verification.files_linked, 1);
}

#[test]
fn test_scan_without_links_is_unverified() {
    let store = LocalGraphStore::new();
    let verification = store
        .commit_scan(&ScanMeta::new("s1", "/x").with_checksums(["ghost"]), &[], &[])
        .unwrap();
    assert!(verification.scan_exists);
    assert!(!verification.verified);
}

#[test]
fn test_commit_without_id_is_rejected() {
    let store = LocalGraphStore::new();
    let err = store
        .commit_scan(&ScanMeta::default(), &[], &[])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidScan(_)));
}

#[test]
fn test_delete_scan_does_not_cascade() {
    let store = store_with(&[("a", "/x/a.txt", 1), ("b", "/x/b.txt", 2)]);
    store
        .commit_scan(
            &ScanMeta::new("s1", "/x").with_checksums(["a", "b"]),
            &[],
            &[FolderRow::new("/x", "")],
        )
        .unwrap();

    assert!(store.delete_scan("s1").unwrap());
    assert!(!store.delete_scan("s1").unwrap());

    assert_eq!(store.list_instances(Label::File).unwrap().len(), 2);
    assert_eq!(store.list_instances(Label::Folder).unwrap().len(), 1);
    assert!(store.list_instances(Label::Scan).unwrap().is_empty());
    assert!(!store.verify_scan("s1").unwrap().scan_exists);
}

#[test]
fn test_folder_rows_build_hierarchy() {
    let store = LocalGraphStore::new();
    let rows = vec![
        FolderRow::new("/a", ""),
        FolderRow::new("/a/b", "/a"),
        FolderRow::new("/a/b/c", "/a/b"),
    ];
    let verification = store
        .commit_scan(&ScanMeta::new("s1", "/a"), &[], &rows)
        .unwrap();
    assert_eq!(verification.files_linked, 0);
    assert_eq!(verification.folders_linked, 3);
    assert!(verification.verified);

    let edges = store.folder_edges();
    assert_eq!(
        edges,
        vec![
            ("/a".to_string(), "/a/b".to_string()),
            ("/a/b".to_string(), "/a/b/c".to_string()),
        ]
    );
    assert!(!edges.contains(&("/a".to_string(), "/a/b/c".to_string())));
}

#[test]
fn test_conflicting_folder_parent_last_write_wins() {
    let store = LocalGraphStore::new();
    store
        .commit_scan(
            &ScanMeta::new("s1", "/"),
            &[],
            &[FolderRow::new("/a", ""), FolderRow::new("/m", ""), FolderRow::new("/a/b", "/a")],
        )
        .unwrap();
    store
        .commit_scan(&ScanMeta::new("s2", "/"), &[], &[FolderRow::new("/a/b", "/m")])
        .unwrap();

    let folders = store.list_instances(Label::Folder).unwrap();
    let moved = folders.iter().find(|f| f["path"] == "/a/b").unwrap();
    assert_eq!(moved["parent"], "/m");
    assert_eq!(
        store.folder_edges(),
        vec![("/m".to_string(), "/a/b".to_string())]
    );
}

#[test]
fn test_derived_folders_carry_file_counts() {
    let store = store_with(&[
        ("a", "/x/a.txt", 1),
        ("b", "/x/b.txt", 1),
        ("c", "/x/y/c.txt", 1),
    ]);
    let folders = store.list_instances(Label::Folder).unwrap();
    assert_eq!(folders.len(), 2);
    let x = folders.iter().find(|f| f["path"] == "/x").unwrap();
    assert_eq!(x["fileCount"], 2);
    assert_eq!(x["name"], "x");
    // "/" is never an observed parent, so "/x" has no edge into it.
    assert_eq!(store.folder_edges(), vec![("/x".to_string(), "/x/y".to_string())]);
}

#[test]
fn test_schema_triples_truncation_keeps_largest() {
    let store = store_with(&[
        ("a", "/x/a.txt", 1),
        ("b", "/x/b.txt", 1),
        ("c", "/x/c.txt", 1),
    ]);
    store
        .commit_scan(
            &ScanMeta::new("s1", "/x").with_checksums(["a", "b"]),
            &[],
            &[FolderRow::new("/x", "")],
        )
        .unwrap();

    let full = store.schema_triples(usize::MAX).unwrap();
    assert_eq!(full.edges.len(), 3);
    assert!(!full.truncated);

    let limited = store.schema_triples(1).unwrap();
    assert_eq!(limited.edges.len(), 1);
    assert!(limited.truncated);
    let top = &limited.edges[0];
    assert_eq!(
        (top.start_label.as_str(), top.rel_type.as_str(), top.end_label.as_str()),
        ("Folder", REL_CONTAINS, "File")
    );
    assert_eq!(top.count, 3);
}

#[test]
fn test_schema_triples_omit_zero_labels() {
    let store = store_with(&[("a", "/x/a.txt", 1)]);
    let triples = store.schema_triples(50).unwrap();
    let labels: Vec<&str> = triples.nodes.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["File", "Folder"]);
    assert!(triples.edges.iter().all(|e| e.count > 0));
}

#[test]
fn test_summary_counts_relations_and_interpreters() {
    let store = store_with(&[("a", "/x/a.txt", 1), ("b", "/x/y/b.txt", 1)]);
    store
        .add_interpretation("a", "text-stats", Interpretation::success(json!({}), "1"))
        .unwrap();
    store
        .add_interpretation("b", "exif", Interpretation::success(json!({}), "1"))
        .unwrap();
    store
        .commit_scan(
            &ScanMeta::new("s1", "/x").with_checksums(["a", "b"]),
            &[],
            &[FolderRow::new("/x", "")],
        )
        .unwrap();
    let mut ro = ResearchObject::new("/x", "Package X");
    ro.checksums.insert("a".to_string());
    ro.folders.insert("/x/y".to_string());
    store.upsert_research_object(ro).unwrap();

    let summary = store.schema_summary().unwrap();
    assert_eq!(summary.nodes["Dataset"], 2);
    assert_eq!(summary.nodes["Folder"], 2);
    assert_eq!(summary.nodes["Scan"], 1);
    assert_eq!(summary.nodes["ResearchObject"], 1);
    assert_eq!(summary.relations["INTERPRETED_AS"], 2);
    // 2 Folder->File, 1 Folder->Folder, 2 ResearchObject links
    assert_eq!(summary.relations[REL_CONTAINS], 5);
    assert_eq!(summary.relations[REL_SCANNED_IN], 3);
    assert_eq!(summary.interpreters, vec!["exif", "text-stats"]);
}

#[test]
fn test_summary_hides_absent_scans() {
    let store = store_with(&[("a", "/x/a.txt", 1)]);
    let summary = store.schema_summary().unwrap();
    assert!(!summary.nodes.contains_key("Scan"));
    assert!(!summary.nodes.contains_key("ResearchObject"));
    assert_eq!(summary.relations[REL_SCANNED_IN], 0);
}

#[test]
fn test_research_object_id_from_key() {
    let store = LocalGraphStore::new();
    let id = store
        .upsert_research_object(ResearchObject::new("/data/pkg", "Package"))
        .unwrap();
    assert_eq!(id, identity::research_object_id("/data/pkg"));

    let mut explicit = ResearchObject::new("/data/pkg", "Package");
    explicit.id = Some("ro-1".to_string());
    assert_eq!(store.upsert_research_object(explicit).unwrap(), "ro-1");
    assert_eq!(store.list_instances(Label::ResearchObject).unwrap().len(), 2);
}

#[test]
fn test_concurrent_reads_and_writes() {
    let store = Arc::new(LocalGraphStore::new());
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..50 {
                    let checksum = format!("{}-{}", w, i);
                    store
                        .upsert_dataset(Dataset::new(&checksum, &format!("/w{}/f{}.txt", w, i), 1))
                        .unwrap();
                    store
                        .commit_scan(
                            &ScanMeta::new(&format!("s{}", w), "/").with_checksums([checksum]),
                            &[],
                            &[],
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..50 {
                store.schema_triples(10).unwrap();
                store.list_instances(Label::Folder).unwrap();
            }
        })
    };
    for handle in writers {
        handle.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(store.dataset_count(), 200);
    for w in 0..4 {
        assert_eq!(store.verify_scan(&format!("s{}", w)).unwrap().files_linked, 50);
    }
}
