use crate::namespace::tree::{PathKind, PathTree, ROOT_NAME};
use crate::test_helpers::factories::tree_factory::{docs_tree, layered_tree, tree_with};

#[test]
fn fresh_tree_is_a_lone_root() {
    let tree = PathTree::new();
    assert_eq!(tree.node(tree.root()).name, ROOT_NAME);
    assert_eq!(tree.len(), 1);
    assert!(tree.is_empty());
}

#[test]
fn resolve_reflects_adds_and_deletes() {
    let mut tree = PathTree::new();

    tree.add_path("docs/a.txt", true, 1, "uuid-1").expect("add should succeed");
    tree.add_path("media/intro.mp4", true, 2, "uuid-2").expect("add should succeed");

    assert_eq!(tree.resolve("docs/a.txt"), Some(1));
    assert_eq!(tree.resolve("media/intro.mp4"), Some(2));

    assert!(tree.delete_path("docs/a.txt"));
    assert_eq!(tree.resolve("docs/a.txt"), None);
    // The disjoint path is untouched.
    assert_eq!(tree.resolve("media/intro.mp4"), Some(2));
}

#[test]
fn delete_file_keeps_parent_resolvable() {
    let mut tree = docs_tree();

    assert_eq!(tree.resolve("docs/a.txt"), Some(1));
    assert!(tree.delete_path("docs/a.txt"));
    assert_eq!(tree.resolve("docs/a.txt"), None);
    assert_eq!(tree.resolve("docs"), Some(1));
}

#[test]
fn missing_ancestors_become_waypoints() {
    let mut tree = PathTree::new();
    tree.add_path("a/b/c", true, 3, "uuid-3").expect("add should succeed");

    // Intermediate segments route but are not reachable targets.
    assert_eq!(tree.resolve("a"), None);
    assert_eq!(tree.resolve("a/b"), None);
    assert_eq!(tree.resolve("a/b/c"), Some(3));
    assert_eq!(tree.kind("a"), PathKind::NotFound);
    assert_eq!(tree.kind("a/b/c"), PathKind::File);
}

#[test]
fn waypoint_becomes_accessible_once_registered() {
    let mut tree = PathTree::new();
    tree.add_path("a/b/c", true, 3, "uuid-3").expect("add should succeed");

    tree.add_path("a/b", false, 3, "uuid-3").expect("re-add should succeed");
    assert_eq!(tree.resolve("a/b"), Some(3));
    assert_eq!(tree.kind("a/b"), PathKind::Directory);
}

#[test]
fn re_add_updates_owner_in_place() {
    let mut tree = docs_tree();
    let before = tree.len();

    tree.add_path("docs/a.txt", true, 7, "uuid-7").expect("re-add should succeed");
    assert_eq!(tree.resolve("docs/a.txt"), Some(7));
    assert_eq!(tree.len(), before, "idempotent re-add must not allocate");
}

#[test]
fn add_under_a_file_is_rejected() {
    let mut tree = docs_tree();
    assert!(tree.add_path("docs/a.txt/inner", true, 1, "uuid-1").is_none());
}

#[test]
fn file_flag_on_a_populated_folder_is_rejected() {
    let mut tree = docs_tree();
    assert!(tree.add_path("docs", true, 1, "uuid-1").is_none());
}

#[test]
fn empty_path_is_not_addressable() {
    let mut tree = docs_tree();
    assert_eq!(tree.lookup(""), None);
    assert_eq!(tree.resolve("/"), None);
    assert!(tree.add_path("", true, 1, "uuid-1").is_none());
    assert!(!tree.delete_path(""));
}

#[test]
fn lookup_tolerates_separator_noise() {
    let tree = layered_tree();
    assert_eq!(tree.resolve("/docs//reports/q1.txt"), Some(1));
    assert_eq!(tree.resolve("docs\\reports\\q1.txt"), Some(1));
}

#[test]
fn delete_of_missing_path_is_a_noop() {
    let mut tree = docs_tree();
    let before = tree.len();
    assert!(!tree.delete_path("docs/missing.txt"));
    assert_eq!(tree.len(), before);
}

#[test]
fn delete_folder_removes_entire_subtree() {
    let mut tree = layered_tree();

    assert!(tree.delete_path("docs"));
    assert_eq!(tree.resolve("docs"), None);
    assert_eq!(tree.resolve("docs/a.txt"), None);
    assert_eq!(tree.resolve("docs/reports/q1.txt"), None);
    assert_eq!(tree.resolve("media/clips/intro.mp4"), Some(2));
}

#[test]
fn freed_slots_are_recycled() {
    let mut tree = layered_tree();
    let before = tree.len();

    assert!(tree.delete_path("docs/reports"));
    tree.add_path("docs/archive", false, 1, "uuid-1").expect("add should succeed");
    tree.add_path("docs/archive/q1.txt", true, 1, "uuid-1").expect("add should succeed");

    assert_eq!(tree.len(), before, "arena should reuse freed slots");
    assert_eq!(tree.resolve("docs/archive/q1.txt"), Some(1));
}

#[test]
fn child_count_tracks_inserts_and_removes() {
    let mut tree = layered_tree();
    let docs = tree.lookup("docs").expect("docs should exist");
    assert_eq!(tree.node(docs).child_count, 2);

    tree.delete_path("docs/a.txt");
    assert_eq!(tree.node(docs).child_count, 1);

    tree.add_path("docs/b.txt", true, 1, "uuid-1").expect("add should succeed");
    tree.add_path("docs/c.txt", true, 1, "uuid-1").expect("add should succeed");
    assert_eq!(tree.node(docs).child_count, 3);
}

#[test]
fn sibling_unlink_in_the_middle_keeps_order() {
    let mut tree = tree_with(&[
        ("a", false, 1),
        ("b", false, 1),
        ("c", false, 1),
    ]);

    assert!(tree.delete_path("b"));
    let names: Vec<String> = tree
        .children(tree.root())
        .map(|id| tree.node(id).name.clone())
        .collect();
    assert_eq!(names, vec!["a", "c"]);
}

#[test]
fn merge_grafts_incoming_children_after_existing_ones() {
    let mut tree = tree_with(&[("x", false, 2), ("x/y", false, 2)]);

    let incoming = tree_with(&[("z", false, 0)]);
    tree.merge(&incoming, 3, "uuid-3");

    let names: Vec<String> = tree
        .children(tree.root())
        .map(|id| tree.node(id).name.clone())
        .collect();
    assert_eq!(names, vec!["x", "z"]);

    assert_eq!(tree.resolve("z"), Some(3));
    assert_eq!(tree.resolve("x"), Some(2));
    assert_eq!(tree.resolve("x/y"), Some(2));
}

#[test]
fn merge_stamps_grafted_children_but_keeps_baked_descendants() {
    let mut tree = PathTree::new();

    let mut incoming = PathTree::new();
    incoming.add_path("share", false, 9, "uuid-9").expect("add should succeed");
    incoming.add_path("share/notes.txt", true, 9, "uuid-9").expect("add should succeed");

    tree.merge(&incoming, 5, "uuid-5");

    // The grafted top-level entry carries the joining server's identity.
    assert_eq!(tree.resolve("share"), Some(5));
    let share = tree.lookup("share").expect("share should exist");
    assert_eq!(tree.node(share).owner_uuid, "uuid-5");

    // Its descendants keep whatever the serialized subtree said.
    assert_eq!(tree.resolve("share/notes.txt"), Some(9));
}

#[test]
fn remove_server_paths_prunes_only_that_owner() {
    let mut tree = layered_tree();

    let removed = tree.remove_server_paths(1);
    assert_eq!(removed, vec!["docs"]);

    assert_eq!(tree.resolve("docs"), None);
    assert_eq!(tree.resolve("docs/reports/q1.txt"), None);
    assert_eq!(tree.resolve("media"), Some(2));
    assert_eq!(tree.resolve("media/clips/intro.mp4"), Some(2));
}

#[test]
fn ancestor_is_reflexive() {
    let tree = layered_tree();
    assert!(tree.is_ancestor("docs/reports", "docs/reports"));
}

#[test]
fn parent_is_ancestor_but_not_the_inverse() {
    let tree = layered_tree();
    assert!(tree.is_ancestor("docs", "docs/reports/q1.txt"));
    assert!(tree.is_ancestor("docs/reports", "docs/reports/q1.txt"));
    assert!(!tree.is_ancestor("docs/reports/q1.txt", "docs/reports"));
    assert!(!tree.is_ancestor("media", "docs/a.txt"));
}

#[test]
fn ancestor_of_missing_paths_is_false() {
    let tree = layered_tree();
    assert!(!tree.is_ancestor("ghost", "docs"));
    assert!(!tree.is_ancestor("docs", "ghost"));
}

#[test]
fn kind_distinguishes_files_and_folders() {
    let tree = layered_tree();
    assert_eq!(tree.kind("docs"), PathKind::Directory);
    assert_eq!(tree.kind("docs/a.txt"), PathKind::File);
    assert_eq!(tree.kind("ghost"), PathKind::NotFound);
}

#[test]
fn clone_subtree_mirrors_shape_under_new_owner() {
    let mut tree = layered_tree();

    assert!(tree.clone_subtree("docs", ".rd1/docs", 2, "uuid-2"));

    assert_eq!(tree.resolve(".rd1/docs"), Some(2));
    assert_eq!(tree.resolve(".rd1/docs/a.txt"), Some(2));
    assert_eq!(tree.resolve(".rd1/docs/reports/q1.txt"), Some(2));
    assert_eq!(tree.kind(".rd1/docs/reports"), PathKind::Directory);

    // The source is untouched.
    assert_eq!(tree.resolve("docs/a.txt"), Some(1));
}

#[test]
fn clone_subtree_refuses_missing_source_and_occupied_destination() {
    let mut tree = layered_tree();
    assert!(!tree.clone_subtree("ghost", "copy", 2, "uuid-2"));
    assert!(!tree.clone_subtree("docs", "media", 2, "uuid-2"));
}

#[test]
fn subtree_lock_collection_is_preorder() {
    let tree = layered_tree();

    let docs_locks = tree.collect_subtree_locks("docs");
    // docs, a.txt, reports, q1.txt
    assert_eq!(docs_locks.len(), 4);

    let leaf_locks = tree.collect_subtree_locks("docs/a.txt");
    assert_eq!(leaf_locks.len(), 1);
}

#[test]
fn lock_collection_on_stale_path_is_empty() {
    let tree = layered_tree();
    assert!(tree.collect_subtree_locks("no/such/path").is_empty());
}

#[test]
fn render_lists_every_node() {
    let tree = layered_tree();
    let listing = tree.render();

    assert!(listing.contains("docs/"));
    assert!(listing.contains("a.txt"));
    assert!(listing.contains("\t\t\tq1.txt"));
    assert!(listing.starts_with("./"));
}
