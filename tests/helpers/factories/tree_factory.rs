use crate::namespace::PathTree;

/// Builds a tree from `(path, is_file, owner_id)` triples. Owner uuids are
/// derived as `uuid-<owner_id>` so bucket-related assertions stay readable.
pub fn tree_with(paths: &[(&str, bool, u32)]) -> PathTree {
    let mut tree = PathTree::new();
    for (path, is_file, owner) in paths {
        tree.add_path(path, *is_file, *owner, &format!("uuid-{owner}"))
            .expect("factory paths are well formed");
    }
    tree
}

/// The small namespace most tree tests start from: a docs folder with one
/// file, both owned by server 1.
pub fn docs_tree() -> PathTree {
    tree_with(&[("docs", false, 1), ("docs/a.txt", true, 1)])
}

/// A deeper namespace spanning two owners and three levels.
pub fn layered_tree() -> PathTree {
    tree_with(&[
        ("docs", false, 1),
        ("docs/a.txt", true, 1),
        ("docs/reports", false, 1),
        ("docs/reports/q1.txt", true, 1),
        ("media", false, 2),
        ("media/clips", false, 2),
        ("media/clips/intro.mp4", true, 2),
    ])
}
