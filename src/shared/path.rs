/// Prefixes reserved for replica copies of top-level entries. Paths under
/// these are probing fallbacks, not stable identity, and are never cached.
pub const REDUNDANCY_PREFIXES: [&str; 2] = [".rd1", ".rd2"];

/// Splits a path on `/` and `\`, dropping empty segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty())
}

/// Canonical form used as cache key: segments joined with a single `/`.
pub fn normalize(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

/// Strips the last segment. Returns `None` for top-level entries and for
/// paths with no segments at all.
pub fn parent(path: &str) -> Option<String> {
    let segs: Vec<&str> = segments(path).collect();
    if segs.len() < 2 {
        return None;
    }
    Some(segs[..segs.len() - 1].join("/"))
}

pub fn is_redundancy_path(path: &str) -> bool {
    match segments(path).next() {
        Some(first) => first.starts_with(".rd"),
        None => false,
    }
}

/// Replica locations probed, in order, when a read misses its primary path.
pub fn fallback_candidates(path: &str) -> Vec<String> {
    let normalized = normalize(path);
    REDUNDANCY_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}/{normalized}"))
        .collect()
}

/// True when `candidate` equals `prefix` or sits anywhere underneath it.
/// Both sides are compared in normalized form.
pub fn is_same_or_nested(prefix: &str, candidate: &str) -> bool {
    let prefix = normalize(prefix);
    let candidate = normalize(candidate);
    candidate == prefix || candidate.starts_with(&format!("{prefix}/"))
}
