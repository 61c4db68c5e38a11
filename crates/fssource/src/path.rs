//! Path normalization for index keys.
//!
//! Every path stored in the tree is relative to the filesystem root,
//! slash-separated, with no `.`/`..` segments and no leading `/` or `./`.
//! The root itself is `"."`.

/// Key of the filesystem root.
pub const ROOT: &str = ".";

/// Lexically cleans a slash-separated path.
///
/// Repeated separators collapse, `.` segments are dropped, and `..` removes
/// the preceding segment. Rooted paths stay rooted and `..` never climbs above
/// the root. An empty result becomes `"."`.
pub fn clean(raw: &str) -> String {
    if raw.is_empty() {
        return ROOT.to_string();
    }

    let rooted = raw.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ROOT.to_string()
    } else {
        joined
    }
}

/// Normalizes a caller-supplied path into the index key form.
///
/// The path is interpreted relative to the filesystem root whether or not it
/// starts with `/`, so `"/a.txt"`, `"./a.txt"` and `"a.txt"` all map to
/// `"a.txt"`.
pub fn normalize_path(raw: &str) -> String {
    let rooted = clean(&format!("/{raw}"));
    let relative = rooted.trim_start_matches('/');
    if relative.is_empty() {
        ROOT.to_string()
    } else {
        relative.to_string()
    }
}

/// Joins a child name onto a normalized directory key.
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Returns the normalized parent of a normalized key (`"."` for top-level entries).
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(split) => &path[..split],
        None => ROOT,
    }
}

/// Splits a normalized key into its segments. The root has none.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ROOT)
}

/// Resolves a symlink target relative to the link's own location.
///
/// Absolute targets are rooted at the filesystem root; relative targets are
/// resolved against the directory containing the link.
pub fn resolve_link_target(link_path: &str, target: &str) -> String {
    if target.starts_with('/') {
        normalize_path(target)
    } else {
        normalize_path(&format!("{}/{}", parent_of(link_path), target))
    }
}
