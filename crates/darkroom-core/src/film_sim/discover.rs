//! CLUT discovery in configured directories.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::film_sim::clut::ClutFormat;

/// A CLUT file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClutEntry {
    pub path: PathBuf,
    /// Human-readable name, see [`clut_display_name`].
    pub label: String,
    /// Sub-directories between the search root and the file, for menus.
    pub group: Vec<String>,
}

/// Find every supported CLUT below `dirs`, recursively.
///
/// Missing or unreadable directories are skipped. Entries are sorted by
/// group, then label, per root.
pub fn discover_cluts<P: AsRef<Path>>(dirs: &[P]) -> Vec<ClutEntry> {
    let mut found = Vec::new();

    for root in dirs {
        let root = root.as_ref();
        if !root.is_dir() {
            tracing::debug!(dir = %root.display(), "CLUT directory not found");
            continue;
        }

        let mut entries: Vec<ClutEntry> = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| ClutFormat::from_path(e.path()).is_some())
            .map(|e| {
                let path = e.into_path();
                let group = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|rel| {
                        rel.components()
                            .map(|c| c.as_os_str().to_string_lossy().into_owned())
                            .collect()
                    })
                    .unwrap_or_default();
                ClutEntry {
                    label: clut_display_name(&path),
                    path,
                    group,
                }
            })
            .collect();

        entries.sort_by(|a, b| (&a.group, &a.label).cmp(&(&b.group, &b.label)));
        tracing::info!(dir = %root.display(), count = entries.len(), "discovered CLUTs");
        found.extend(entries);
    }

    found
}

/// Display name for a CLUT file: the file stem with underscores turned into
/// spaces and a trailing `HALD` / `CLUT` marker removed.
///
/// `Fuji_Velvia_50_HALD.png` → `Fuji Velvia 50`.
pub fn clut_display_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let spaced = stem.replace('_', " ");
    let mut name = spaced.trim();

    for marker in ["HALD", "CLUT"] {
        if name.len() > marker.len() {
            let split = name.len() - marker.len();
            if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(marker) {
                name = name[..split].trim_end_matches([' ', '-']);
            }
        }
    }

    if name.is_empty() {
        stem
    } else {
        name.to_string()
    }
}

/// Resolve a CLUT filename from the parameter block. Relative names are
/// taken relative to `clut_dir` when one is configured.
pub fn resolve_clut_path(filename: &str, clut_dir: Option<&Path>) -> PathBuf {
    let path = Path::new(filename);
    match clut_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
