//! Pairing: zip the ordered label list with the rendered files.
//!
//! Rendered filenames embed a sequence number, but not always zero-padded
//! (`page-2.png`, `page-10.png`), so files are ordered with a natural
//! comparison in which digit runs compare as integers. The i-th label is
//! then paired with the i-th file, stopping at the shorter list.
//!
//! Pairing is positional only. If a page carries no picture, or two, every
//! later pair shifts; nothing here tries to detect or repair that.

use crate::error::ExtractError;
use crate::output::Artifact;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions treated as rendered images.
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "ppm", "pgm", "pbm", "tif", "tiff", "bmp", "gif", "webp", "jp2",
];

/// Every artifact gets this extension, whatever the source format.
pub const ARTIFACT_EXTENSION: &str = "png";

const MAX_NAME_BYTES: usize = 180;

/// Pair `labels` with the images in `dir`, producing `min(L, R)` artifacts.
///
/// An empty result is not an error here; the orchestrator decides whether
/// it is one.
pub fn pair_artifacts(labels: &[String], dir: &Path) -> Result<Vec<Artifact>, ExtractError> {
    let files = list_rendered_files(dir)?;
    pair_files(labels, &files)
}

/// Pair `labels` with an already-ordered file list.
pub fn pair_files(labels: &[String], files: &[PathBuf]) -> Result<Vec<Artifact>, ExtractError> {
    let n = labels.len().min(files.len());

    if labels.len() != files.len() {
        warn!(
            "{} labels vs {} rendered files; pairing the first {}",
            labels.len(),
            files.len(),
            n
        );
    }

    let mut used = HashSet::new();
    let mut artifacts = Vec::with_capacity(n);

    for (label, path) in labels.iter().zip(files.iter()) {
        let data = std::fs::read(path).map_err(|source| ExtractError::PairingIo {
            path: path.clone(),
            source,
        })?;
        let name = unique_name(&sanitize(label), &mut used);
        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        debug!("Paired '{}' ← {} ({} bytes)", name, source_file, data.len());
        artifacts.push(Artifact::new(name, data, source_file));
    }

    Ok(artifacts)
}

/// Image files directly inside `dir`, in natural order.
pub fn list_rendered_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let io_err = |source| ExtractError::PairingIo {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        if is_image_file(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| {
        let a = a.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let b = b.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        natural_cmp(&a, &b)
    });

    Ok(files)
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Compare strings so that embedded digit runs order numerically.
///
/// `img_2.png` < `img_10.png`. Equal numeric values with different
/// zero-padding fall back to a plain comparison, keeping the order total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut ai, mut bi) = (a.char_indices().peekable(), b.char_indices().peekable());

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((sa, ca)), Some((sb, cb))) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let ea = digit_run_end(a, sa);
                    let eb = digit_run_end(b, sb);
                    let ord = cmp_digit_runs(&a[sa..ea], &b[sb..eb]);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    while ai.peek().is_some_and(|&(i, _)| i < ea) {
                        ai.next();
                    }
                    while bi.peek().is_some_and(|&(i, _)| i < eb) {
                        bi.next();
                    }
                } else {
                    let ord = ca.cmp(&cb);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    ai.next();
                    bi.next();
                }
            }
        }
    }
}

fn digit_run_end(s: &str, start: usize) -> usize {
    s[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|off| start + off)
        .unwrap_or(s.len())
}

/// Numeric comparison of two ASCII digit runs of any length.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Make a label safe to use as a file name stem.
///
/// Removes characters illegal on common filesystems and control characters,
/// collapses whitespace, trims trailing dots and spaces, and bounds the
/// length. Idempotent: `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut name = trim_name(&collapsed).to_string();
    if name.len() > MAX_NAME_BYTES {
        let mut cut = MAX_NAME_BYTES;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
        name = trim_name(&name).to_string();
    }

    if name.is_empty() {
        "artifact".to_string()
    } else {
        name
    }
}

fn trim_name(s: &str) -> &str {
    s.trim_start_matches(' ')
        .trim_end_matches(|c| c == '.' || c == ' ')
}

fn unique_name(stem: &str, used: &mut HashSet<String>) -> String {
    let mut name = format!("{stem}.{ARTIFACT_EXTENSION}");
    let mut n = 2;
    while !used.insert(name.to_lowercase()) {
        name = format!("{stem} ({n}).{ARTIFACT_EXTENSION}");
        n += 1;
    }
    name
}
