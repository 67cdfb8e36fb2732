//! Family gallery on disk
//!
//! One reference portrait per person; the file stem is the spoken name.

use std::path::{Path, PathBuf};

use crate::Result;

/// Extensions accepted as reference portraits
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// An enrolled family member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyMember {
    /// Name spoken when recognized
    pub name: String,
    /// Reference portrait
    pub path: PathBuf,
}

/// List enrolled family members, sorted by file name
///
/// A missing directory is an empty gallery.
///
/// # Errors
///
/// Returns error if the directory exists but cannot be read
pub fn gallery(dir: &Path) -> Result<Vec<FamilyMember>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut members = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_reference_image(&path) {
            continue;
        }

        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if name.trim().is_empty() {
            continue;
        }

        members.push(FamilyMember {
            name: name.to_string(),
            path: path.clone(),
        });
    }

    members.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(members)
}

/// True for `.jpg`, `.jpeg` and `.png` files, any case
#[must_use]
pub fn is_reference_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Keep only letters and digits; `None` if nothing is left
#[must_use]
pub fn sanitize_name(raw: &str) -> Option<String> {
    let clean: String = raw.trim().chars().filter(|c| c.is_alphanumeric()).collect();
    (!clean.is_empty()).then_some(clean)
}

/// Where a new portrait for `name` is stored
#[must_use]
pub fn portrait_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.png"))
}

/// True if someone with this name already has a portrait
#[must_use]
pub fn is_enrolled(dir: &Path, name: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| dir.join(format!("{name}.{ext}")).exists())
}
