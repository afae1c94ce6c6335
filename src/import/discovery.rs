use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Image files under `directory` whose extension is in `extensions`, sorted by path.
pub fn discover_images(directory: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        anyhow::bail!("not a directory: {}", directory.display());
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if path.is_file() && has_extension(path, extensions) {
            images.push(path.to_path_buf());
        }
    }

    // Sort by path for consistent ordering
    images.sort();

    Ok(images)
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            extensions.iter().any(|e| e.to_lowercase() == ext_lower)
        })
        .unwrap_or(false)
}
