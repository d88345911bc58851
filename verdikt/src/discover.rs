use std::path::{Path, PathBuf};

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "bmp"];
pub const CHECKPOINT_EXTENSIONS: &[&str] = &["safetensors"];

fn has_extension(
    path: &Path,
    extensions: &[&str],
) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

fn collect_images(
    dir: &Path,
    out: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry_result in std::fs::read_dir(dir)? {
        let entry = entry_result?;
        let path = entry.path();
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if has_extension(&path, SUPPORTED_IMAGE_EXTENSIONS) {
            out.push(path);
        }
    }
    Ok(())
}

/// Expands a file or directory path into the sorted list of images it
/// contains. Directories are scanned recursively. A single file with an
/// unsupported extension yields an empty list rather than an error.
pub fn find_images(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if has_extension(path, SUPPORTED_IMAGE_EXTENSIONS) {
            return vec![path.to_path_buf()];
        }
        return Vec::new();
    }

    let mut images = Vec::new();
    if let Err(error) = collect_images(path, &mut images) {
        tracing::warn!(path = %path.display(), %error, "image scan failed");
    }
    images.sort();
    images.dedup();
    images
}

/// All checkpoint files directly inside `dir`, sorted by file name.
pub fn find_checkpoints(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut checkpoints = Vec::new();
    for entry_result in std::fs::read_dir(dir)? {
        let entry = entry_result?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, CHECKPOINT_EXTENSIONS) {
            checkpoints.push(path);
        }
    }
    checkpoints.sort();
    Ok(checkpoints)
}

/// First checkpoint file next to the running executable, if any.
pub fn find_checkpoint_beside_executable() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    find_checkpoints(dir).ok()?.into_iter().next()
}
