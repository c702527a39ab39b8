use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Path the staging directory is renamed to: `{parent}/{folder}` or
/// `{parent}/{folder}{separator}{title}` when a non-blank title is given.
pub fn final_path(
    staging_dir: &Path,
    folder_name: &str,
    title: Option<&str>,
    separator: &str,
) -> Result<PathBuf> {
    let parent = staging_dir
        .parent()
        .ok_or_else(|| anyhow::anyhow!("{} has no parent directory", staging_dir.display()))?;

    let name = match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => {
            if title.contains(['/', '\\']) {
                anyhow::bail!("Title must not contain a path separator: {:?}", title);
            }
            format!("{}{}{}", folder_name, separator, title)
        }
        None => folder_name.to_string(),
    };
    Ok(parent.join(name))
}

/// Rename the staging directory to its final name.
///
/// Fails without touching anything if the target already exists; the staging
/// directory stays where it is for manual recovery.
pub fn finalize(
    staging_dir: &Path,
    folder_name: &str,
    title: Option<&str>,
    separator: &str,
) -> Result<PathBuf> {
    let target = final_path(staging_dir, folder_name, title, separator)?;
    if target == staging_dir {
        return Ok(target);
    }
    if target.exists() {
        anyhow::bail!(
            "Cannot rename {} to {}: destination already exists",
            staging_dir.display(),
            target.display()
        );
    }
    fs::rename(staging_dir, &target).with_context(|| {
        format!(
            "Cannot rename {} to {}",
            staging_dir.display(),
            target.display()
        )
    })?;
    info!("Renamed {} to {}", staging_dir.display(), target.display());
    Ok(target)
}
