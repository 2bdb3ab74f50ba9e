use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use demodeck_core::{AppError, AppResult};
use demodeck_domain::{BranchName, DemoPath};
use tracing::warn;
use uuid::Uuid;

/// Published tree of one (project, branch) pair.
#[derive(Debug)]
pub(super) struct PublishedTree {
    pub(super) root: PathBuf,
    pub(super) files: usize,
}

/// Copies the demo sub-tree of a working copy into the published root and swaps it live.
///
/// The live directory is only ever replaced by a complete copy. Staging and retired
/// directories are dot-prefixed siblings, which no encoded branch name can address.
pub(super) fn publish(
    working_copy: &Path,
    demo_path: &DemoPath,
    static_root: &Path,
    project_name: &str,
    branch: &BranchName,
) -> AppResult<PublishedTree> {
    let source = demo_path
        .relative_components()
        .fold(working_copy.to_path_buf(), |path, component| {
            path.join(component)
        });
    if !fs::symlink_metadata(&source).is_ok_and(|metadata| metadata.is_dir()) {
        return Err(AppError::NotFound(format!(
            "demo path '{}' does not exist in branch '{branch}'",
            demo_path.as_str()
        )));
    }

    let project_root = static_root.join(project_name);
    fs::create_dir_all(&project_root).map_err(|error| {
        AppError::Internal(format!(
            "failed to create published project root '{}': {error}",
            project_root.display()
        ))
    })?;

    let directory = branch.directory_name();
    let live = project_root.join(&directory);
    let staging = project_root.join(format!(".{directory}.staging-{}", Uuid::new_v4()));

    let published = copy_tree(&source, &staging).and_then(|files| {
        swap_into_place(&staging, &live, &project_root, &directory)?;
        Ok(files)
    });
    if published.is_err() {
        remove_tree(&staging);
    }

    Ok(PublishedTree {
        root: live,
        files: published?,
    })
}

fn copy_tree(source: &Path, destination: &Path) -> AppResult<usize> {
    fs::create_dir(destination).map_err(|error| {
        AppError::Internal(format!(
            "failed to create directory '{}': {error}",
            destination.display()
        ))
    })?;

    let entries = fs::read_dir(source).map_err(|error| {
        AppError::Internal(format!(
            "failed to read directory '{}': {error}",
            source.display()
        ))
    })?;

    let mut files = 0;
    for entry in entries {
        let entry = entry.map_err(|error| {
            AppError::Internal(format!(
                "failed to read entry of '{}': {error}",
                source.display()
            ))
        })?;
        if entry.file_name() == ".git" {
            continue;
        }

        let file_type = entry.file_type().map_err(|error| {
            AppError::Internal(format!(
                "failed to inspect '{}': {error}",
                entry.path().display()
            ))
        })?;
        let target = destination.join(entry.file_name());

        if file_type.is_symlink() {
            continue;
        } else if file_type.is_dir() {
            files += copy_tree(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target).map_err(|error| {
                AppError::Internal(format!(
                    "failed to copy '{}': {error}",
                    entry.path().display()
                ))
            })?;
            files += 1;
        }
    }

    Ok(files)
}

fn swap_into_place(
    staging: &Path,
    live: &Path,
    project_root: &Path,
    directory: &str,
) -> AppResult<()> {
    let retired = match fs::symlink_metadata(live) {
        Ok(_) => {
            let retired = project_root.join(format!(".{directory}.retired-{}", Uuid::new_v4()));
            fs::rename(live, &retired).map_err(|error| {
                AppError::Internal(format!(
                    "failed to retire published tree '{}': {error}",
                    live.display()
                ))
            })?;
            Some(retired)
        }
        Err(error) if error.kind() == ErrorKind::NotFound => None,
        Err(error) => {
            return Err(AppError::Internal(format!(
                "failed to inspect published tree '{}': {error}",
                live.display()
            )));
        }
    };

    if let Err(error) = fs::rename(staging, live) {
        if let Some(retired) = &retired
            && let Err(restore_error) = fs::rename(retired, live)
        {
            warn!(
                live = %live.display(),
                error = %restore_error,
                "could not restore previous published tree"
            );
        }
        return Err(AppError::Internal(format!(
            "failed to publish tree '{}': {error}",
            live.display()
        )));
    }

    if let Some(retired) = retired {
        remove_tree(&retired);
    }
    Ok(())
}

fn remove_tree(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => warn!(path = %path.display(), error = %error, "could not remove directory"),
    }
}
