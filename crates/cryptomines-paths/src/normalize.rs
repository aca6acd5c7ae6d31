use std::{
    ffi::OsString,
    fs,
    path::{Component, MAIN_SEPARATOR_STR, Path, PathBuf},
};

use crate::RootPathError;

/// Symlinks followed in one resolution before it fails with
/// [`RootPathError::SymlinkLoop`].
///
/// Every hop counts, not just repeated ones, so a chain of more than this
/// many distinct links is rejected the same way as a cycle. This mirrors the
/// kernel's `ELOOP` limit.
pub const MAX_SYMLINK_HOPS: usize = 40;

enum Step {
    Parent,
    Name(OsString),
}

/// Resolves `path` into an absolute path free of `.`, `..` and symlinks.
///
/// Relative paths are anchored at `base`, which must itself be absolute.
/// Components that do not exist are kept as written, so the result need not
/// exist on disk. A component whose metadata cannot be read for any reason
/// (missing, permission denied, name too long) is treated as a plain
/// directory name. Only symlink metadata is read; nothing is created.
pub fn normalize(path: &Path, base: &Path) -> Result<PathBuf, RootPathError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    if !absolute.is_absolute() {
        return Err(RootPathError::InvalidPath {
            path: absolute,
            reason: "base directory is not absolute",
        });
    }

    let mut pending = steps(&absolute);
    pending.reverse();

    let mut resolved = PathBuf::from(MAIN_SEPARATOR_STR);
    let mut hops = 0_usize;

    while let Some(step) = pending.pop() {
        let name = match step {
            Step::Parent => {
                resolved.pop();
                continue;
            }
            Step::Name(name) => name,
        };
        resolved.push(&name);

        let is_symlink = fs::symlink_metadata(&resolved)
            .map(|metadata| metadata.file_type().is_symlink())
            .unwrap_or(false);
        if !is_symlink {
            continue;
        }

        hops += 1;
        if hops > MAX_SYMLINK_HOPS {
            return Err(RootPathError::SymlinkLoop { path: resolved });
        }

        let target = fs::read_link(&resolved).map_err(|source| RootPathError::Io {
            path: resolved.clone(),
            source,
        })?;
        resolved.pop();
        if target.is_absolute() {
            resolved = PathBuf::from(MAIN_SEPARATOR_STR);
        }
        pending.extend(steps(&target).into_iter().rev());
    }

    Ok(resolved)
}

fn steps(path: &Path) -> Vec<Step> {
    path.components()
        .filter_map(|component| match component {
            Component::ParentDir => Some(Step::Parent),
            Component::Normal(name) => Some(Step::Name(name.to_os_string())),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => None,
        })
        .collect()
}
