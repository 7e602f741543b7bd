use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::LinkStrategy;
use crate::error::BaserError;
use crate::store::path_occupied;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Symlink,
    Hardlink,
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkOutcome {
    Created(LinkKind),
    /// Something already sits at the link path; it is left untouched.
    Existing,
}

/// Places a reference to an existing file without duplicating it where possible.
pub trait Linker: Send + Sync {
    /// `target` is interpreted relative to the directory containing `link`, the same
    /// way a relative symbolic link is resolved.
    fn link(&self, target: &Utf8Path, link: &Utf8Path) -> Result<LinkOutcome, BaserError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsLinker {
    strategy: LinkStrategy,
}

impl FsLinker {
    pub fn new(strategy: LinkStrategy) -> Self {
        Self { strategy }
    }

    fn attempt(kind: LinkKind, target: &Utf8Path, resolved: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
        match kind {
            LinkKind::Symlink => symlink(target, link),
            LinkKind::Hardlink => fs::hard_link(resolved.as_std_path(), link.as_std_path()),
            LinkKind::Copy => fs::copy(resolved.as_std_path(), link.as_std_path()).map(|_| ()),
        }
    }
}

impl Linker for FsLinker {
    fn link(&self, target: &Utf8Path, link: &Utf8Path) -> Result<LinkOutcome, BaserError> {
        if path_occupied(link) {
            return Ok(LinkOutcome::Existing);
        }
        let resolved = resolve_target(target, link);
        if !resolved.as_std_path().exists() {
            return Err(BaserError::Filesystem(format!(
                "link target {resolved} does not exist"
            )));
        }

        let kinds: &[LinkKind] = match self.strategy {
            LinkStrategy::Auto => &[LinkKind::Symlink, LinkKind::Hardlink, LinkKind::Copy],
            LinkStrategy::Symlink => &[LinkKind::Symlink],
            LinkStrategy::Hardlink => &[LinkKind::Hardlink],
            LinkStrategy::Copy => &[LinkKind::Copy],
        };

        let mut last_error = None;
        for kind in kinds {
            match Self::attempt(*kind, target, &resolved, link) {
                Ok(()) => {
                    tracing::debug!("{kind:?} {link} -> {target}");
                    return Ok(LinkOutcome::Created(*kind));
                }
                Err(err) => {
                    tracing::debug!("{kind:?} {link} failed: {err}");
                    last_error = Some(err);
                }
            }
        }
        let message = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no link strategy available".to_string());
        Err(BaserError::Filesystem(format!("link {link}: {message}")))
    }
}

pub fn resolve_target(target: &Utf8Path, link: &Utf8Path) -> Utf8PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match link.parent() {
        Some(parent) => parent.join(target),
        None => target.to_path_buf(),
    }
}

#[cfg(unix)]
fn symlink(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target.as_std_path(), link.as_std_path())
}

#[cfg(windows)]
fn symlink(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target.as_std_path(), link.as_std_path())
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Utf8Path, _link: &Utf8Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}
