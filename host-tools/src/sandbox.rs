//! Sandbox path confinement.
//!
//! Tools never touch a script-supplied path directly: they resolve it against
//! the context's [`SandboxRoot`] first. [`SandboxRoot::resolve`] is purely
//! lexical and does not follow symlinks, so a link inside the sandbox that
//! points outward is not caught by it. [`SandboxRoot::resolve_existing`] adds a
//! filesystem check that canonicalises the deepest existing ancestor and
//! rejects such escapes.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use host_primitives::ErrorKind;
use thiserror::Error;
use tracing::{debug, warn};

const FALLBACK_ROOT: &str = "/";

/// Errors produced while confining a path to the sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Input path was empty.
    #[error("path cannot be empty")]
    Empty,

    /// Input path contained a NUL byte.
    #[error("path contains a NUL byte")]
    NulByte,

    /// Input path was absolute.
    #[error("absolute path `{path}` is not allowed; use a path relative to the sandbox root")]
    Absolute {
        /// Offending input.
        path: String,
    },

    /// Resolved path lies outside the sandbox root.
    #[error("path `{path}` escapes sandbox root `{}`", .root.display())]
    Escape {
        /// Offending input.
        path: String,
        /// Sandbox root the path was resolved against.
        root: PathBuf,
    },

    /// Sandbox root is relative and could not be made absolute, so it admits
    /// no path at all.
    #[error("sandbox root `{}` could not be made absolute", .root.display())]
    Unresolved {
        /// Root as configured.
        root: PathBuf,
    },

    /// Filesystem lookup failed while checking for symlink escapes.
    #[error("failed to inspect `{}`: {source}", .path.display())]
    Io {
        /// Path being inspected.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl SandboxError {
    /// Returns the host-facing error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Empty | Self::NulByte | Self::Absolute { .. } | Self::Escape { .. } => {
                ErrorKind::PathViolation
            }
            Self::Unresolved { .. } => ErrorKind::Configuration,
            Self::Io { .. } => ErrorKind::Execution,
        }
    }
}

/// Absolute, lexically-cleaned directory all relative tool paths are confined to.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SandboxRoot(PathBuf);

impl SandboxRoot {
    /// Creates a sandbox root.
    ///
    /// Relative roots are made absolute against the current directory. An
    /// empty root falls back to `/` with a warning. A relative root that cannot
    /// be made absolute is kept as given and rejects every path with
    /// [`SandboxError::Unresolved`].
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_current_dir(root.as_ref(), std::env::current_dir)
    }

    fn with_current_dir(root: &Path, current_dir: impl FnOnce() -> io::Result<PathBuf>) -> Self {
        if root.as_os_str().is_empty() {
            warn!(fallback = FALLBACK_ROOT, "sandbox root is empty; falling back");
            return Self(PathBuf::from(FALLBACK_ROOT));
        }

        if root.is_absolute() {
            return Self(clean_path(root));
        }
        match current_dir() {
            Ok(cwd) => Self(clean_path(&cwd.join(root))),
            Err(err) => {
                warn!(
                    root = %root.display(),
                    error = %err,
                    "cannot make sandbox root absolute; every path will be rejected"
                );
                Self(clean_path(root))
            }
        }
    }

    /// Whether the root is absolute and can admit paths.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.0.is_absolute()
    }

    /// Returns the root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Confines `input` to the sandbox lexically.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError`] for an unresolved root, empty input, NUL
    /// bytes, absolute input, or a path whose cleaned form leaves the root.
    pub fn resolve(&self, input: &str) -> Result<PathBuf, SandboxError> {
        if !self.is_resolved() {
            return Err(SandboxError::Unresolved {
                root: self.0.clone(),
            });
        }
        if input.is_empty() {
            return Err(SandboxError::Empty);
        }
        if input.contains('\0') {
            return Err(SandboxError::NulByte);
        }

        let candidate = Path::new(input);
        if candidate.is_absolute()
            || candidate
                .components()
                .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
        {
            return Err(SandboxError::Absolute {
                path: input.to_owned(),
            });
        }

        let joined = clean_path(&self.0.join(candidate));
        match relative_to(&self.0, &joined) {
            Some(_) => Ok(joined),
            None => {
                debug!(path = input, root = %self.0.display(), "sandbox escape rejected");
                Err(SandboxError::Escape {
                    path: input.to_owned(),
                    root: self.0.clone(),
                })
            }
        }
    }

    /// Confines `input` and additionally rejects escapes through symlinks.
    ///
    /// The deepest existing ancestor of the lexical result is canonicalised and
    /// must stay under the canonicalised root; the non-existing tail is then
    /// appended unchanged. The returned path is the canonical one.
    ///
    /// # Errors
    ///
    /// Returns everything [`SandboxRoot::resolve`] does, plus
    /// [`SandboxError::Escape`] when a symlink leads outside the root and
    /// [`SandboxError::Io`] when the filesystem cannot be inspected.
    pub fn resolve_existing(&self, input: &str) -> Result<PathBuf, SandboxError> {
        let lexical = self.resolve(input)?;
        let real_root = fs::canonicalize(&self.0).map_err(|source| SandboxError::Io {
            path: self.0.clone(),
            source,
        })?;

        let mut existing = lexical.as_path();
        let mut tail = Vec::new();
        loop {
            match fs::symlink_metadata(existing) {
                Ok(_) => break,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    let (Some(name), Some(parent)) = (existing.file_name(), existing.parent())
                    else {
                        return Err(SandboxError::Io {
                            path: existing.to_path_buf(),
                            source: err,
                        });
                    };
                    tail.push(name.to_owned());
                    existing = parent;
                }
                Err(source) => {
                    return Err(SandboxError::Io {
                        path: existing.to_path_buf(),
                        source,
                    });
                }
            }
        }

        let real = fs::canonicalize(existing).map_err(|source| SandboxError::Io {
            path: existing.to_path_buf(),
            source,
        })?;
        if !real.starts_with(&real_root) {
            warn!(
                path = input,
                target = %real.display(),
                root = %real_root.display(),
                "symlink escape rejected"
            );
            return Err(SandboxError::Escape {
                path: input.to_owned(),
                root: self.0.clone(),
            });
        }

        let mut resolved = real;
        for segment in tail.iter().rev() {
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

impl AsRef<Path> for SandboxRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Resolves `input` against `sandbox_root`, rejecting anything that escapes it.
///
/// # Errors
///
/// See [`SandboxRoot::resolve`].
pub fn resolve_and_secure_path(
    input: &str,
    sandbox_root: impl AsRef<Path>,
) -> Result<PathBuf, SandboxError> {
    SandboxRoot::new(sandbox_root).resolve(input)
}

/// Lexically cleans a path: drops `.`, collapses `name/..`, and keeps `..`
/// from climbing above a root.
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                parts.push(component);
            }
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Relative path from `root` to `path`, or `None` when it would start with `..`.
fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(root).ok()?;
    if matches!(relative.components().next(), Some(Component::ParentDir)) {
        return None;
    }
    if relative.as_os_str().is_empty() {
        return Some(PathBuf::from("."));
    }
    Some(relative.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_path_inside_root() {
        let resolved = resolve_and_secure_path("a/b.txt", "/sandbox").expect("inside");
        assert_eq!(resolved, PathBuf::from("/sandbox/a/b.txt"));
    }

    #[test]
    fn rejects_parent_escape() {
        let err = resolve_and_secure_path("../x", "/sandbox").expect_err("escape");
        assert!(matches!(err, SandboxError::Escape { .. }));
    }

    #[test]
    fn rejects_absolute_input() {
        let err = resolve_and_secure_path("/etc/passwd", "/sandbox").expect_err("absolute");
        assert!(matches!(err, SandboxError::Absolute { .. }));
    }

    #[test]
    fn rejects_escape_after_cleaning() {
        let err = resolve_and_secure_path("a/../../etc/passwd", "/sandbox").expect_err("escape");
        assert!(matches!(err, SandboxError::Escape { .. }));
    }

    #[test]
    fn rejects_empty_and_nul_input() {
        assert!(matches!(
            resolve_and_secure_path("", "/sandbox"),
            Err(SandboxError::Empty)
        ));
        assert!(matches!(
            resolve_and_secure_path("a\0b", "/sandbox"),
            Err(SandboxError::NulByte)
        ));
    }

    #[test]
    fn current_dir_resolves_to_root() {
        assert_eq!(
            resolve_and_secure_path(".", "/sandbox").expect("root"),
            PathBuf::from("/sandbox")
        );
        assert_eq!(
            resolve_and_secure_path("a/..", "/sandbox").expect("root"),
            PathBuf::from("/sandbox")
        );
    }

    #[test]
    fn sibling_with_shared_prefix_is_outside() {
        let err = resolve_and_secure_path("../sandbox-other/x", "/sandbox").expect_err("sibling");
        assert!(matches!(err, SandboxError::Escape { .. }));
    }

    #[test]
    fn root_is_cleaned_and_never_empty() {
        assert_eq!(SandboxRoot::new("/data/./x/../y/").path(), Path::new("/data/y"));
        assert_eq!(SandboxRoot::new("").path(), Path::new("/"));
        assert!(SandboxRoot::new("relative/dir").path().is_absolute());
    }

    #[test]
    fn unresolvable_relative_root_admits_nothing() {
        let root = SandboxRoot::with_current_dir(Path::new("scripts"), || {
            Err(io::Error::new(io::ErrorKind::NotFound, "cwd removed"))
        });
        assert!(!root.is_resolved());

        for input in ["etc/passwd", ".", "scripts/a.txt"] {
            let err = root.resolve(input).expect_err("unresolved root");
            assert!(matches!(err, SandboxError::Unresolved { .. }), "{input}: {err}");
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
        assert!(matches!(
            root.resolve_existing("etc/passwd"),
            Err(SandboxError::Unresolved { .. })
        ));
    }

    #[test]
    fn io_failures_are_not_path_violations() {
        let err = SandboxError::Io {
            path: PathBuf::from("/sandbox/x"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(SandboxError::Empty.kind(), ErrorKind::PathViolation);
    }

    #[cfg(unix)]
    #[test]
    fn resolve_existing_reports_unreadable_parents_as_io() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).expect("mkdir");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod");
        let root = SandboxRoot::new(dir.path());

        let outcome = root.resolve_existing("locked/inner/file.txt");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("restore");

        // Privileged test runners can still traverse the directory.
        if let Err(err) = outcome {
            assert!(matches!(err, SandboxError::Io { .. }), "{err}");
            assert_eq!(err.kind(), ErrorKind::Execution);
        }
    }

    #[test]
    fn clean_path_never_climbs_above_root() {
        assert_eq!(clean_path(Path::new("/../../etc")), PathBuf::from("/etc"));
        assert_eq!(clean_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(clean_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(clean_path(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn resolve_existing_allows_new_files_in_real_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("sub")).expect("mkdir");
        let root = SandboxRoot::new(dir.path());

        let resolved = root.resolve_existing("sub/new.txt").expect("inside");
        let real_root = fs::canonicalize(dir.path()).expect("canonical");
        assert_eq!(resolved, real_root.join("sub").join("new.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_existing_rejects_symlink_escape() {
        let outside = tempfile::tempdir().expect("outside");
        let dir = tempfile::tempdir().expect("sandbox");
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).expect("symlink");
        let root = SandboxRoot::new(dir.path());

        // The lexical check alone does not see through the link.
        assert!(root.resolve("link/secret.txt").is_ok());

        let err = root
            .resolve_existing("link/secret.txt")
            .expect_err("symlink escape");
        assert!(matches!(err, SandboxError::Escape { .. }));
    }
}
