// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Containment checks for report paths supplied by workflow inputs.
//!
//! Report paths are relative to the workspace root. Resolution is purely
//! lexical because the files usually do not exist yet, and containment is
//! decided on path components so that a sibling such as `/work-evil` is never
//! mistaken for a child of `/work`.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, io_error};

/// Report path validated against the workspace root.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct OutputPath
{
    relative: PathBuf,
    resolved: PathBuf,
}

impl OutputPath
{
    /// Resolves `relative` against `root` and checks that the resulting
    /// file lives inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathTraversal`] when the input is absolute, contains a
    /// `..` segment, does not name a file, or resolves outside `root`. Returns
    /// [`Error::Io`] when `root` cannot be made absolute.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    ///
    /// use actions_usage::OutputPath;
    ///
    /// let path = OutputPath::resolve(Path::new("/work",), "reports/./usage.csv",)?;
    /// assert_eq!(path.repo_path(), "reports/usage.csv");
    /// assert_eq!(path.resolved(), Path::new("/work/reports/usage.csv"));
    /// assert!(OutputPath::resolve(Path::new("/work",), "../work-evil/usage.csv",).is_err());
    /// # Ok::<(), actions_usage::Error>(())
    /// ```
    pub fn resolve(root: &Path, relative: &str,) -> Result<Self, Error,>
    {
        let rejected = || Error::PathTraversal {
            path: relative.to_owned(),
        };

        let mut normalized = PathBuf::new();
        for component in Path::new(relative,).components() {
            match component {
                Component::Normal(segment,) => normalized.push(segment,),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_,) => {
                    return Err(rejected(),);
                }
            }
        }

        if normalized.file_name().is_none() {
            return Err(rejected(),);
        }

        let root = absolute_root(root,)?;
        let resolved = root.join(&normalized,);
        let contained = resolved.parent().is_some_and(|directory| directory.starts_with(&root,),);
        if !contained {
            return Err(rejected(),);
        }

        Ok(Self {
            relative: normalized,
            resolved,
        },)
    }

    /// Absolute location of the report on the local filesystem.
    pub fn resolved(&self,) -> &Path
    {
        &self.resolved
    }

    /// Normalized relative path with `/` separators, used as the remote path.
    pub fn repo_path(&self,) -> String
    {
        self.relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy(),)
            .collect::<Vec<_,>>()
            .join("/",)
    }
}

/// Makes the workspace root absolute and drops `.` and `..` lexically.
fn absolute_root(root: &Path,) -> Result<PathBuf, Error,>
{
    let absolute = std::path::absolute(root,).map_err(|source| io_error(root, source,),)?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other,),
        }
    }

    Ok(normalized,)
}
