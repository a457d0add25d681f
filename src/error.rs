#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the actions-usage crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.

use std::path::{Path, PathBuf};

/// Unified error type returned by validation, analysis and publishing.
///
/// Variants follow the failure stages of a run. [`Error::RemoteFetch`] is
/// produced while probing for an existing remote file and is never returned
/// to callers of [`push_if_changed`](crate::push_if_changed); every other
/// variant aborts the step that raised it.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Scope selection or another input is missing, duplicated or malformed.
    #[error("{message}")]
    Configuration {
        /// Human readable message describing the configuration problem.
        message: String
    },
    /// An output path escapes the workspace root.
    #[error("{path} is not an allowed path")]
    PathTraversal {
        /// Path exactly as supplied by the user.
        path: String
    },
    /// Reading the current remote file failed.
    #[error("failed to fetch {path}: {message}")]
    RemoteFetch {
        /// Repository path of the file.
        path:    String,
        /// Message reported by the API client.
        message: String
    },
    /// Creating or updating the remote file failed.
    #[error("failed to write {path}: {message}")]
    RemoteWrite {
        /// Repository path of the file.
        path:    String,
        /// Message reported by the API client.
        message: String
    },
    /// The usage collaborator failed to produce records.
    #[error("usage analysis failed: {message}")]
    Collaborator {
        /// Human readable message describing the collaborator failure.
        message: String
    },
    /// Wraps I/O errors while writing reports or workflow outputs.
    #[error("failed to write {path:?}: {source}")]
    Io {
        /// Location of the file being written.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps JSON serialization errors.
    #[error("failed to serialize usage records: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    },
    /// The GitHub API client could not be constructed.
    #[error("failed to initialize GitHub client: {message}")]
    Client {
        /// Message reported by the client builder.
        message: String
    },
    /// Several report pushes failed in the same run.
    #[error("failed to push {count} reports: {message}")]
    Publish {
        /// Number of failed pushes.
        count:   usize,
        /// Individual failure messages joined with `; `.
        message: String
    },
    /// Step outputs could not be emitted and another failure also occurred.
    #[error("{message}")]
    Combined {
        /// Both failure messages joined with `; `.
        message: String
    }
}

impl Error {
    /// Constructs a configuration error from the provided message.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the configuration problem.
    pub fn configuration<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Configuration {
            message: message.into()
        }
    }

    /// Constructs a collaborator error from the provided message.
    pub fn collaborator<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Collaborator {
            message: message.into()
        }
    }

    /// Constructs a client error from the provided message.
    pub fn client<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Client {
            message: message.into()
        }
    }

    /// Folds several failures into one error.
    ///
    /// A single failure is returned unchanged so its message reaches the user
    /// verbatim. Returns `None` when `failures` is empty.
    pub fn aggregate(mut failures: Vec<Error>) -> Option<Self> {
        match failures.len() {
            0 => None,
            1 => failures.pop(),
            count => Some(Self::Publish {
                count,
                message: failures
                    .iter()
                    .map(Error::to_display_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            })
        }
    }

    /// Joins two failures of the same run so neither is lost.
    pub fn combine(first: Error, second: Error) -> Self {
        Self::Combined {
            message: format!("{first}; {second}")
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
