//! Input file lifecycle - Files arrive in `received` and end up in `processed` or `error`.

use crate::errors::{Error, Result};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

/// Logical location of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileLocation {
    /// Waiting to be processed
    Received,
    /// Processed successfully
    Processed,
    /// Processing failed
    Error,
}

impl FileLocation {
    /// Directory the location maps to under the file root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Processed => "processed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Moves input files between their logical locations.
pub trait FileMover {
    /// Path of `file_name` at `location`.
    fn path(&self, file_name: &str, location: FileLocation) -> PathBuf;

    /// Moves `file_name` from one location to another, returning the new path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist at `from` or cannot be moved.
    fn move_file(&self, file_name: &str, from: FileLocation, to: FileLocation)
    -> Result<PathBuf>;
}

/// [`FileMover`] over `<root>/<location>/` directories on the local disk.
#[derive(Debug, Clone)]
pub struct LocalFileMover {
    root: PathBuf,
}

impl LocalFileMover {
    /// Creates a mover rooted at `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl FileMover for LocalFileMover {
    fn path(&self, file_name: &str, location: FileLocation) -> PathBuf {
        self.root.join(location.dir_name()).join(file_name)
    }

    fn move_file(
        &self,
        file_name: &str,
        from: FileLocation,
        to: FileLocation,
    ) -> Result<PathBuf> {
        let source = self.path(file_name, from);
        if !source.exists() {
            return Err(Error::MissingFile {
                path: source.display().to_string(),
            });
        }
        let destination = self.path(file_name, to);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&source, &destination)?;
        tracing::info!(file = file_name, %from, %to, "Moved file");
        Ok(destination)
    }
}
