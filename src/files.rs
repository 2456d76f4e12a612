//! File-store collaborator.

use failure::Fail;
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::Builder as TempBuilder;
use uuid::Uuid;

use crate::error::ApiError;

pub use crate::db::models::FileRef;

/// Extensions of files which can be uploaded.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// Default maximal size of an uploaded file (10 MiB).
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// A file uploaded by a user.
#[derive(Clone, Debug)]
pub struct Upload {
    /// Name of the file on the uploader's system.
    pub name: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new<N: Into<String>, D: Into<Vec<u8>>>(name: N, data: D) -> Upload {
        Upload {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Lower-cased extension of the file name, without the leading dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
    }
}

/// Storage for uploaded files.
pub trait FileStore: Send + Sync {
    /// Validate and store an uploaded file.
    fn store(&self, upload: &Upload) -> Result<FileRef, FileError>;

    /// Remove a stored file.
    ///
    /// Removing a file which does not exist is not an error.
    fn delete(&self, file: &FileRef) -> Result<(), FileError>;

    fn exists(&self, file: &FileRef) -> bool;
}

/// File store keeping files in a local directory.
#[derive(Clone, Debug)]
pub struct LocalFileStore {
    root: PathBuf,
    max_size: u64,
}

impl LocalFileStore {
    pub fn new<P: Into<PathBuf>>(root: P, max_size: u64) -> LocalFileStore {
        LocalFileStore {
            root: root.into(),
            max_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a stored file.
    pub fn path(&self, file: &FileRef) -> PathBuf {
        self.root.join(&file.path)
    }

    /// Check that an upload may be stored.
    pub fn validate(&self, upload: &Upload) -> Result<String, FileError> {
        let ext = match upload.extension() {
            Some(ref ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) =>
                ext.clone(),
            _ => return Err(FileError::Unsupported(upload.name.clone())),
        };

        if upload.data.len() as u64 > self.max_size {
            return Err(FileError::TooLarge(self.max_size));
        }

        Ok(ext)
    }
}

impl FileStore for LocalFileStore {
    fn store(&self, upload: &Upload) -> Result<FileRef, FileError> {
        let ext = self.validate(upload)?;
        let name = format!("{}.{}", Uuid::new_v4(), ext);

        let mut tmp = TempBuilder::new().tempfile_in(&self.root)?;
        tmp.write_all(&upload.data)?;
        tmp.persist(self.root.join(&name))?;

        debug!("Stored {} as {}", upload.name, name);

        Ok(FileRef {
            path: name,
            name: upload.name.clone(),
        })
    }

    fn delete(&self, file: &FileRef) -> Result<(), FileError> {
        match std::fs::remove_file(self.path(file)) {
            Ok(()) => Ok(()),
            Err(ref err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn exists(&self, file: &FileRef) -> bool {
        self.path(file).is_file()
    }
}

#[derive(ApiError, Debug, Fail)]
pub enum FileError {
    #[api(code = "file:unsupported-type", status = "BAD_REQUEST")]
    #[fail(display = "Only PDF, DOC, and DOCX files are allowed: {}", _0)]
    Unsupported(String),
    #[api(code = "file:too-large", status = "PAYLOAD_TOO_LARGE")]
    #[fail(display = "File exceeds the maximal size of {} bytes", _0)]
    TooLarge(u64),
    #[api(internal)]
    #[fail(display = "System error: {}", _0)]
    System(#[cause] io::Error),
}

impl_from! { for FileError ;
    io::Error => |e| FileError::System(e),
    tempfile::PersistError => |e| FileError::System(e.error),
}
