//! Persistence of metadata documents keyed by phenotype file identity.
//!
//! Callers that serve many extraction requests keep one [`Metadata`] per
//! phenotype file and hand it to [`crate::reader::TableReader`] instead of
//! re-inferring. [`DirectoryStore`] keeps each document as `<id>.json` under
//! a base directory.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    error::{PhenoError, Result},
    metadata::Metadata,
};

pub trait MetadataStore {
    fn get(&self, id: &str) -> Result<Option<Metadata>>;

    fn put(&self, id: &str, metadata: &Metadata) -> Result<()>;

    /// Returns whether a document was removed.
    fn remove(&self, id: &str) -> Result<bool>;

    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    base: PathBuf,
}

impl DirectoryStore {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    fn document_path(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id != "."
            && !id.contains("..")
            && !id.contains(['/', '\\', '\0']);
        if !valid {
            return Err(PhenoError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid metadata id '{id}'"),
            )));
        }
        Ok(self.base.join(format!("{id}.json")))
    }
}

impl MetadataStore for DirectoryStore {
    fn get(&self, id: &str) -> Result<Option<Metadata>> {
        let path = self.document_path(id)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Metadata::from_json_str(&raw).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, id: &str, metadata: &Metadata) -> Result<()> {
        let path = self.document_path(id)?;
        fs::create_dir_all(&self.base)?;
        fs::write(&path, metadata.to_json_string()?)?;
        debug!("Stored metadata '{id}' at {path:?}");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let path = self.document_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
