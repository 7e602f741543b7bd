use std::fs;
use std::io::Write;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{Classification, DerivedIdentifier, OrganismTarget};
use crate::error::BaserError;

pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const PROKKA_DIR_NAME: &str = "prokka";

/// Layout of one organism database: `<db_base>/<Genus_species>/`.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    /// Resolves the organism directory under an existing database base. Nothing is
    /// created on disk.
    pub fn open(db_base: &Path, target: &OrganismTarget) -> Result<Self, BaserError> {
        if !db_base.is_dir() {
            return Err(BaserError::MissingDatabaseLocation(db_base.to_path_buf()));
        }
        let absolute = std::path::absolute(db_base)
            .map_err(|err| BaserError::Filesystem(err.to_string()))?;
        let base = Utf8PathBuf::from_path_buf(absolute)
            .map_err(|_| BaserError::Filesystem("non-utf8 database location".to_string()))?;
        Ok(Self::new_with_root(base.join(target.dir_name())))
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn fasta_path(&self, id: &DerivedIdentifier) -> Utf8PathBuf {
        self.root.join(id.fasta_name())
    }

    pub fn link_path(&self, id: &DerivedIdentifier) -> Utf8PathBuf {
        self.root.join(id.link_name())
    }

    pub fn partition_dir(&self, bucket: Classification) -> Option<Utf8PathBuf> {
        bucket.dir_name().map(|name| self.root.join(name))
    }

    pub fn prokka_dir(&self) -> Utf8PathBuf {
        self.root.join(PROKKA_DIR_NAME)
    }

    pub fn protein_collection_path(&self, genus: &str) -> Utf8PathBuf {
        self.prokka_dir().join(format!("{genus}.faa"))
    }

    pub fn clustered_path(&self, genus: &str) -> Utf8PathBuf {
        self.prokka_dir().join(genus)
    }

    pub fn metadata_path(&self) -> Utf8PathBuf {
        self.root.join(METADATA_FILE_NAME)
    }

    pub fn ensure_root(&self) -> Result<(), BaserError> {
        ensure_dir(&self.root)
    }

    /// Regular files directly under the root with the given extension, sorted by
    /// name. Symbolic links are never raw records.
    pub fn raw_record_candidates(&self, extension: &str) -> Result<Vec<Utf8PathBuf>, BaserError> {
        let mut out = Vec::new();
        let entries = fs::read_dir(self.root.as_std_path())
            .map_err(|err| BaserError::Filesystem(format!("read {}: {err}", self.root)))?;
        for entry in entries {
            let entry = entry.map_err(|err| BaserError::Filesystem(err.to_string()))?;
            let file_type = entry
                .file_type()
                .map_err(|err| BaserError::Filesystem(err.to_string()))?;
            if !file_type.is_file() {
                continue;
            }
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                tracing::warn!("skipping non-utf8 path {}", entry.path().display());
                continue;
            };
            let matches = path
                .extension()
                .map(|value| value.eq_ignore_ascii_case(extension))
                .unwrap_or(false);
            if matches {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), BaserError> {
        let parent = path
            .parent()
            .ok_or_else(|| BaserError::Filesystem("invalid destination path".to_string()))?;
        ensure_dir(parent)?;
        let mut temp = tempfile::Builder::new()
            .prefix(".genomebaser")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| BaserError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| BaserError::Filesystem(err.to_string()))?;
        // Temp files are created 0600; keep the replaced file's mode, or a regular one.
        let permissions = match fs::metadata(path.as_std_path()) {
            Ok(existing) => Some(existing.permissions()),
            Err(_) => default_permissions(),
        };
        if let Some(permissions) = permissions {
            temp.as_file()
                .set_permissions(permissions)
                .map_err(|err| BaserError::Filesystem(err.to_string()))?;
        }
        temp.persist(path.as_std_path())
            .map_err(|err| BaserError::Filesystem(format!("write {path}: {err}")))?;
        Ok(())
    }

    pub fn write_metadata(&self, metadata: &RunMetadata) -> Result<(), BaserError> {
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| BaserError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(&self.metadata_path(), &content)
    }

    pub fn read_metadata(&self) -> Result<Option<RunMetadata>, BaserError> {
        let path = self.metadata_path();
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| BaserError::Filesystem(err.to_string()))?;
        let metadata = serde_json::from_str(&content)
            .map_err(|err| BaserError::Filesystem(format!("{path}: {err}")))?;
        Ok(Some(metadata))
    }
}

/// Summary of the last completed run, stored at the organism root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub organism: String,
    pub started_at: String,
    pub completed_at: String,
    pub tool: String,
    pub raw_records: usize,
    pub converted: usize,
    pub genomes: usize,
    pub plasmids: usize,
    pub unclassified: usize,
    pub reference: Option<String>,
}

pub fn ensure_dir(path: &Utf8Path) -> Result<(), BaserError> {
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| BaserError::Filesystem(format!("create {path}: {err}")))
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

/// `lexists`: true for dangling symbolic links as well.
pub fn path_occupied(path: &Utf8Path) -> bool {
    fs::symlink_metadata(path.as_std_path()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new_with_root(Utf8PathBuf::from("/db/Klebsiella_pneumoniae"));
        let id = DerivedIdentifier::derive("Klebsiella pneumoniae strain X complete genome").unwrap();

        assert!(store.fasta_path(&id).ends_with(
            "Klebsiella_pneumoniae/Klebsiella_pneumoniae_strain_X_complete_genome.fna"
        ));
        assert!(
            store
                .partition_dir(Classification::Plasmid)
                .unwrap()
                .ends_with("Klebsiella_pneumoniae/plasmid")
        );
        assert!(store.partition_dir(Classification::Unclassified).is_none());
        assert!(
            store
                .clustered_path("Klebsiella")
                .ends_with("prokka/Klebsiella")
        );
    }
}
