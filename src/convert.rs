use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::domain::DerivedIdentifier;
use crate::error::BaserError;
use crate::genbank::{self, SequenceRecord};
use crate::link::{LinkOutcome, Linker};
use crate::store::Store;

/// A per-item problem that was reported and skipped.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub item: String,
    pub error: String,
}

impl ItemFailure {
    pub fn new(item: impl Into<String>, error: &BaserError) -> Self {
        Self {
            item: item.into(),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    pub raw_records: Vec<Utf8PathBuf>,
    /// `<id>.fna` names written this run, in processing order. Two records deriving
    /// the same identifier both appear.
    pub fasta_files: Vec<String>,
    pub links_created: usize,
    pub removed_lines: usize,
    /// Regular `<id>.gbk` files named after their own record; not converted.
    pub skipped_artifacts: Vec<Utf8PathBuf>,
    pub failures: Vec<ItemFailure>,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions<'a> {
    pub extension: &'a str,
    pub malformed_pattern: &'a str,
}

pub fn convert_all(
    store: &Store,
    options: &ConvertOptions<'_>,
    linker: &dyn Linker,
) -> Result<ConversionReport, BaserError> {
    let mut report = ConversionReport::default();
    for raw in store.raw_record_candidates(options.extension)? {
        convert_file(store, &raw, options, linker, &mut report)?;
    }
    Ok(report)
}

/// Converts one raw file. Parse problems are recorded in `report`; only
/// filesystem failures are returned.
pub fn convert_file(
    store: &Store,
    raw: &Utf8Path,
    options: &ConvertOptions<'_>,
    linker: &dyn Linker,
    report: &mut ConversionReport,
) -> Result<(), BaserError> {
    let loaded = match genbank::load(raw, options.malformed_pattern) {
        Ok(loaded) => loaded,
        Err(err) if err.is_recoverable() => {
            tracing::warn!("{err}; skipping file");
            report.failures.push(ItemFailure::new(raw.as_str(), &err));
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    report.removed_lines += loaded.removed_lines;

    let derived = loaded
        .records
        .iter()
        .map(|record| (record, DerivedIdentifier::derive(&record.description)))
        .collect::<Vec<_>>();

    if is_link_artifact(raw, &derived) {
        tracing::warn!("{raw} is named after its own record identifier; treating it as a link artifact and skipping it");
        report.skipped_artifacts.push(raw.to_path_buf());
        return Ok(());
    }
    report.raw_records.push(raw.to_path_buf());

    let Some(raw_name) = raw.file_name() else {
        return Err(BaserError::Filesystem(format!("invalid raw record path {raw}")));
    };

    for (record, id) in derived {
        let id = match id {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!("{raw} record {}: {err}", record.id);
                report
                    .failures
                    .push(ItemFailure::new(format!("{raw}:{}", record.id), &err));
                continue;
            }
        };
        if record.sequence.is_empty() {
            let err = BaserError::Parse {
                path: raw.as_std_path().to_path_buf(),
                message: format!("record {} has no sequence data", record.id),
            };
            tracing::warn!("{err}; skipping record");
            report
                .failures
                .push(ItemFailure::new(format!("{raw}:{}", record.id), &err));
            continue;
        }

        write_fasta(store, &id, record)?;
        report.fasta_files.push(id.fasta_name());

        let outcome = linker.link(Utf8Path::new(raw_name), &store.link_path(&id))?;
        if matches!(outcome, LinkOutcome::Created(_)) {
            report.links_created += 1;
        }
    }
    Ok(())
}

fn write_fasta(store: &Store, id: &DerivedIdentifier, record: &SequenceRecord) -> Result<(), BaserError> {
    let path = store.fasta_path(id);
    tracing::debug!("writing {path}");
    let fasta = record
        .to_fasta()
        .map_err(|err| BaserError::Filesystem(format!("format {path}: {err}")))?;
    Store::write_bytes_atomic(&path, &fasta)
}

/// Hard-link and copy fallbacks leave `<id>.gbk` as a regular file next to the
/// raw records. Such a file is named after an identifier derived from its own
/// content, which a mirrored archive file never is.
fn is_link_artifact(
    raw: &Utf8Path,
    derived: &[(&SequenceRecord, Result<DerivedIdentifier, BaserError>)],
) -> bool {
    let Some(name) = raw.file_name() else {
        return false;
    };
    derived.iter().any(|(_, id)| match id {
        Ok(id) => id.link_name() == name,
        Err(_) => false,
    })
}
