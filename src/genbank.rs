//! GenBank flat-file loading.
//!
//! Archive files carry a CONTIG continuation that the flat-file reader rejects,
//! so matching lines are removed on disk before `gb_io` parses the records.

use std::fs;
use std::io::Write;
use std::path::Path;

use bio::io::fasta;
use camino::Utf8Path;
use gb_io::reader::SeqReader;
use gb_io::seq::Seq;

use crate::error::BaserError;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    /// VERSION accession when present, otherwise ACCESSION, otherwise the LOCUS name.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Upper-cased residues.
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    fn from_seq(seq: Seq) -> Self {
        let name = seq.name.unwrap_or_default();
        let first_token = |value: Option<String>| {
            value.and_then(|value| value.split_whitespace().next().map(str::to_string))
        };
        let id = first_token(seq.version)
            .or_else(|| first_token(seq.accession))
            .unwrap_or_else(|| name.clone());
        let mut description = seq
            .definition
            .map(|definition| definition.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        if description.ends_with('.') {
            description.pop();
        }
        Self {
            id,
            name,
            description,
            sequence: seq.seq.to_ascii_uppercase(),
        }
    }

    /// `>id description` followed by the sequence.
    pub fn write_fasta<W: Write>(&self, writer: W) -> std::io::Result<()> {
        let mut writer = fasta::Writer::new(writer);
        let description = (!self.description.is_empty()).then_some(self.description.as_str());
        writer.write(&self.id, description, &self.sequence)?;
        writer.flush()
    }

    pub fn to_fasta(&self) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.sequence.len() + self.description.len() + 64);
        self.write_fasta(&mut out)?;
        Ok(out)
    }
}

/// A raw record file after cleaning and parsing.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub removed_lines: usize,
    pub records: Vec<SequenceRecord>,
}

/// Cleans `path` in place and parses every record in it.
pub fn load(path: &Utf8Path, malformed_pattern: &str) -> Result<LoadedFile, BaserError> {
    let removed_lines = strip_malformed_lines(path, malformed_pattern)?;
    let records = read_records(path.as_std_path())?;
    Ok(LoadedFile {
        removed_lines,
        records,
    })
}

/// Removes every line containing `pattern`. The file is only rewritten when
/// something was removed, so a second pass is a no-op. Works on raw bytes, so
/// content in any encoding is preserved.
pub fn strip_malformed_lines(path: &Utf8Path, pattern: &str) -> Result<usize, BaserError> {
    let content = fs::read(path.as_std_path())
        .map_err(|err| BaserError::Filesystem(format!("read {path}: {err}")))?;
    let pattern = pattern.as_bytes();
    let mut removed = 0usize;
    let mut cleaned = Vec::with_capacity(content.len());
    for line in content.split_inclusive(|byte| *byte == b'\n') {
        if contains(line, pattern) {
            removed += 1;
        } else {
            cleaned.extend_from_slice(line);
        }
    }
    if removed > 0 {
        tracing::debug!("removed {removed} malformed line(s) from {path}");
        Store::write_bytes_atomic(path, &cleaned)?;
    }
    Ok(removed)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

pub fn read_records(path: &Path) -> Result<Vec<SequenceRecord>, BaserError> {
    let content = fs::read(path)
        .map_err(|err| BaserError::Filesystem(format!("read {}: {err}", path.display())))?;
    parse_bytes(&content, path)
}

/// Parses GenBank content. Text that is not valid UTF-8 is rejected as a whole.
/// `path` is only used for error reporting.
pub fn parse_bytes(content: &[u8], path: &Path) -> Result<Vec<SequenceRecord>, BaserError> {
    let parse_error = |message: String| BaserError::Parse {
        path: path.to_path_buf(),
        message,
    };
    if let Err(err) = std::str::from_utf8(content) {
        return Err(parse_error(format!(
            "not valid UTF-8 at byte {}",
            err.valid_up_to()
        )));
    }

    SeqReader::new(content)
        .map(|seq| {
            seq.map(SequenceRecord::from_seq)
                .map_err(|err| parse_error(err.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "\
LOCUS       NC_000913                120 bp    DNA     circular CON 09-MAR-2016
DEFINITION  Escherichia coli str. K-12 substr. MG1655, complete
            genome.
ACCESSION   NC_000913
VERSION     NC_000913.3
ORIGIN
        1 agcttttcat tctgactgca acgggcaata tgtctctgtg tggattaaaa aaagagtgtc
       61 tgatagcagc ttctgaactg gttacctgcc gtgagtaaat taaaatttta ttgacttagg
//
";

    #[test]
    fn parses_definition_continuation() {
        let records = parse_bytes(MINIMAL.as_bytes(), Path::new("test.gbk")).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, "NC_000913.3");
        assert_eq!(record.name, "NC_000913");
        assert_eq!(
            record.description,
            "Escherichia coli str. K-12 substr. MG1655, complete genome"
        );
        assert_eq!(record.sequence.len(), 120);
        assert!(record.sequence.starts_with(b"AGCTTTTCAT"));
    }

    #[test]
    fn fasta_header_carries_id_and_description() {
        let records = parse_bytes(MINIMAL.as_bytes(), Path::new("test.gbk")).unwrap();
        let fasta = String::from_utf8(records[0].to_fasta().unwrap()).unwrap();
        let lines = fasta.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            ">NC_000913.3 Escherichia coli str. K-12 substr. MG1655, complete genome"
        );
        assert_eq!(lines[1..].concat().len(), 120);
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let mut bytes = MINIMAL.as_bytes().to_vec();
        let at = MINIMAL.find("MG1655").unwrap();
        bytes[at] = 0xE9;
        let err = parse_bytes(&bytes, Path::new("latin1.gbk")).unwrap_err();
        assert!(matches!(err, BaserError::Parse { .. }));
        assert!(err.is_recoverable());
    }
}
