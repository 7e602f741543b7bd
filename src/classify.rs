use camino::Utf8PathBuf;
use serde::Serialize;

use crate::domain::Classification;
use crate::error::BaserError;
use crate::link::{LinkOutcome, Linker};
use crate::store::{Store, ensure_dir};

/// Buckets a canonical file name by the markers NCBI puts in DEFINITION lines.
///
/// The `_genome` test is a plain substring test, so `_genome` anywhere in the
/// name counts, not only as a suffix.
pub fn classify(file_name: &str) -> Classification {
    if file_name.contains("complete_sequence") {
        Classification::Plasmid
    } else if file_name.contains("complete_genome") || file_name.contains("_genome") {
        Classification::Genome
    } else {
        Classification::Unclassified
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub genome: Vec<String>,
    pub plasmid: Vec<String>,
    pub unclassified: Vec<String>,
}

/// Splits file names into buckets, keeping input order. Unclassified names are
/// reported and excluded from both partitions.
pub fn partition(file_names: &[String]) -> Partition {
    let mut out = Partition::default();
    for name in file_names {
        match classify(name) {
            Classification::Genome => out.genome.push(name.clone()),
            Classification::Plasmid => out.plasmid.push(name.clone()),
            Classification::Unclassified => {
                let err = BaserError::ClassificationAmbiguous(name.clone());
                tracing::warn!("{err}; continuing");
                out.unclassified.push(name.clone());
            }
        }
    }
    out
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionReport {
    pub genome_dir: Option<Utf8PathBuf>,
    pub plasmid_dir: Option<Utf8PathBuf>,
    pub links_created: usize,
}

/// Creates `plasmid/` and `genome/` if needed and links every classified file
/// into its bucket as `../<name>`. Existing entries are kept.
pub fn materialize(
    store: &Store,
    partition: &Partition,
    linker: &dyn Linker,
) -> Result<PartitionReport, BaserError> {
    let mut report = PartitionReport::default();
    for (bucket, names) in [
        (Classification::Plasmid, &partition.plasmid),
        (Classification::Genome, &partition.genome),
    ] {
        let Some(dir) = store.partition_dir(bucket) else {
            continue;
        };
        ensure_dir(&dir)?;
        for name in names {
            let target = Utf8PathBuf::from("..").join(name);
            let outcome = linker.link(&target, &dir.join(name))?;
            if matches!(outcome, LinkOutcome::Created(_)) {
                report.links_created += 1;
            }
        }
        match bucket {
            Classification::Plasmid => report.plasmid_dir = Some(dir),
            Classification::Genome => report.genome_dir = Some(dir),
            Classification::Unclassified => {}
        }
    }
    Ok(report)
}

/// Classifies and materializes, returning only the genome file names.
pub fn partition_genomes(
    store: &Store,
    file_names: &[String],
    linker: &dyn Linker,
) -> Result<Vec<String>, BaserError> {
    let partition = partition(file_names);
    materialize(store, &partition, linker)?;
    Ok(partition.genome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_sequence_wins_over_genome_markers() {
        assert_eq!(
            classify("Escherichia_coli_plasmid_pX_complete_sequence_genome.fna"),
            Classification::Plasmid
        );
    }

    #[test]
    fn genome_markers() {
        assert_eq!(classify("NC_000913_complete_genome.fna"), Classification::Genome);
        assert_eq!(
            classify("Klebsiella_pneumoniae_chromosome_genome.fna"),
            Classification::Genome
        );
        assert_eq!(classify("random_file.fna"), Classification::Unclassified);
    }

    #[test]
    fn genome_marker_matches_mid_name() {
        assert_eq!(
            classify("Salmonella_genome_assembly_contig_1.fna"),
            Classification::Genome
        );
    }

    #[test]
    fn unclassified_names_are_excluded() {
        let names = vec![
            "a_complete_genome.fna".to_string(),
            "random_file.fna".to_string(),
            "p1_complete_sequence.fna".to_string(),
        ];
        let split = partition(&names);
        assert_eq!(split.genome, vec!["a_complete_genome.fna"]);
        assert_eq!(split.plasmid, vec!["p1_complete_sequence.fna"]);
        assert_eq!(split.unclassified, vec!["random_file.fna"]);
    }
}
