use assert_matches::assert_matches;

use genomebaser::classify::{classify, partition};
use genomebaser::domain::{Classification, DerivedIdentifier, OrganismTarget};
use genomebaser::error::BaserError;

#[test]
fn parse_organism_target() {
    let target: OrganismTarget = "escherichia coli".parse().unwrap();
    assert_eq!(target.genus(), "Escherichia");
    assert_eq!(target.to_string(), "Escherichia coli");
    assert_eq!(target.dir_name(), "Escherichia_coli");
}

#[test]
fn parse_organism_target_invalid() {
    let err = "Escherichia".parse::<OrganismTarget>().unwrap_err();
    assert_matches!(err, BaserError::InvalidOrganism(_));

    let err = OrganismTarget::new("", "coli").unwrap_err();
    assert_matches!(err, BaserError::InvalidOrganism(_));
}

#[test]
fn identifier_is_deterministic() {
    let description = "Escherichia coli strain K-12, complete genome";
    let first = DerivedIdentifier::derive(description).unwrap();
    let second = DerivedIdentifier::derive(description).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str(), "Escherichia_coli_strain_K_12_complete_genome");
    assert_eq!(first.fasta_name(), "Escherichia_coli_strain_K_12_complete_genome.fna");
    assert_eq!(first.link_name(), "Escherichia_coli_strain_K_12_complete_genome.gbk");
}

#[test]
fn identifier_keeps_underscores_and_trims_edges() {
    let id = DerivedIdentifier::derive("(Salmonella enterica) plasmid pSLT_1, complete sequence;").unwrap();
    assert_eq!(id.as_str(), "Salmonella_enterica_plasmid_pSLT_1_complete_sequence");
    assert!(!id.as_str().contains("__"));
}

#[test]
fn identifier_rejects_empty_description() {
    assert_matches!(
        DerivedIdentifier::derive("").unwrap_err(),
        BaserError::EmptyIdentifier(_)
    );
}

#[test]
fn classification_priority() {
    assert_eq!(
        classify("Klebsiella_plasmid_complete_sequence_from_complete_genome.fna"),
        Classification::Plasmid
    );
    assert_eq!(classify("NC_000913_complete_genome.fna"), Classification::Genome);
    assert_eq!(classify("Escherichia_coli_genome.fna"), Classification::Genome);
    assert_eq!(classify("random_file.fna"), Classification::Unclassified);
}

#[test]
fn unclassified_file_is_in_neither_partition() {
    let split = partition(&["random_file.fna".to_string()]);
    assert!(split.genome.is_empty());
    assert!(split.plasmid.is_empty());
    assert_eq!(split.unclassified, vec!["random_file.fna"]);
}
