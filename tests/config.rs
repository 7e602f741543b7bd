use std::fs;

use assert_matches::assert_matches;

use genomebaser::config::{Config, ConfigLoader, DEFAULT_ARCHIVE_REMOTE, ResolvedConfig};
use genomebaser::domain::LinkStrategy;
use genomebaser::error::BaserError;

#[test]
fn parse_config_overrides() {
    let json = r#"{
        "archive": { "remote": "rsync.example.org::genomes/Bacteria/", "extension": ".gbff" },
        "clustering": { "identity": 0.95, "threads": 8 },
        "link_strategy": "hardlink",
        "tools": { "cd_hit": "/opt/cdhit/cd-hit" }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    let resolved = ConfigLoader::resolve_config(config).unwrap();

    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.archive.remote, "rsync.example.org::genomes/Bacteria");
    assert_eq!(resolved.archive.extension, "gbff");
    assert_eq!(resolved.clustering.identity, 0.95);
    assert_eq!(resolved.clustering.threads, 8);
    assert_eq!(resolved.clustering.length_difference, 0.8);
    assert_eq!(resolved.link_strategy, LinkStrategy::Hardlink);
    assert_eq!(resolved.tools.cd_hit, "/opt/cdhit/cd-hit");
    assert_eq!(resolved.tools.makeblastdb, "makeblastdb");
}

#[test]
fn out_of_range_identity_is_rejected() {
    let config: Config = serde_json::from_str(r#"{ "clustering": { "identity": 1.5 } }"#).unwrap();
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, BaserError::ConfigParse(_));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(Some(path.as_path())).unwrap_err();
    assert_matches!(err, BaserError::ConfigRead(_));
}

#[test]
fn explicit_file_is_loaded() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("genomebaser.json");
    fs::write(&path, r#"{ "link_strategy": "copy" }"#).unwrap();

    let resolved = ConfigLoader::resolve(Some(path.as_path())).unwrap();

    assert_eq!(resolved.link_strategy, LinkStrategy::Copy);
    assert_eq!(resolved.source.as_deref(), Some(path.as_path()));
    assert_eq!(resolved.archive.remote, DEFAULT_ARCHIVE_REMOTE);
}

#[test]
fn defaults_match_reference_parameters() {
    let resolved = ResolvedConfig::default();
    assert_eq!(resolved.clustering.identity, 0.9);
    assert_eq!(resolved.clustering.length_difference, 0.8);
    assert_eq!(
        resolved.tools.required(),
        vec!["rsync", "prokka-genbank_to_fasta_db", "cd-hit", "makeblastdb"]
    );
}
