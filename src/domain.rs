use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BaserError;

static NON_WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("identifier pattern is valid"));

/// A (genus, species) pair as typed by the user, with the genus title-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganismTarget {
    genus: String,
    species: String,
}

impl OrganismTarget {
    pub fn new(genus: &str, species: &str) -> Result<Self, BaserError> {
        let genus = validate_name_part("genus", genus)?;
        let species = validate_name_part("species", species)?;
        let mut chars = genus.chars();
        let genus = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => return Err(BaserError::InvalidOrganism("empty genus".to_string())),
        };
        Ok(Self {
            genus,
            species: species.to_string(),
        })
    }

    pub fn genus(&self) -> &str {
        &self.genus
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    /// Directory name of the organism inside the database base, e.g. `Klebsiella_pneumoniae`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.genus, self.species)
    }
}

impl fmt::Display for OrganismTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.genus, self.species)
    }
}

impl FromStr for OrganismTarget {
    type Err = BaserError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts = value.split_whitespace().collect::<Vec<_>>();
        match parts.as_slice() {
            [genus, species] => Self::new(genus, species),
            _ => Err(BaserError::InvalidOrganism(format!(
                "expected \"<genus> <species>\", got {value:?}"
            ))),
        }
    }
}

fn validate_name_part<'a>(label: &str, value: &'a str) -> Result<&'a str, BaserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BaserError::InvalidOrganism(format!("empty {label}")));
    }
    let forbidden = |ch: char| ch.is_whitespace() || ch == '/' || ch == '\\';
    if trimmed.chars().any(forbidden) || trimmed == "." || trimmed == ".." {
        return Err(BaserError::InvalidOrganism(format!(
            "{label} {value:?} is not usable as a directory name"
        )));
    }
    Ok(trimmed)
}

/// Filesystem-safe name derived from a record's description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DerivedIdentifier(String);

impl DerivedIdentifier {
    /// Replaces every run of characters outside `[A-Za-z0-9_]` with one `_` and
    /// trims underscores from both ends.
    pub fn derive(description: &str) -> Result<Self, BaserError> {
        let replaced = NON_WORD_RUN.replace_all(description, "_");
        let trimmed = replaced.trim_matches('_');
        if trimmed.is_empty() {
            return Err(BaserError::EmptyIdentifier(description.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn fasta_name(&self) -> String {
        format!("{}.fna", self.0)
    }

    pub fn link_name(&self) -> String {
        format!("{}.gbk", self.0)
    }
}

impl fmt::Display for DerivedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Genome,
    Plasmid,
    Unclassified,
}

impl Classification {
    pub fn dir_name(self) -> Option<&'static str> {
        match self {
            Classification::Genome => Some("genome"),
            Classification::Plasmid => Some("plasmid"),
            Classification::Unclassified => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Genome => write!(f, "genome"),
            Classification::Plasmid => write!(f, "plasmid"),
            Classification::Unclassified => write!(f, "unclassified"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkStrategy {
    /// Symbolic link, falling back to a hard link and then a copy.
    #[default]
    Auto,
    Symlink,
    Hardlink,
    Copy,
}

impl fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStrategy::Auto => write!(f, "auto"),
            LinkStrategy::Symlink => write!(f, "symlink"),
            LinkStrategy::Hardlink => write!(f, "hardlink"),
            LinkStrategy::Copy => write!(f, "copy"),
        }
    }
}
