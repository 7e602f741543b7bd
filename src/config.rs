use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::LinkStrategy;
use crate::error::BaserError;

pub const CONFIG_FILE_NAME: &str = "genomebaser.json";
pub const DEFAULT_ARCHIVE_REMOTE: &str = "ftp.ncbi.nlm.nih.gov::genomes/Bacteria";
pub const DEFAULT_RECORD_EXTENSION: &str = "gbk";
pub const DEFAULT_MALFORMED_PATTERN: &str = "CONTIG      join";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub archive: ArchiveSection,
    #[serde(default)]
    pub loader: LoaderSection,
    #[serde(default)]
    pub clustering: ClusteringSection,
    #[serde(default)]
    pub link_strategy: Option<LinkStrategy>,
    #[serde(default)]
    pub tools: ToolsSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ArchiveSection {
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoaderSection {
    #[serde(default)]
    pub malformed_pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ClusteringSection {
    #[serde(default)]
    pub identity: Option<f64>,
    #[serde(default)]
    pub length_difference: Option<f64>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub memory_mb: Option<u32>,
    #[serde(default)]
    pub global_identity: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ToolsSection {
    #[serde(default)]
    pub rsync: Option<String>,
    #[serde(default)]
    pub genbank_to_fasta: Option<String>,
    #[serde(default)]
    pub cd_hit: Option<String>,
    #[serde(default)]
    pub makeblastdb: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveSettings {
    pub remote: String,
    pub extension: String,
}

/// cd-hit parameters. The defaults reproduce `-c 0.9 -s 0.8 -T 0 -M 0 -g 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterParams {
    pub identity: f64,
    pub length_difference: f64,
    pub threads: u32,
    pub memory_mb: u32,
    pub global_identity: bool,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            identity: 0.9,
            length_difference: 0.8,
            threads: 0,
            memory_mb: 0,
            global_identity: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolNames {
    pub rsync: String,
    pub genbank_to_fasta: String,
    pub cd_hit: String,
    pub makeblastdb: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            rsync: "rsync".to_string(),
            genbank_to_fasta: "prokka-genbank_to_fasta_db".to_string(),
            cd_hit: "cd-hit".to_string(),
            makeblastdb: "makeblastdb".to_string(),
        }
    }
}

impl ToolNames {
    /// Executables checked before any work starts.
    pub fn required(&self) -> Vec<&str> {
        vec![
            self.rsync.as_str(),
            self.genbank_to_fasta.as_str(),
            self.cd_hit.as_str(),
            self.makeblastdb.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub source: Option<PathBuf>,
    pub archive: ArchiveSettings,
    pub malformed_pattern: String,
    pub clustering: ClusterParams,
    pub link_strategy: LinkStrategy,
    pub tools: ToolNames,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            source: None,
            archive: ArchiveSettings {
                remote: DEFAULT_ARCHIVE_REMOTE.to_string(),
                extension: DEFAULT_RECORD_EXTENSION.to_string(),
            },
            malformed_pattern: DEFAULT_MALFORMED_PATTERN.to_string(),
            clustering: ClusterParams::default(),
            link_strategy: LinkStrategy::default(),
            tools: ToolNames::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist. Without one, `./genomebaser.json` and then the
    /// user config directory are tried before falling back to built-in defaults.
    pub fn resolve(path: Option<&Path>) -> Result<ResolvedConfig, BaserError> {
        let config_path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };
        let Some(config_path) = config_path else {
            return Ok(ResolvedConfig::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BaserError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| BaserError::ConfigParse(err.to_string()))?;

        let mut resolved = Self::resolve_config(config)?;
        resolved.source = Some(config_path);
        Ok(resolved)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }
        ProjectDirs::from("org", "genomebaser", "genomebaser")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .filter(|path| path.is_file())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, BaserError> {
        let defaults = ResolvedConfig::default();

        let extension = config
            .archive
            .extension
            .map(|ext| ext.trim_start_matches('.').to_string())
            .unwrap_or(defaults.archive.extension);
        if extension.is_empty() {
            return Err(BaserError::ConfigParse(
                "archive.extension must not be empty".to_string(),
            ));
        }

        let malformed_pattern = config
            .loader
            .malformed_pattern
            .unwrap_or(defaults.malformed_pattern);
        if malformed_pattern.is_empty() {
            return Err(BaserError::ConfigParse(
                "loader.malformed_pattern must not be empty".to_string(),
            ));
        }

        let clustering = ClusterParams {
            identity: config
                .clustering
                .identity
                .unwrap_or(defaults.clustering.identity),
            length_difference: config
                .clustering
                .length_difference
                .unwrap_or(defaults.clustering.length_difference),
            threads: config
                .clustering
                .threads
                .unwrap_or(defaults.clustering.threads),
            memory_mb: config
                .clustering
                .memory_mb
                .unwrap_or(defaults.clustering.memory_mb),
            global_identity: config
                .clustering
                .global_identity
                .unwrap_or(defaults.clustering.global_identity),
        };
        if !(clustering.identity > 0.0 && clustering.identity <= 1.0) {
            return Err(BaserError::ConfigParse(format!(
                "clustering.identity must be in (0, 1], got {}",
                clustering.identity
            )));
        }
        if !(0.0..=1.0).contains(&clustering.length_difference) {
            return Err(BaserError::ConfigParse(format!(
                "clustering.length_difference must be in [0, 1], got {}",
                clustering.length_difference
            )));
        }

        let tools = ToolNames {
            rsync: config.tools.rsync.unwrap_or(defaults.tools.rsync),
            genbank_to_fasta: config
                .tools
                .genbank_to_fasta
                .unwrap_or(defaults.tools.genbank_to_fasta),
            cd_hit: config.tools.cd_hit.unwrap_or(defaults.tools.cd_hit),
            makeblastdb: config
                .tools
                .makeblastdb
                .unwrap_or(defaults.tools.makeblastdb),
        };

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            source: None,
            archive: ArchiveSettings {
                remote: config
                    .archive
                    .remote
                    .map(|remote| remote.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.archive.remote),
                extension,
            },
            malformed_pattern,
            clustering,
            link_strategy: config.link_strategy.unwrap_or(defaults.link_strategy),
            tools,
        })
    }
}
