use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::archive::ArchiveSync;
use crate::classify;
use crate::config::ResolvedConfig;
use crate::convert::{self, ConversionReport, ConvertOptions};
use crate::domain::OrganismTarget;
use crate::error::BaserError;
use crate::link::Linker;
use crate::reference::{ReferenceBuilder, ReferenceOutputs};
use crate::store::{RunMetadata, Store};
use crate::tools::{self, ToolRunner};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub check_deps: bool,
    pub skip_sync: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub organism: String,
    pub root: Utf8PathBuf,
    pub sync_warning: Option<String>,
    pub conversion: ConversionReport,
    pub genome: Vec<String>,
    pub plasmid: Vec<String>,
    pub unclassified: Vec<String>,
    pub partition_links_created: usize,
    pub reference: Option<ReferenceOutputs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Check,
    Sync,
    Convert,
    Classify,
    Reference,
    Store,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Check => "Check",
            Phase::Sync => "Sync",
            Phase::Convert => "Convert",
            Phase::Classify => "Classify",
            Phase::Reference => "Reference",
            Phase::Store => "Store",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn emit(sink: &dyn ProgressSink, phase: Phase, message: impl Into<String>, elapsed: Option<Duration>) {
    sink.event(ProgressEvent {
        phase,
        message: message.into(),
        elapsed,
    });
}

/// The acquisition-and-classification pipeline, wired to its external collaborators.
pub struct App<A: ArchiveSync, T: ToolRunner + Clone, L: Linker> {
    config: ResolvedConfig,
    archive: A,
    runner: T,
    linker: L,
}

impl<A: ArchiveSync, T: ToolRunner + Clone, L: Linker> App<A, T, L> {
    pub fn new(config: ResolvedConfig, archive: A, runner: T, linker: L) -> Self {
        Self {
            config,
            archive,
            runner,
            linker,
        }
    }

    pub fn check_dependencies(&self) -> Result<(), BaserError> {
        tools::check_dependencies(&self.runner, &self.config.tools.required()).map(|_| ())
    }

    pub fn run(
        &self,
        target: &OrganismTarget,
        db_base: &Path,
        options: RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, BaserError> {
        let started_at = chrono::Utc::now();

        if options.check_deps {
            emit(sink, Phase::Check, "checking for third party dependencies", None);
            self.check_dependencies()?;
        }

        let store = Store::open(db_base, target)?;
        store.ensure_root()?;

        let sync_warning = if options.skip_sync {
            emit(sink, Phase::Sync, "skipping archive sync", None);
            None
        } else {
            self.sync(target, &store, sink)?
        };

        emit(sink, Phase::Convert, format!("converting records in {}", store.root()), None);
        let start = Instant::now();
        let convert_options = ConvertOptions {
            extension: &self.config.archive.extension,
            malformed_pattern: &self.config.malformed_pattern,
        };
        let conversion = convert::convert_all(&store, &convert_options, &self.linker)?;
        emit(
            sink,
            Phase::Convert,
            format!(
                "{} raw file(s), {} FASTA file(s), {} problem(s)",
                conversion.raw_records.len(),
                conversion.fasta_files.len(),
                conversion.failures.len()
            ),
            Some(start.elapsed()),
        );

        emit(sink, Phase::Classify, "partitioning genomes and plasmids", None);
        let partition = classify::partition(&conversion.fasta_files);
        let materialized = classify::materialize(&store, &partition, &self.linker)?;
        emit(
            sink,
            Phase::Classify,
            format!(
                "{} genome(s), {} plasmid(s), {} unclassified",
                partition.genome.len(),
                partition.plasmid.len(),
                partition.unclassified.len()
            ),
            None,
        );

        emit(sink, Phase::Reference, "building protein reference", None);
        let start = Instant::now();
        let builder = ReferenceBuilder::new(
            self.runner.clone(),
            self.config.tools.clone(),
            self.config.clustering,
        );
        let reference = builder.build(&store, &partition.genome, target.genus())?;
        emit(sink, Phase::Reference, "reference stage finished", Some(start.elapsed()));

        let result = RunResult {
            organism: target.to_string(),
            root: store.root().to_path_buf(),
            sync_warning,
            conversion,
            genome: partition.genome,
            plasmid: partition.plasmid,
            unclassified: partition.unclassified,
            partition_links_created: materialized.links_created,
            reference,
        };

        emit(sink, Phase::Store, "writing run metadata", None);
        store.write_metadata(&build_metadata(&result, started_at))?;
        Ok(result)
    }

    /// Transfer problems are not fatal: the run continues with whatever is on disk.
    fn sync(
        &self,
        target: &OrganismTarget,
        store: &Store,
        sink: &dyn ProgressSink,
    ) -> Result<Option<String>, BaserError> {
        emit(sink, Phase::Sync, format!("mirroring {target} into {}", store.root()), None);
        let start = Instant::now();
        match self.archive.mirror(target, store.root()) {
            Ok(()) => {
                emit(sink, Phase::Sync, "archive sync finished", Some(start.elapsed()));
                Ok(None)
            }
            Err(err @ (BaserError::ToolFailure { .. } | BaserError::MissingDependency(_))) => {
                tracing::warn!("{err}; continuing with local files");
                Ok(Some(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }
}

fn build_metadata(result: &RunResult, started_at: chrono::DateTime<chrono::Utc>) -> RunMetadata {
    RunMetadata {
        organism: result.organism.clone(),
        started_at: started_at.to_rfc3339(),
        completed_at: chrono::Utc::now().to_rfc3339(),
        tool: format!("genomebaser/{}", env!("CARGO_PKG_VERSION")),
        raw_records: result.conversion.raw_records.len(),
        converted: result.conversion.fasta_files.len(),
        genomes: result.genome.len(),
        plasmids: result.plasmid.len(),
        unclassified: result.unclassified.len(),
        reference: result
            .reference
            .as_ref()
            .map(|outputs| outputs.clustered.to_string()),
    }
}
