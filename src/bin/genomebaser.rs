use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use genomebaser::app::{App, RunOptions};
use genomebaser::archive::RsyncArchive;
use genomebaser::config::ConfigLoader;
use genomebaser::domain::{LinkStrategy, OrganismTarget};
use genomebaser::error::BaserError;
use genomebaser::link::FsLinker;
use genomebaser::output::{self, JsonOutput, LogSink, OutputMode};
use genomebaser::tools::SystemToolRunner;

/// GenomeBaser manages complete (bacterial) genomes from the NCBI.
///
/// Example usage:
///
///     $ genomebaser Klebsiella pneumoniae ~/dbs
///
///     $ # (wait a few months)...
///
///     $ genomebaser Klebsiella pneumoniae ~/dbs
#[derive(Parser)]
#[command(name = "genomebaser")]
#[command(version, author, verbatim_doc_comment)]
struct Cli {
    genus: String,

    species: String,

    /// Existing directory that holds one subdirectory per organism
    out_database_location: PathBuf,

    /// Check that rsync, prokka-genbank_to_fasta_db, cd-hit and makeblastdb are on PATH (default)
    #[arg(long, alias = "check_deps", overrides_with = "no_check_deps")]
    check_deps: bool,

    /// Skip the third party dependency check
    #[arg(long, alias = "no-check_deps", overrides_with = "check_deps")]
    no_check_deps: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// How genome/plasmid partitions and raw record links are materialized
    #[arg(long, value_enum)]
    link_strategy: Option<LinkStrategy>,

    /// Process the local mirror without contacting the archive
    #[arg(long)]
    skip_sync: bool,

    /// Print the run result as JSON instead of a summary
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<BaserError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BaserError) -> u8 {
    match error {
        BaserError::InvalidOrganism(_)
        | BaserError::MissingDatabaseLocation(_)
        | BaserError::ConfigRead(_)
        | BaserError::ConfigParse(_) => 2,
        BaserError::MissingDependency(_) => 3,
        BaserError::ToolFailure { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(strategy) = cli.link_strategy {
        config.link_strategy = strategy;
    }
    let target = OrganismTarget::new(&cli.genus, &cli.species)?;

    let runner = SystemToolRunner::new();
    let archive = RsyncArchive::new(
        runner,
        &config.tools.rsync,
        &config.archive.remote,
        &config.archive.extension,
    );
    let linker = FsLinker::new(config.link_strategy);
    let app = App::new(config, archive, runner, linker);
    let options = RunOptions {
        check_deps: cli.check_deps || !cli.no_check_deps,
        skip_sync: cli.skip_sync,
    };

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.run(&target, &cli.out_database_location, options, &JsonOutput)?;
            JsonOutput::print_run(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.run(&target, &cli.out_database_location, options, &LogSink)?;
            output::print_summary(&result);
        }
    }
    Ok(())
}
