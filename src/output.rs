use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards pipeline progress to the tracing subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                "phase={}; {} ({} ms)",
                event.phase,
                event.message,
                elapsed.as_millis()
            ),
            None => tracing::info!("phase={}; {}", event.phase, event.message),
        }
    }
}

pub fn print_summary(result: &RunResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}GenomeBaser summary for {}{reset}", result.organism);
    println!("{cyan}   database: {}{reset}", result.root);
    if let Some(warning) = &result.sync_warning {
        println!("{yellow}   sync: {warning}{reset}");
    }
    println!(
        "{green}   raw records: {}, FASTA files: {}{reset}",
        result.conversion.raw_records.len(),
        result.conversion.fasta_files.len()
    );
    println!(
        "{green}   genomes: {}, plasmids: {}{reset}",
        result.genome.len(),
        result.plasmid.len()
    );
    for name in &result.unclassified {
        println!("{yellow}   could not classify {name}{reset}");
    }
    for path in &result.conversion.skipped_artifacts {
        println!("{yellow}   not converted (named like a link artifact): {path}{reset}");
    }
    for failure in &result.conversion.failures {
        println!("{yellow}   skipped {}: {}{reset}", failure.item, failure.error);
    }
    match &result.reference {
        Some(reference) => println!("{green}   reference: {}{reset}", reference.clustered),
        None => println!("{yellow}   reference: not built (no genomes){reset}"),
    }
}
