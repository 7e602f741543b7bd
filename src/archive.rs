use camino::Utf8Path;

use crate::domain::OrganismTarget;
use crate::error::BaserError;
use crate::tools::{ToolInvocation, ToolRunner};

pub const SYNC_STAGE: &str = "archive sync";

/// Mirrors the raw records of one organism into a local directory.
pub trait ArchiveSync {
    fn mirror(&self, target: &OrganismTarget, destination: &Utf8Path) -> Result<(), BaserError>;
}

/// rsync against the NCBI genomes module. Only new or changed files are
/// transferred, which is what makes periodic re-runs cheap.
#[derive(Debug, Clone)]
pub struct RsyncArchive<T: ToolRunner> {
    runner: T,
    program: String,
    remote: String,
    extension: String,
}

impl<T: ToolRunner> RsyncArchive<T> {
    pub fn new(runner: T, program: &str, remote: &str, extension: &str) -> Self {
        Self {
            runner,
            program: program.to_string(),
            remote: remote.trim_end_matches('/').to_string(),
            extension: extension.to_string(),
        }
    }

    pub fn invocation(&self, target: &OrganismTarget, destination: &Utf8Path) -> ToolInvocation {
        ToolInvocation::new(SYNC_STAGE, self.program.as_str())
            .arg("-av")
            .arg(self.remote_pattern(target))
            .arg(format!("{destination}/"))
    }

    /// e.g. `ftp.ncbi.nlm.nih.gov::genomes/Bacteria/Escherichia_coli_*/*.gbk`
    pub fn remote_pattern(&self, target: &OrganismTarget) -> String {
        format!(
            "{}/{}_*/*.{}",
            self.remote,
            target.dir_name(),
            self.extension
        )
    }
}

impl<T: ToolRunner> ArchiveSync for RsyncArchive<T> {
    fn mirror(&self, target: &OrganismTarget, destination: &Utf8Path) -> Result<(), BaserError> {
        self.runner.run(&self.invocation(target, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::SystemToolRunner;

    #[test]
    fn rsync_arguments() {
        let archive = RsyncArchive::new(
            SystemToolRunner::new(),
            "rsync",
            "ftp.ncbi.nlm.nih.gov::genomes/Bacteria/",
            "gbk",
        );
        let target = OrganismTarget::new("escherichia", "coli").unwrap();
        let invocation = archive.invocation(&target, Utf8Path::new("/db/Escherichia_coli"));
        assert_eq!(invocation.program, "rsync");
        assert_eq!(
            invocation.args,
            vec![
                "-av",
                "ftp.ncbi.nlm.nih.gov::genomes/Bacteria/Escherichia_coli_*/*.gbk",
                "/db/Escherichia_coli/",
            ]
        );
    }
}
