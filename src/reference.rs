use std::collections::HashSet;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::config::{ClusterParams, ToolNames};
use crate::error::BaserError;
use crate::store::{Store, ensure_dir, path_occupied};
use crate::tools::{ToolInvocation, ToolRunner};

pub const BRIDGE_STAGE: &str = "protein extraction";
pub const CLUSTER_STAGE: &str = "clustering";
pub const INDEX_STAGE: &str = "indexing";

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceOutputs {
    pub inputs: Vec<Utf8PathBuf>,
    pub proteins: Utf8PathBuf,
    pub clustered: Utf8PathBuf,
}

/// Builds `prokka/<Genus>.faa`, its cd-hit reduction `prokka/<Genus>` and the
/// BLAST protein index beside it.
#[derive(Debug, Clone)]
pub struct ReferenceBuilder<T: ToolRunner> {
    runner: T,
    tools: ToolNames,
    clustering: ClusterParams,
}

impl<T: ToolRunner> ReferenceBuilder<T> {
    pub fn new(runner: T, tools: ToolNames, clustering: ClusterParams) -> Self {
        Self {
            runner,
            tools,
            clustering,
        }
    }

    /// The raw GenBank records behind the genome FASTA names: the `<id>.gbk` link
    /// next to each `<id>.fna`, first occurrence only.
    pub fn genome_inputs(store: &Store, genome_fasta: &[String]) -> Vec<Utf8PathBuf> {
        let mut seen = HashSet::new();
        let mut inputs = Vec::new();
        for name in genome_fasta {
            let stem = name.strip_suffix(".fna").unwrap_or(name);
            let path = store.root().join(format!("{stem}.gbk"));
            if !seen.insert(path.clone()) {
                continue;
            }
            if !path_occupied(&path) {
                tracing::warn!("no raw record link for {name}; leaving it out of the reference");
                continue;
            }
            inputs.push(path);
        }
        inputs
    }

    /// The three stage commands in execution order.
    pub fn plan(&self, store: &Store, inputs: &[Utf8PathBuf], genus: &str) -> Vec<ToolInvocation> {
        let prokka_dir = store.prokka_dir();
        let proteins = store.protein_collection_path(genus);
        let params = &self.clustering;

        let bridge = ToolInvocation::new(BRIDGE_STAGE, self.tools.genbank_to_fasta.as_str())
            .args(inputs.iter().map(|path| path.to_string()))
            .arg("--idtag=locus_tag")
            .stdout_to(proteins);

        let cluster = ToolInvocation::new(CLUSTER_STAGE, self.tools.cd_hit.as_str())
            .args(["-i".to_string(), format!("{genus}.faa")])
            .args(["-o", genus])
            .args(["-T".to_string(), params.threads.to_string()])
            .args(["-M".to_string(), params.memory_mb.to_string()])
            .args(["-g", if params.global_identity { "1" } else { "0" }])
            .args(["-s".to_string(), params.length_difference.to_string()])
            .args(["-c".to_string(), params.identity.to_string()])
            .current_dir(prokka_dir.clone());

        let index = ToolInvocation::new(INDEX_STAGE, self.tools.makeblastdb.as_str())
            .args(["-dbtype", "prot", "-in", genus])
            .current_dir(prokka_dir);

        vec![bridge, cluster, index]
    }

    /// Runs the stages in order; the first failure stops the rest.
    pub fn build(
        &self,
        store: &Store,
        genome_fasta: &[String],
        genus: &str,
    ) -> Result<Option<ReferenceOutputs>, BaserError> {
        let inputs = Self::genome_inputs(store, genome_fasta);
        if inputs.is_empty() {
            tracing::warn!("no genomes to build a reference from; skipping");
            return Ok(None);
        }
        ensure_dir(&store.prokka_dir())?;

        for invocation in self.plan(store, &inputs, genus) {
            tracing::info!("{}: {}", invocation.stage, invocation.command_line());
            self.runner.run(&invocation)?;
        }

        Ok(Some(ReferenceOutputs {
            inputs,
            proteins: store.protein_collection_path(genus),
            clustered: store.clustered_path(genus),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tools::SystemToolRunner;

    #[test]
    fn default_cluster_arguments() {
        let builder = ReferenceBuilder::new(
            SystemToolRunner::new(),
            ToolNames::default(),
            ClusterParams::default(),
        );
        let store = Store::new_with_root(Utf8PathBuf::from("/db/Klebsiella_pneumoniae"));
        let plan = builder.plan(
            &store,
            &[Utf8PathBuf::from("/db/Klebsiella_pneumoniae/a.gbk")],
            "Klebsiella",
        );

        assert_eq!(plan.len(), 3);
        assert_eq!(
            plan[0].stdout.as_deref(),
            Some(camino::Utf8Path::new("/db/Klebsiella_pneumoniae/prokka/Klebsiella.faa"))
        );
        assert_eq!(
            plan[1].args,
            vec![
                "-i", "Klebsiella.faa", "-o", "Klebsiella", "-T", "0", "-M", "0", "-g", "1",
                "-s", "0.8", "-c", "0.9",
            ]
        );
        assert_eq!(plan[2].args, vec!["-dbtype", "prot", "-in", "Klebsiella"]);
    }
}
