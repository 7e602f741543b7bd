//! GenomeBaser manages complete bacterial genomes from the NCBI.
//!
//! A run mirrors the GenBank records of one organism, converts every record to
//! FASTA named after its DEFINITION line, separates complete genomes from
//! plasmids and builds a clustered protein BLAST database from the genomes.

pub mod app;
pub mod archive;
pub mod classify;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod genbank;
pub mod link;
pub mod output;
pub mod reference;
pub mod store;
pub mod tools;
