use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid UniProt accession: {0}")]
    InvalidAccession(String),

    #[error("unknown organism: {0}")]
    InvalidOrganism(String),

    #[error("no accessions to process")]
    NoAccessions,

    #[error("missing config file kira-pm.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("uniprot request failed: {0}")]
    UniprotHttp(String),

    #[error("uniprot returned status {status}: {message}")]
    UniprotStatus { status: u16, message: String },

    #[error("KEGG request failed: {0}")]
    KeggHttp(String),

    #[error("KEGG returned status {status}: {message}")]
    KeggStatus { status: u16, message: String },

    #[error("{operation} failed after {attempts} attempt(s)")]
    #[diagnostic(help("the remote service kept failing; rerun the batch once it is reachable"))]
    ExhaustedRetries {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<KiraError>,
    },

    #[error("unexpected payload for {context}: {message}")]
    ParseFailure { context: String, message: String },

    #[error("unsupported structure, can't save mapped data: {table} - {filename}")]
    StructureMismatch { table: String, filename: String },

    #[error("invalid format for mapping file: {0}")]
    InvalidFormat(String),

    #[error("mapping must be cleaned before it is persisted")]
    MappingNotFinalized,

    #[error("checkpoint belongs to organism {found}, batch runs for {expected}")]
    CheckpointMismatch { expected: String, found: String },
}

impl KiraError {
    pub fn parse_failure(context: impl Into<String>, message: impl Into<String>) -> Self {
        KiraError::ParseFailure {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn is_remote(&self) -> bool {
        match self {
            KiraError::UniprotHttp(_)
            | KiraError::UniprotStatus { .. }
            | KiraError::KeggHttp(_)
            | KiraError::KeggStatus { .. } => true,
            KiraError::ExhaustedRetries { source, .. } => source.is_remote(),
            _ => false,
        }
    }
}
