use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Accession, PathwayId};
use crate::error::KiraError;
use crate::identifiers::CandidateIdentifiers;
use crate::pathways::IdentifierPathways;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MappingTable {
    #[serde(rename = "KEGGID")]
    KeggIds,
    #[serde(rename = "GENENAME")]
    GeneNames,
    #[serde(rename = "PATHWAYS")]
    Pathways,
    #[serde(rename = "PATHWAYS_UNQ")]
    PathwaysUnique,
}

impl MappingTable {
    pub const ALL: [MappingTable; 4] = [
        MappingTable::KeggIds,
        MappingTable::GeneNames,
        MappingTable::Pathways,
        MappingTable::PathwaysUnique,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            MappingTable::KeggIds => "KEGGID",
            MappingTable::GeneNames => "GENENAME",
            MappingTable::Pathways => "PATHWAYS",
            MappingTable::PathwaysUnique => "PATHWAYS_UNQ",
        }
    }

    pub fn default_filename(&self) -> &'static str {
        match self {
            MappingTable::KeggIds => "kegg_ids.json",
            MappingTable::GeneNames => "gene_names.json",
            MappingTable::Pathways => "pathways.json",
            MappingTable::PathwaysUnique => "pathways_unq.json",
        }
    }
}

impl fmt::Display for MappingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MappingTable {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MappingTable::ALL
            .into_iter()
            .find(|table| table.key() == value.trim())
            .ok_or_else(|| KiraError::InvalidFormat(format!("unknown mapping table {value}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema(BTreeMap<MappingTable, String>);

impl Default for Schema {
    fn default() -> Self {
        Self(
            MappingTable::ALL
                .into_iter()
                .map(|table| (table, table.default_filename().to_string()))
                .collect(),
        )
    }
}

impl Schema {
    pub fn with(mut self, table: MappingTable, filename: impl Into<String>) -> Self {
        self.0.insert(table, filename.into());
        self
    }

    pub fn filename(&self, table: MappingTable) -> &str {
        self.0
            .get(&table)
            .map(String::as_str)
            .unwrap_or_else(|| table.default_filename())
    }

    pub fn entries(&self) -> impl Iterator<Item = (MappingTable, &str)> + '_ {
        MappingTable::ALL
            .into_iter()
            .map(move |table| (table, self.filename(table)))
    }

    /// Rejects filenames that are not plain names or whose extension cannot hold the table.
    pub fn validate(&self) -> Result<(), KiraError> {
        for (table, filename) in self.entries() {
            if filename.is_empty()
                || filename.contains(['/', '\\'])
                || filename == "."
                || filename == ".."
            {
                return Err(KiraError::InvalidFormat(format!(
                    "{filename:?} for {table} must be a plain file name"
                )));
            }
            let format = FileFormat::from_filename(filename)?;
            if format == FileFormat::Text && table != MappingTable::PathwaysUnique {
                return Err(KiraError::StructureMismatch {
                    table: table.key().to_string(),
                    filename: filename.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Text,
    Json,
    Blob,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Result<Self, KiraError> {
        match filename.rsplit_once('.').map(|(_, ext)| ext) {
            Some("txt") => Ok(FileFormat::Text),
            Some("json") => Ok(FileFormat::Json),
            Some("bin") | Some("pkl") => Ok(FileFormat::Blob),
            _ => Err(KiraError::InvalidFormat(format!(
                "{filename} (use .txt, .json, .bin or .pkl)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub kegg_ids: BTreeMap<Accession, CandidateIdentifiers>,
    pub gene_names: BTreeMap<Accession, Vec<String>>,
    pub pathways: BTreeMap<Accession, IdentifierPathways>,
    #[serde(default)]
    pub pathways_unique: Vec<PathwayId>,
}

pub trait MappingView {
    fn mapping(&self) -> &Mapping;
}

impl MappingView for Mapping {
    fn mapping(&self) -> &Mapping {
        self
    }
}

enum TableRef<'a> {
    KeggIds(&'a BTreeMap<Accession, CandidateIdentifiers>),
    GeneNames(&'a BTreeMap<Accession, Vec<String>>),
    Pathways(&'a BTreeMap<Accession, IdentifierPathways>),
    Strings(&'a [PathwayId]),
}

impl Mapping {
    fn table(&self, table: MappingTable) -> TableRef<'_> {
        match table {
            MappingTable::KeggIds => TableRef::KeggIds(&self.kegg_ids),
            MappingTable::GeneNames => TableRef::GeneNames(&self.gene_names),
            MappingTable::Pathways => TableRef::Pathways(&self.pathways),
            MappingTable::PathwaysUnique => TableRef::Strings(&self.pathways_unique),
        }
    }

    pub fn retain<F: Fn(&Accession) -> bool>(&mut self, keep: F) {
        self.kegg_ids.retain(|acc, _| keep(acc));
        self.gene_names.retain(|acc, _| keep(acc));
        self.pathways.retain(|acc, _| keep(acc));
    }

    pub fn contains(&self, accession: &Accession) -> bool {
        self.kegg_ids.contains_key(accession)
            || self.gene_names.contains_key(accession)
            || self.pathways.contains_key(accession)
    }

    pub fn encode_table(&self, table: MappingTable, filename: &str) -> Result<Vec<u8>, KiraError> {
        let mismatch = || KiraError::StructureMismatch {
            table: table.key().to_string(),
            filename: filename.to_string(),
        };
        let data = self.table(table);
        match FileFormat::from_filename(filename)? {
            FileFormat::Text => match data {
                TableRef::Strings(lines) => Ok(lines.join("\n").into_bytes()),
                _ => Err(mismatch()),
            },
            FileFormat::Json => match data {
                TableRef::KeggIds(value) => serde_json::to_vec_pretty(value),
                TableRef::GeneNames(value) => serde_json::to_vec_pretty(value),
                TableRef::Pathways(value) => serde_json::to_vec_pretty(value),
                TableRef::Strings(value) => serde_json::to_vec_pretty(value),
            }
            .map_err(|_| mismatch()),
            FileFormat::Blob => match data {
                TableRef::KeggIds(value) => bincode::serialize(value),
                TableRef::GeneNames(value) => bincode::serialize(value),
                TableRef::Pathways(value) => bincode::serialize(value),
                TableRef::Strings(value) => bincode::serialize(value),
            }
            .map_err(|_| mismatch()),
        }
    }

    pub fn decode_table(
        &mut self,
        table: MappingTable,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), KiraError> {
        let format = FileFormat::from_filename(filename)?;
        if format == FileFormat::Text {
            if table != MappingTable::PathwaysUnique {
                return Err(KiraError::StructureMismatch {
                    table: table.key().to_string(),
                    filename: filename.to_string(),
                });
            }
            self.pathways_unique = String::from_utf8_lossy(bytes)
                .lines()
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(());
        }
        match table {
            MappingTable::KeggIds => self.kegg_ids = decode(format, filename, bytes)?,
            MappingTable::GeneNames => self.gene_names = decode(format, filename, bytes)?,
            MappingTable::Pathways => self.pathways = decode(format, filename, bytes)?,
            MappingTable::PathwaysUnique => self.pathways_unique = decode(format, filename, bytes)?,
        }
        Ok(())
    }

    pub fn load(store: &Store, schema: &Schema) -> Result<Mapping, KiraError> {
        let mut mapping = Mapping::default();
        for (table, filename) in schema.entries() {
            let bytes = Store::read_bytes(&store.file_path(filename))?;
            mapping.decode_table(table, filename, &bytes)?;
        }
        Ok(mapping)
    }
}

fn decode<T: DeserializeOwned>(
    format: FileFormat,
    filename: &str,
    bytes: &[u8],
) -> Result<T, KiraError> {
    match format {
        FileFormat::Json => serde_json::from_slice(bytes)
            .map_err(|err| KiraError::parse_failure(filename, err.to_string())),
        FileFormat::Blob => bincode::deserialize(bytes)
            .map_err(|err| KiraError::parse_failure(filename, err.to_string())),
        FileFormat::Text => Err(KiraError::InvalidFormat(filename.to_string())),
    }
}

#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    mapping: Mapping,
    schema: Schema,
    finalized: bool,
}

impl MappingView for MappingStore {
    fn mapping(&self) -> &Mapping {
        &self.mapping
    }
}

impl MappingStore {
    pub fn new(schema: Schema) -> Self {
        Self {
            mapping: Mapping::default(),
            schema,
            finalized: false,
        }
    }

    pub fn from_mapping(mut mapping: Mapping, schema: Schema) -> Self {
        mapping.pathways_unique.clear();
        Self {
            mapping,
            schema,
            finalized: false,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn contains(&self, accession: &Accession) -> bool {
        self.mapping.contains(accession)
    }

    /// Merges one accession. Existing keys win; empty values are not recorded.
    /// Returns true when at least one table gained an entry.
    pub fn record(
        &mut self,
        accession: &Accession,
        identifiers: CandidateIdentifiers,
        names: Vec<String>,
        pathways: IdentifierPathways,
    ) -> bool {
        let mut changed = false;
        if !identifiers.is_empty() && !self.mapping.kegg_ids.contains_key(accession) {
            self.mapping.kegg_ids.insert(accession.clone(), identifiers);
            changed = true;
        }
        if !names.is_empty() && !self.mapping.gene_names.contains_key(accession) {
            self.mapping.gene_names.insert(accession.clone(), names);
            changed = true;
        }
        if !pathways.is_empty() && !self.mapping.pathways.contains_key(accession) {
            self.mapping.pathways.insert(accession.clone(), pathways);
            changed = true;
        }
        if changed {
            self.finalized = false;
        }
        changed
    }

    pub fn clean(&mut self) -> &[PathwayId] {
        let all: Vec<&PathwayId> = self
            .mapping
            .pathways
            .values()
            .flat_map(|by_id| by_id.values())
            .flatten()
            .collect();
        let unique: BTreeSet<&PathwayId> = all.iter().copied().collect();
        info!(
            pathway_groups = self.mapping.pathways.len(),
            total = all.len(),
            unique = unique.len(),
            "cleaned pathway universe"
        );
        self.mapping.pathways_unique = unique.into_iter().cloned().collect();
        self.finalized = true;
        &self.mapping.pathways_unique
    }

    pub fn pathways_unique(&self) -> Option<&[PathwayId]> {
        self.finalized
            .then_some(self.mapping.pathways_unique.as_slice())
    }

    pub fn persist(&self, store: &Store) -> Result<Vec<Utf8PathBuf>, KiraError> {
        if !self.finalized {
            return Err(KiraError::MappingNotFinalized);
        }
        let encoded = self
            .schema
            .entries()
            .map(|(table, filename)| {
                self.mapping
                    .encode_table(table, filename)
                    .map(|bytes| (store.file_path(filename), bytes))
            })
            .collect::<Result<Vec<_>, KiraError>>()?;

        let mut written = Vec::with_capacity(encoded.len());
        for (path, bytes) in encoded {
            Store::write_bytes_atomic(&path, &bytes)?;
            written.push(path);
        }
        Ok(written)
    }

    pub fn load(store: &Store, schema: &Schema) -> Result<Mapping, KiraError> {
        Mapping::load(store, schema)
    }

    pub fn into_mapping(self) -> Mapping {
        self.mapping
    }
}
