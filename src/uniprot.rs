use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::domain::{Accession, Organism};
use crate::error::KiraError;

const KEGG_DATABASE: &str = "KEGG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossReference {
    pub database: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateRecord {
    pub cross_references: Vec<CrossReference>,
    pub gene_names: Vec<Option<String>>,
}

impl CandidateRecord {
    pub fn from_value(raw: &Value) -> Result<Self, KiraError> {
        let mut record = CandidateRecord::default();

        match raw.get("uniProtKBCrossReferences") {
            None | Some(Value::Null) => {}
            Some(Value::Array(xrefs)) => {
                for xref in xrefs {
                    let database = xref.get("database").and_then(|v| v.as_str());
                    let id = xref.get("id").and_then(|v| v.as_str());
                    match (database, id) {
                        (Some(database), Some(id)) => record.cross_references.push(CrossReference {
                            database: database.to_string(),
                            id: id.to_string(),
                        }),
                        _ => {
                            return Err(KiraError::parse_failure(
                                "uniProtKBCrossReferences",
                                format!("entry without database/id: {xref}"),
                            ));
                        }
                    }
                }
            }
            Some(other) => {
                return Err(KiraError::parse_failure(
                    "uniProtKBCrossReferences",
                    format!("expected an array, got {other}"),
                ));
            }
        }

        match raw.get("genes") {
            None | Some(Value::Null) => {}
            Some(Value::Array(genes)) => {
                for gene in genes {
                    let name = match gene.get("geneName") {
                        None => None,
                        Some(gene_name) => match gene_name.get("value").and_then(|v| v.as_str()) {
                            Some(value) => Some(value.to_string()),
                            None => {
                                return Err(KiraError::parse_failure(
                                    "genes",
                                    format!("geneName without string value: {gene_name}"),
                                ));
                            }
                        },
                    };
                    record.gene_names.push(name);
                }
            }
            Some(other) => {
                return Err(KiraError::parse_failure(
                    "genes",
                    format!("expected an array, got {other}"),
                ));
            }
        }

        Ok(record)
    }

    pub fn kegg_ids<'a>(&'a self, organism: &'a Organism) -> impl Iterator<Item = &'a str> + 'a {
        self.cross_references
            .iter()
            .filter(|xref| xref.database == KEGG_DATABASE)
            .filter(move |xref| organism.owns_kegg_id(&xref.id))
            .map(|xref| xref.id.as_str())
    }

    pub fn primary_gene_name(&self) -> Option<&str> {
        self.gene_names.iter().flatten().next().map(|name| name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossReferenceRecord {
    pub candidates: Vec<CandidateRecord>,
}

impl CrossReferenceRecord {
    pub fn from_search(accession: &Accession, payload: &Value) -> Result<Self, KiraError> {
        let results = payload
            .get("results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                KiraError::parse_failure(
                    format!("uniprot search {accession}"),
                    "missing results array",
                )
            })?;

        let candidates = results
            .iter()
            .enumerate()
            .map(|(ordinal, raw)| {
                CandidateRecord::from_value(raw).unwrap_or_else(|err| {
                    warn!(%accession, ordinal, error = %err, "skipping malformed candidate");
                    CandidateRecord::default()
                })
            })
            .collect();

        Ok(Self { candidates })
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

pub trait UniprotClient: Send + Sync {
    fn search(&self, accession: &Accession, organism: &Organism) -> Result<Value, KiraError>;
}

#[derive(Clone)]
pub struct UniprotHttpClient {
    client: Client,
    base_url: String,
}

impl UniprotHttpClient {
    pub fn new() -> Result<Self, KiraError> {
        Self::with_base_url("https://rest.uniprot.org")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-pm/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::UniprotHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| KiraError::UniprotHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, KiraError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "UniProt request failed".to_string());
        Err(KiraError::UniprotStatus { status, message })
    }

    fn search_url(&self) -> String {
        format!("{}/uniprotkb/search", self.base_url)
    }
}

pub fn search_query(accession: &Accession, organism: &Organism) -> String {
    format!("{} AND organism_id:{}", accession.as_str(), organism.taxonomy_id)
}

impl UniprotClient for UniprotHttpClient {
    fn search(&self, accession: &Accession, organism: &Organism) -> Result<Value, KiraError> {
        let query = search_query(accession, organism);
        let response = self
            .client
            .get(self.search_url())
            .query(&[("query", query.as_str()), ("format", "json")])
            .send()
            .map_err(|err| KiraError::UniprotHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| KiraError::UniprotHttp(err.to_string()))
    }
}
