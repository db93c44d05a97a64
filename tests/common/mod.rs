#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use kira_pathway_mapper::domain::{Accession, Organism};
use kira_pathway_mapper::error::KiraError;
use kira_pathway_mapper::kegg::KeggClient;
use kira_pathway_mapper::uniprot::UniprotClient;

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn accession(value: &str) -> Accession {
    value.parse().unwrap()
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Search payload with one candidate per `(kegg ids, gene name)` pair.
pub fn search_payload(candidates: Vec<(Vec<&str>, Option<&str>)>) -> Value {
    let results: Vec<Value> = candidates
        .into_iter()
        .map(|(kegg_ids, gene)| {
            let xrefs: Vec<Value> = kegg_ids
                .iter()
                .map(|id| json!({ "database": "KEGG", "id": id }))
                .collect();
            let genes = match gene {
                Some(name) => json!([{ "geneName": { "value": name } }]),
                None => json!([]),
            };
            json!({ "uniProtKBCrossReferences": xrefs, "genes": genes })
        })
        .collect();
    json!({ "results": results })
}

/// Answers searches from a fixed table; unknown accessions get zero results.
#[derive(Clone, Default)]
pub struct MockUniprot {
    pub responses: HashMap<String, Value>,
    pub failing: Vec<String>,
    pub log: CallLog,
}

impl MockUniprot {
    pub fn with(mut self, accession: &str, payload: Value) -> Self {
        self.responses.insert(accession.to_string(), payload);
        self
    }

    pub fn failing(mut self, accession: &str) -> Self {
        self.failing.push(accession.to_string());
        self
    }
}

impl UniprotClient for MockUniprot {
    fn search(&self, accession: &Accession, _organism: &Organism) -> Result<Value, KiraError> {
        self.log.lock().unwrap().push(accession.to_string());
        if self.failing.iter().any(|acc| acc == accession.as_str()) {
            return Err(KiraError::UniprotStatus {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(self
            .responses
            .get(accession.as_str())
            .cloned()
            .unwrap_or_else(|| json!({ "results": [] })))
    }
}

/// Serves link listings and entries from fixed tables; unknown ids get empty text.
#[derive(Clone, Default)]
pub struct MockKegg {
    pub links: HashMap<String, String>,
    pub entries: HashMap<String, String>,
    pub failing: Vec<String>,
    pub log: CallLog,
}

impl MockKegg {
    pub fn link(mut self, kegg_id: &str, text: &str) -> Self {
        self.links.insert(kegg_id.to_string(), text.to_string());
        self
    }

    pub fn entry(mut self, pathway_id: &str, text: &str) -> Self {
        self.entries.insert(pathway_id.to_string(), text.to_string());
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }

    fn answer(&self, kind: &str, id: &str, table: &HashMap<String, String>) -> Result<String, KiraError> {
        self.log.lock().unwrap().push(format!("{kind} {id}"));
        if self.failing.iter().any(|failing| failing == id) {
            return Err(KiraError::KeggHttp("connection reset".to_string()));
        }
        Ok(table.get(id).cloned().unwrap_or_default())
    }
}

impl KeggClient for MockKegg {
    fn link_pathways(&self, kegg_id: &str) -> Result<String, KiraError> {
        self.answer("link", kegg_id, &self.links)
    }

    fn get_entry(&self, pathway_id: &str) -> Result<String, KiraError> {
        self.answer("get", pathway_id, &self.entries)
    }
}

pub fn kegg_entry(pathway_id: &str, name: &str) -> String {
    format!(
        "ENTRY       {pathway_id}                    Pathway\nNAME        {name} - Homo sapiens (human)\nCLASS       Environmental Information Processing\n///\n"
    )
}
