use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::{Accession, KeggId, Organism};
use crate::error::KiraError;
use crate::retry::{RetryPolicy, RetryingClient};
use crate::uniprot::{CrossReferenceRecord, UniprotClient};

pub const DEFAULT_NAME_CUTOFF: usize = 3;

pub type CandidateIdentifiers = BTreeMap<usize, Vec<KeggId>>;

pub struct IdentifierResolver<U: UniprotClient> {
    client: U,
    retry: RetryingClient,
}

impl<U: UniprotClient> IdentifierResolver<U> {
    pub fn new(client: U, policy: RetryPolicy) -> Self {
        Self {
            client,
            retry: RetryingClient::new(policy),
        }
    }

    pub fn resolve(
        &self,
        accession: &Accession,
        organism: &Organism,
    ) -> Result<CrossReferenceRecord, KiraError> {
        let operation = format!("uniprot search {accession}");
        let payload = self
            .retry
            .execute(&operation, || self.client.search(accession, organism))?;

        let record = match CrossReferenceRecord::from_search(accession, &payload) {
            Ok(record) => record,
            Err(err @ KiraError::ParseFailure { .. }) => {
                warn!(%accession, error = %err, "treating uniprot payload as empty");
                CrossReferenceRecord::default()
            }
            Err(err) => return Err(err),
        };

        if record.candidates.len() > 1 {
            debug!(%accession, candidates = record.candidates.len(), "multiple results found");
        }
        Ok(record)
    }
}

pub fn extract_identifiers(
    record: &CrossReferenceRecord,
    organism: &Organism,
) -> CandidateIdentifiers {
    let mut identifiers = CandidateIdentifiers::new();
    for (ordinal, candidate) in record.candidates.iter().enumerate() {
        let ids: Vec<KeggId> = candidate.kegg_ids(organism).map(str::to_string).collect();
        if ids.len() > 1 {
            debug!(ordinal, count = ids.len(), "multiple KEGG cross-references");
        }
        if !ids.is_empty() {
            identifiers.insert(ordinal, ids);
        }
    }
    identifiers
}

pub fn extract_names(record: &CrossReferenceRecord, cutoff: usize) -> Vec<String> {
    record
        .candidates
        .iter()
        .take(cutoff)
        .filter_map(|candidate| candidate.primary_gene_name())
        .map(str::to_string)
        .collect()
}

pub fn ordered_identifiers(identifiers: &CandidateIdentifiers) -> Vec<KeggId> {
    let mut seen = Vec::new();
    for id in identifiers.values().flatten() {
        if !seen.contains(id) {
            seen.push(id.clone());
        }
    }
    seen
}
