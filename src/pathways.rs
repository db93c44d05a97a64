use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{Accession, KeggId, PathwayId};
use crate::error::KiraError;
use crate::kegg::{KeggClient, parse_pathway_links, parse_pathway_name};
use crate::retry::{RateLimiter, RetryPolicy, RetryingClient};

pub type IdentifierPathways = BTreeMap<KeggId, Vec<PathwayId>>;

pub type PathwayNameIndex = BTreeMap<PathwayId, Option<String>>;

pub struct PathwayResolver<K: KeggClient> {
    client: K,
    retry: RetryingClient,
}

impl<K: KeggClient> PathwayResolver<K> {
    pub fn new(client: K, policy: RetryPolicy, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            retry: RetryingClient::with_limiter(policy, limiter),
        }
    }

    pub fn resolve(
        &self,
        accession: &Accession,
        identifiers: &[KeggId],
        greedy: bool,
    ) -> Result<IdentifierPathways, KiraError> {
        let mut found = IdentifierPathways::new();
        for kegg_id in identifiers {
            let pathways = self.lookup(kegg_id)?;
            if pathways.is_empty() {
                debug!(%accession, kegg_id, "no pathway found");
                continue;
            }
            found.insert(kegg_id.clone(), pathways);
            if greedy {
                break;
            }
        }
        Ok(found)
    }

    fn lookup(&self, kegg_id: &str) -> Result<Vec<PathwayId>, KiraError> {
        let operation = format!("KEGG link {kegg_id}");
        let text = self
            .retry
            .execute(&operation, || self.client.link_pathways(kegg_id))?;
        match parse_pathway_links(&text) {
            Ok(pathways) => Ok(pathways),
            Err(err) => {
                debug!(kegg_id, error = %err, "unparsable pathway listing");
                Ok(Vec::new())
            }
        }
    }

    pub fn resolve_names<'a, I>(&self, pathway_ids: I) -> PathwayNameIndex
    where
        I: IntoIterator<Item = &'a PathwayId>,
    {
        pathway_ids
            .into_iter()
            .map(|pathway_id| (pathway_id.clone(), self.resolve_name(pathway_id)))
            .collect()
    }

    pub fn resolve_name(&self, pathway_id: &str) -> Option<String> {
        let operation = format!("KEGG get {pathway_id}");
        let text = match self
            .retry
            .execute(&operation, || self.client.get_entry(pathway_id))
        {
            Ok(text) => text,
            Err(err) => {
                warn!(pathway_id, error = %err, "pathway name unavailable");
                return None;
            }
        };
        match parse_pathway_name(&text) {
            Ok(name) => Some(name),
            Err(err) => {
                warn!(pathway_id, error = %err, "pathway name unavailable");
                None
            }
        }
    }
}
