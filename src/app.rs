use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ResolvedConfig;
use crate::domain::{Accession, Organism};
use crate::error::KiraError;
use crate::identifiers::{
    DEFAULT_NAME_CUTOFF, IdentifierResolver, extract_identifiers, extract_names,
    ordered_identifiers,
};
use crate::kegg::KeggClient;
use crate::mapping::{Mapping, MappingStore, MappingView, Schema};
use crate::pathways::{IdentifierPathways, PathwayNameIndex, PathwayResolver};
use crate::retry::{RateLimiter, RetryPolicy};
use crate::store::Store;
use crate::uniprot::UniprotClient;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub identity_retry: RetryPolicy,
    pub kegg_retry: RetryPolicy,
    pub kegg_limiter: Arc<RateLimiter>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            identity_retry: RetryPolicy::identity_default(),
            kegg_retry: RetryPolicy::kegg_default(),
            kegg_limiter: Arc::new(RateLimiter::kegg_default()),
        }
    }
}

impl From<&ResolvedConfig> for ClientSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            identity_retry: config.identity_retry,
            kegg_retry: config.kegg_retry,
            kegg_limiter: Arc::new(RateLimiter::new(config.kegg_min_interval)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub greedy: bool,
    pub name_cutoff: usize,
    pub fetch_names: bool,
    pub checkpoint_every: Option<usize>,
    pub resume: bool,
    pub schema: Schema,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            greedy: true,
            name_cutoff: DEFAULT_NAME_CUTOFF,
            fetch_names: true,
            checkpoint_every: None,
            resume: false,
            schema: Schema::default(),
        }
    }
}

impl BatchOptions {
    pub fn from_config(config: &ResolvedConfig, resume: bool) -> Self {
        Self {
            greedy: config.greedy,
            name_cutoff: config.name_cutoff,
            fetch_names: config.fetch_names,
            checkpoint_every: config.checkpoint_every,
            resume,
            schema: config.schema.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub organism: String,
    pub processed: usize,
    pub filtered: Vec<String>,
    pub resumed: usize,
    pub with_identifiers: usize,
    pub with_pathways: usize,
    pub unique_pathways: usize,
    pub named_pathways: usize,
    pub unnamed_pathways: usize,
    pub output_dir: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Deserialize)]
pub struct Checkpoint {
    pub organism: Organism,
    pub processed: Vec<Accession>,
    pub filtered: Vec<Accession>,
    pub mapping: Mapping,
}

#[derive(Serialize)]
struct CheckpointRef<'a> {
    organism: &'a Organism,
    processed: &'a [Accession],
    filtered: &'a [Accession],
    mapping: &'a Mapping,
}

#[derive(Serialize)]
struct RunManifest<'a> {
    tool: String,
    organism: &'a Organism,
    started_at: String,
    finished_at: String,
    greedy: bool,
    name_cutoff: usize,
    accessions: usize,
    processed: usize,
    filtered: usize,
    unique_pathways: usize,
}

struct BatchState {
    mapping: MappingStore,
    processed: Vec<Accession>,
    filtered: Vec<Accession>,
}

impl BatchState {
    fn handled(&self) -> usize {
        self.processed.len() + self.filtered.len()
    }
}

pub struct App<U: UniprotClient, K: KeggClient> {
    store: Store,
    identifiers: IdentifierResolver<U>,
    pathways: PathwayResolver<K>,
}

impl<U: UniprotClient, K: KeggClient> App<U, K> {
    pub fn new(store: Store, uniprot: U, kegg: K, settings: ClientSettings) -> Self {
        Self {
            store,
            identifiers: IdentifierResolver::new(uniprot, settings.identity_retry),
            pathways: PathwayResolver::new(kegg, settings.kegg_retry, settings.kegg_limiter),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn run_batch(
        &self,
        accessions: &[Accession],
        organism: &Organism,
        options: &BatchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BatchResult, KiraError> {
        if accessions.is_empty() {
            return Err(KiraError::NoAccessions);
        }
        options.schema.validate()?;
        let started = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        self.store.ensure_root()?;

        let queue = dedup_accessions(accessions);
        let mut state = if options.resume {
            self.restore(organism, &options.schema, &queue)?
        } else {
            BatchState {
                mapping: MappingStore::new(options.schema.clone()),
                processed: Vec::new(),
                filtered: Vec::new(),
            }
        };
        let done: HashSet<Accession> = state
            .processed
            .iter()
            .chain(state.filtered.iter())
            .cloned()
            .collect();
        let resumed = queue.iter().filter(|acc| done.contains(*acc)).count();
        info!(
            total = queue.len(),
            resumed,
            organism = %organism,
            greedy = options.greedy,
            "starting batch"
        );

        for (index, accession) in queue.iter().enumerate() {
            if done.contains(accession) {
                continue;
            }
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Resolve; {accession} ({}/{})",
                    index + 1,
                    queue.len()
                ),
                elapsed: Some(started.elapsed()),
            });

            if let Err(err) = self.process_accession(accession, organism, options, &mut state) {
                if options.checkpoint_every.is_some() {
                    self.checkpoint_on_abort(organism, &state);
                }
                return Err(err);
            }

            if let Some(every) = options.checkpoint_every.filter(|every| *every > 0) {
                if state.handled() % every == 0 {
                    self.write_checkpoint(organism, &state)?;
                }
            }
        }

        sink.event(ProgressEvent {
            message: "phase=Clean; deduplicating pathways".to_string(),
            elapsed: Some(started.elapsed()),
        });
        let unique_pathways = state.mapping.clean().to_vec();

        let mut files = Vec::new();
        let mut named_pathways = 0;
        if options.fetch_names {
            sink.event(ProgressEvent {
                message: format!("phase=Names; {} pathways", unique_pathways.len()),
                elapsed: Some(started.elapsed()),
            });
            let names: PathwayNameIndex = self.pathways.resolve_names(&unique_pathways);
            named_pathways = names.values().filter(|name| name.is_some()).count();
            let path = self.store.pathway_names_path();
            Store::write_json(&path, &names)?;
            files.push(path.to_string());
        }

        sink.event(ProgressEvent {
            message: "phase=Store; writing mapping".to_string(),
            elapsed: Some(started.elapsed()),
        });
        match state.mapping.persist(&self.store) {
            Ok(written) => files.extend(written.into_iter().map(|path| path.to_string())),
            Err(err) => {
                self.checkpoint_on_abort(organism, &state);
                return Err(err);
            }
        }

        let targets_path = self.store.targets_path();
        let targets = state
            .processed
            .iter()
            .map(Accession::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        Store::write_bytes_atomic(&targets_path, targets.as_bytes())?;
        files.push(targets_path.to_string());

        let manifest = RunManifest {
            tool: format!("kira-pm/{}", env!("CARGO_PKG_VERSION")),
            organism,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            greedy: options.greedy,
            name_cutoff: options.name_cutoff,
            accessions: queue.len(),
            processed: state.processed.len(),
            filtered: state.filtered.len(),
            unique_pathways: unique_pathways.len(),
        };
        let manifest_path = self.store.manifest_path();
        Store::write_json(&manifest_path, &manifest)?;
        files.push(manifest_path.to_string());

        Store::remove_if_exists(&self.store.checkpoint_path())?;

        let mapping = state.mapping.mapping();
        let unnamed_pathways = if options.fetch_names {
            unique_pathways.len() - named_pathways
        } else {
            0
        };
        Ok(BatchResult {
            organism: organism.name.clone(),
            processed: state.processed.len(),
            filtered: state.filtered.iter().map(|acc| acc.to_string()).collect(),
            resumed,
            with_identifiers: mapping.kegg_ids.len(),
            with_pathways: mapping.pathways.len(),
            unique_pathways: unique_pathways.len(),
            named_pathways,
            unnamed_pathways,
            output_dir: self.store.root().to_string(),
            files,
        })
    }

    fn process_accession(
        &self,
        accession: &Accession,
        organism: &Organism,
        options: &BatchOptions,
        state: &mut BatchState,
    ) -> Result<(), KiraError> {
        let record = self.identifiers.resolve(accession, organism)?;
        if record.is_empty() {
            warn!(%accession, "no uniprot records, accession filtered");
            state.filtered.push(accession.clone());
            return Ok(());
        }

        let identifiers = extract_identifiers(&record, organism);
        let names = extract_names(&record, options.name_cutoff);
        let pathways = if identifiers.is_empty() {
            debug!(%accession, organism = %organism.kegg_code, "no KEGG identifiers");
            IdentifierPathways::new()
        } else {
            self.pathways
                .resolve(accession, &ordered_identifiers(&identifiers), options.greedy)?
        };

        state
            .mapping
            .record(accession, identifiers, names, pathways);
        state.processed.push(accession.clone());
        Ok(())
    }

    fn restore(
        &self,
        organism: &Organism,
        schema: &Schema,
        queue: &[Accession],
    ) -> Result<BatchState, KiraError> {
        let path = self.store.checkpoint_path();
        if !path.as_std_path().exists() {
            info!(%path, "no checkpoint found, starting from scratch");
            return Ok(BatchState {
                mapping: MappingStore::new(schema.clone()),
                processed: Vec::new(),
                filtered: Vec::new(),
            });
        }
        let checkpoint: Checkpoint = Store::read_json(&path)?;
        if checkpoint.organism.kegg_code != organism.kegg_code {
            return Err(KiraError::CheckpointMismatch {
                expected: organism.kegg_code.clone(),
                found: checkpoint.organism.kegg_code,
            });
        }
        let wanted: HashSet<&Accession> = queue.iter().collect();
        let mut mapping = checkpoint.mapping;
        mapping.retain(|acc| wanted.contains(acc));
        let processed: Vec<Accession> = checkpoint
            .processed
            .into_iter()
            .filter(|acc| wanted.contains(acc))
            .collect();
        let filtered: Vec<Accession> = checkpoint
            .filtered
            .into_iter()
            .filter(|acc| wanted.contains(acc))
            .collect();
        info!(
            processed = processed.len(),
            filtered = filtered.len(),
            "resuming from checkpoint"
        );
        Ok(BatchState {
            mapping: MappingStore::from_mapping(mapping, schema.clone()),
            processed,
            filtered,
        })
    }

    fn checkpoint_on_abort(&self, organism: &Organism, state: &BatchState) {
        if let Err(err) = self.write_checkpoint(organism, state) {
            error!(error = %err, "could not write checkpoint");
        }
    }

    fn write_checkpoint(&self, organism: &Organism, state: &BatchState) -> Result<(), KiraError> {
        let checkpoint = CheckpointRef {
            organism,
            processed: &state.processed,
            filtered: &state.filtered,
            mapping: state.mapping.mapping(),
        };
        debug!(handled = state.handled(), "writing checkpoint");
        Store::write_json(&self.store.checkpoint_path(), &checkpoint)
    }
}

pub fn dedup_accessions(accessions: &[Accession]) -> Vec<Accession> {
    let mut seen = HashSet::new();
    accessions
        .iter()
        .filter(|acc| seen.insert((*acc).clone()))
        .cloned()
        .collect()
}
