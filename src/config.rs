use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Accession, Organism};
use crate::error::KiraError;
use crate::identifiers::DEFAULT_NAME_CUTOFF;
use crate::mapping::{MappingTable, Schema};
use crate::retry::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "kira-pm.json";
pub const DEFAULT_OUTPUT_DIR: &str = "data_processed";
pub const DEFAULT_KEGG_MIN_INTERVAL_MS: u64 = 334;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub organism: Option<OrganismEntry>,
    #[serde(default)]
    pub accessions: Vec<String>,
    #[serde(default)]
    pub accessions_file: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub greedy: Option<bool>,
    #[serde(default)]
    pub name_cutoff: Option<usize>,
    #[serde(default)]
    pub fetch_names: Option<bool>,
    #[serde(default)]
    pub checkpoint_every: Option<usize>,
    #[serde(default)]
    pub identity_retry: Option<RetryPolicy>,
    #[serde(default)]
    pub kegg_retry: Option<RetryPolicy>,
    #[serde(default)]
    pub kegg_min_interval_ms: Option<u64>,
    #[serde(default)]
    pub schema: Option<std::collections::BTreeMap<MappingTable, String>>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OrganismEntry {
    Shorthand(String),
    Detailed(Organism),
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub organism: Organism,
    pub accessions: Vec<Accession>,
    pub output_dir: Utf8PathBuf,
    pub greedy: bool,
    pub name_cutoff: usize,
    pub fetch_names: bool,
    pub checkpoint_every: Option<usize>,
    pub identity_retry: RetryPolicy,
    pub kegg_retry: RetryPolicy,
    pub kegg_min_interval: Duration,
    pub schema: Schema,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub organism: Option<String>,
    pub accessions: Vec<String>,
    pub accessions_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub exhaustive: bool,
    pub skip_names: bool,
    pub checkpoint_every: Option<usize>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KiraError> {
        let (config, base_dir) = Self::read(path)?;
        Self::resolve_config(config, &base_dir)
    }

    pub fn resolve_with_overrides(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let (mut config, base_dir) = match Self::read(path) {
            Ok(found) => found,
            Err(KiraError::MissingConfig) => (Config::default(), PathBuf::from(".")),
            Err(err) => return Err(err),
        };

        if let Some(organism) = overrides.organism {
            config.organism = Some(OrganismEntry::Shorthand(organism));
        }
        if !overrides.accessions.is_empty() {
            config.accessions = overrides.accessions;
            config.accessions_file = None;
        }
        if let Some(file) = overrides.accessions_file {
            // command line paths are relative to the working directory, not the config
            let file = if file.is_absolute() {
                file
            } else {
                std::env::current_dir()
                    .map_err(|err| KiraError::Filesystem(err.to_string()))?
                    .join(file)
            };
            config.accessions_file = Some(file.to_string_lossy().into_owned());
        }
        if let Some(dir) = overrides.output_dir {
            config.output_dir = Some(dir.to_string_lossy().into_owned());
        }
        if overrides.exhaustive {
            config.greedy = Some(false);
        }
        if overrides.skip_names {
            config.fetch_names = Some(false);
        }
        if overrides.checkpoint_every.is_some() {
            config.checkpoint_every = overrides.checkpoint_every;
        }

        Self::resolve_config(config, &base_dir)
    }

    fn read(path: Option<&str>) -> Result<(Config, PathBuf), KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(KiraError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((config, base_dir))
    }

    pub fn resolve_config(config: Config, base_dir: &Path) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let organism = match config.organism {
            None => Organism::human(),
            Some(OrganismEntry::Shorthand(value)) => value.parse()?,
            Some(OrganismEntry::Detailed(organism)) => organism,
        };

        let mut accessions = parse_tokens(&config.accessions)?;
        if let Some(file) = config.accessions_file {
            let path = base_dir.join(file);
            accessions.extend(load_accessions(&path)?);
        }

        let output_dir = Utf8PathBuf::from(
            config
                .output_dir
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        );

        let mut schema = Schema::default();
        for (table, filename) in config.schema.unwrap_or_default() {
            schema = schema.with(table, filename);
        }
        schema.validate()?;

        Ok(ResolvedConfig {
            schema_version,
            organism,
            accessions,
            output_dir,
            greedy: config.greedy.unwrap_or(true),
            name_cutoff: config.name_cutoff.unwrap_or(DEFAULT_NAME_CUTOFF),
            fetch_names: config.fetch_names.unwrap_or(true),
            checkpoint_every: config.checkpoint_every.filter(|every| *every > 0),
            identity_retry: config
                .identity_retry
                .unwrap_or_else(RetryPolicy::identity_default),
            kegg_retry: config.kegg_retry.unwrap_or_else(RetryPolicy::kegg_default),
            kegg_min_interval: Duration::from_millis(
                config
                    .kegg_min_interval_ms
                    .unwrap_or(DEFAULT_KEGG_MIN_INTERVAL_MS),
            ),
            schema,
        })
    }
}

pub fn load_accessions(path: &Path) -> Result<Vec<Accession>, KiraError> {
    let content = fs::read_to_string(path)
        .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
    let is_json = path
        .extension()
        .map(|ext| ext == "json")
        .unwrap_or(false);
    let cells: Vec<String> = if is_json {
        serde_json::from_str(&content).map_err(|err| KiraError::ConfigParse(err.to_string()))?
    } else {
        content.lines().map(str::to_string).collect()
    };
    parse_tokens(&cells)
}

fn parse_tokens(cells: &[String]) -> Result<Vec<Accession>, KiraError> {
    let accessions = cells
        .iter()
        .flat_map(|cell| cell.split_whitespace())
        .map(str::parse)
        .collect::<Result<Vec<Accession>, KiraError>>()?;
    for accession in accessions.iter().filter(|acc| !acc.is_uniprot_like()) {
        warn!(%accession, "not a UniProt accession, lookup will likely filter it");
    }
    Ok(accessions)
}
