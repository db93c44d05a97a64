use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::{Accession, KeggId, PathwayId};
use crate::error::KiraError;
use crate::mapping::MappingView;
use crate::pathways::PathwayNameIndex;

pub const DEFAULT_P_VALUE_CUTOFF: f64 = 0.05;

pub fn gene_list<M: MappingView + ?Sized>(source: &M) -> Vec<String> {
    let mut seen = HashSet::new();
    source
        .mapping()
        .gene_names
        .values()
        .flatten()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

pub fn identifier_to_accession<M: MappingView + ?Sized>(source: &M) -> BTreeMap<KeggId, Accession> {
    let mut index = BTreeMap::new();
    for (accession, by_candidate) in &source.mapping().kegg_ids {
        for kegg_id in by_candidate.values().flatten() {
            index.insert(kegg_id.clone(), accession.clone());
        }
    }
    index
}

pub fn pathway_members<M: MappingView + ?Sized>(source: &M) -> BTreeMap<PathwayId, Vec<Accession>> {
    let mut members: BTreeMap<PathwayId, Vec<Accession>> = BTreeMap::new();
    for (accession, by_identifier) in &source.mapping().pathways {
        for pathway in by_identifier.values().flatten() {
            let entry = members.entry(pathway.clone()).or_default();
            if !entry.contains(accession) {
                entry.push(accession.clone());
            }
        }
    }
    members
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathwayOccupancy {
    pub pathway: PathwayId,
    pub name: Option<String>,
    pub percent: f64,
    pub accessions: Vec<Accession>,
}

pub fn pathway_occupancy<M: MappingView + ?Sized>(
    source: &M,
    names: Option<&PathwayNameIndex>,
    top_n: Option<usize>,
) -> Vec<PathwayOccupancy> {
    let total = source.mapping().pathways.len();
    if total == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<PathwayOccupancy> = pathway_members(source)
        .into_iter()
        .map(|(pathway, accessions)| PathwayOccupancy {
            name: names.and_then(|index| index.get(&pathway).cloned().flatten()),
            percent: round2(accessions.len() as f64 / total as f64 * 100.0),
            pathway,
            accessions,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.accessions
            .len()
            .cmp(&a.accessions.len())
            .then_with(|| a.pathway.cmp(&b.pathway))
    });
    if let Some(top_n) = top_n {
        ranked.truncate(top_n);
    }
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRow {
    #[serde(rename = "Term")]
    pub term: String,
    #[serde(rename = "Adjusted P-value")]
    pub adjusted_p_value: f64,
    #[serde(rename = "Combined Score")]
    pub combined_score: f64,
    #[serde(rename = "Overlap")]
    pub overlap: String,
    #[serde(rename = "Genes")]
    pub genes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTerm {
    pub term: String,
    pub adjusted_p_value: f64,
    pub combined_score: f64,
    pub overlap_percent: f64,
    pub target_gene_occupancy: f64,
}

pub fn overlap_percent(overlap: &str) -> Result<f64, KiraError> {
    let parse = |part: &str| {
        part.trim()
            .parse::<u64>()
            .map_err(|_| KiraError::parse_failure("Overlap", format!("not a ratio: {overlap:?}")))
    };
    let (hits, size) = overlap
        .split_once('/')
        .ok_or_else(|| KiraError::parse_failure("Overlap", format!("not a ratio: {overlap:?}")))?;
    let (hits, size) = (parse(hits)?, parse(size)?);
    if size == 0 {
        return Err(KiraError::parse_failure("Overlap", "term size is zero"));
    }
    Ok(round2(hits as f64 / size as f64 * 100.0))
}

pub fn target_gene_occupancy(genes: &str, gene_list: &HashSet<&str>) -> f64 {
    let members: Vec<&str> = genes.split(';').map(str::trim).filter(|g| !g.is_empty()).collect();
    if members.is_empty() {
        return 0.0;
    }
    let hits = members.iter().filter(|gene| gene_list.contains(*gene)).count();
    hits as f64 / members.len() as f64 * 100.0
}

pub fn rank_enrichment(
    rows: &[EnrichmentRow],
    gene_list: &[String],
    p_value_cutoff: f64,
    top_n: Option<usize>,
) -> Result<Vec<RankedTerm>, KiraError> {
    let genes: HashSet<&str> = gene_list.iter().map(String::as_str).collect();
    let mut ranked = rows
        .iter()
        .filter(|row| row.adjusted_p_value < p_value_cutoff)
        .map(|row| {
            Ok(RankedTerm {
                term: row.term.clone(),
                adjusted_p_value: row.adjusted_p_value,
                combined_score: row.combined_score,
                overlap_percent: overlap_percent(&row.overlap)?,
                target_gene_occupancy: target_gene_occupancy(&row.genes, &genes),
            })
        })
        .collect::<Result<Vec<_>, KiraError>>()?;
    ranked.sort_by(|a, b| {
        b.combined_score
            .total_cmp(&a.combined_score)
            .then_with(|| b.overlap_percent.total_cmp(&a.overlap_percent))
            .then_with(|| b.target_gene_occupancy.total_cmp(&a.target_gene_occupancy))
    });
    if let Some(top_n) = top_n {
        ranked.truncate(top_n);
    }
    Ok(ranked)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
