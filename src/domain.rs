use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

static ACCESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[OPQ][0-9][A-Z0-9]{3}[0-9]|[A-NR-Z][0-9](?:[A-Z][A-Z0-9]{2}[0-9]){1,2})(?:-[0-9]+)?$",
    )
    .expect("accession pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_uniprot_like(&self) -> bool {
        ACCESSION_RE.is_match(&self.0.to_uppercase())
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(KiraError::InvalidAccession(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for Accession {
    type Error = KiraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Accession> for String {
    fn from(value: Accession) -> Self {
        value.0
    }
}

pub type KeggId = String;

pub type PathwayId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organism {
    pub name: String,
    pub kegg_code: String,
    pub taxonomy_id: u32,
}

const ORGANISM_PRESETS: &[(&str, &str, u32)] = &[
    ("human", "hsa", 9606),
    ("mouse", "mmu", 10090),
    ("rat", "rno", 10116),
    ("zebrafish", "dre", 7955),
    ("fly", "dme", 7227),
    ("worm", "cel", 6239),
    ("yeast", "sce", 559292),
    ("ecoli", "eco", 83333),
];

impl Organism {
    pub fn new(name: impl Into<String>, kegg_code: impl Into<String>, taxonomy_id: u32) -> Self {
        Self {
            name: name.into(),
            kegg_code: kegg_code.into(),
            taxonomy_id,
        }
    }

    pub fn human() -> Self {
        Self::new("human", "hsa", 9606)
    }

    pub fn presets() -> impl Iterator<Item = Organism> {
        ORGANISM_PRESETS
            .iter()
            .map(|(name, code, taxon)| Organism::new(*name, *code, *taxon))
    }

    pub fn owns_kegg_id(&self, kegg_id: &str) -> bool {
        kegg_id.contains(&self.kegg_code)
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, taxon {})", self.name, self.kegg_code, self.taxonomy_id)
    }
}

impl FromStr for Organism {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_lowercase();
        let taxon = needle.parse::<u32>().ok();
        Organism::presets()
            .find(|org| {
                org.name == needle || org.kegg_code == needle || Some(org.taxonomy_id) == taxon
            })
            .ok_or_else(|| KiraError::InvalidOrganism(value.to_string()))
    }
}
