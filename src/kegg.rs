use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::PathwayId;
use crate::error::KiraError;

pub trait KeggClient: Send + Sync {
    fn link_pathways(&self, kegg_id: &str) -> Result<String, KiraError>;
    fn get_entry(&self, pathway_id: &str) -> Result<String, KiraError>;
}

#[derive(Clone)]
pub struct KeggHttpClient {
    client: Client,
    base_url: String,
}

impl KeggHttpClient {
    pub fn new() -> Result<Self, KiraError> {
        Self::with_base_url("https://rest.kegg.jp")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-pm/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::KeggHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| KiraError::KeggHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get_text(&self, url: &str) -> Result<String, KiraError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| KiraError::KeggHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "KEGG request failed".to_string());
            return Err(KiraError::KeggStatus { status, message });
        }
        response
            .text()
            .map_err(|err| KiraError::KeggHttp(err.to_string()))
    }
}

impl KeggClient for KeggHttpClient {
    fn link_pathways(&self, kegg_id: &str) -> Result<String, KiraError> {
        self.get_text(&format!("{}/link/pathway/{kegg_id}", self.base_url))
    }

    fn get_entry(&self, pathway_id: &str) -> Result<String, KiraError> {
        self.get_text(&format!("{}/get/{pathway_id}", self.base_url))
    }
}

pub fn parse_pathway_links(text: &str) -> Result<Vec<PathwayId>, KiraError> {
    let mut pathways = Vec::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        let (_, pathway) = line
            .split_once('\t')
            .ok_or_else(|| KiraError::parse_failure("KEGG link", format!("no tab in {line:?}")))?;
        let pathway = pathway.trim();
        if pathway.is_empty() {
            return Err(KiraError::parse_failure(
                "KEGG link",
                format!("empty pathway in {line:?}"),
            ));
        }
        pathways.push(pathway.to_string());
    }
    Ok(pathways)
}

pub fn parse_pathway_name(text: &str) -> Result<String, KiraError> {
    let line = text
        .lines()
        .nth(1)
        .ok_or_else(|| KiraError::parse_failure("KEGG entry", "missing second line"))?;
    let rest = line.strip_prefix("NAME").ok_or_else(|| {
        KiraError::parse_failure("KEGG entry", format!("second line is not NAME: {line:?}"))
    })?;
    let name = rest.split(" - ").next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(KiraError::parse_failure("KEGG entry", "empty NAME"));
    }
    Ok(name.to_string())
}
