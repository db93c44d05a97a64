use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::analysis::{PathwayOccupancy, RankedTerm};
use crate::app::{BatchResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_batch(result: &BatchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_occupancy(rows: &[PathwayOccupancy]) -> io::Result<()> {
        Self::print_json(rows)
    }

    pub fn print_ranked(rows: &[RankedTerm]) -> io::Result<()> {
        Self::print_json(rows)
    }

    pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

pub fn print_batch_summary(result: &BatchResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}KIRA-PM summary ({}){reset}", result.organism);
    println!("{green}Processed accessions: {}{reset}", result.processed);
    if result.resumed > 0 {
        println!("{cyan}Resumed from checkpoint: {}{reset}", result.resumed);
    }
    println!(
        "{yellow}Filtered (no UniProt records): {}{reset}",
        result.filtered.len()
    );
    for accession in &result.filtered {
        println!("{yellow}   - {accession}{reset}");
    }
    println!(
        "{green}With KEGG identifiers: {} / with pathways: {}{reset}",
        result.with_identifiers, result.with_pathways
    );
    println!(
        "{green}Unique pathways: {} (named {}, unnamed {}){reset}",
        result.unique_pathways, result.named_pathways, result.unnamed_pathways
    );
    println!("{cyan}Output: {}{reset}", result.output_dir);
}

pub fn print_occupancy(rows: &[PathwayOccupancy], total: usize) {
    println!("Targets per pathway (total {total})");
    for row in rows {
        let label = row.name.as_deref().unwrap_or(row.pathway.as_str());
        let shown: Vec<&str> = row.accessions.iter().take(4).map(|acc| acc.as_str()).collect();
        let more = row.accessions.len().saturating_sub(shown.len());
        println!(
            "{:>6.2}%  {label}  [{}{}]",
            row.percent,
            shown.join(", "),
            if more > 0 { format!(", {more} more") } else { String::new() }
        );
    }
}

pub fn print_ranked(rows: &[RankedTerm]) {
    println!("Top biological process terms:");
    println!("==========");
    for row in rows {
        println!(
            " {}  (combined {:.2}, overlap {:.2}%, occupancy {:.2}%)",
            row.term, row.combined_score, row.overlap_percent, row.target_gene_occupancy
        );
    }
    println!(" ------");
}
